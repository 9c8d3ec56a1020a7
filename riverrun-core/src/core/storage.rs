//! On-disk SQLite store: connection handling and additive schema migrations.

use crate::{Result, RiverRunError};
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};

/// Columns added after the first release. Each is applied with
/// `ALTER TABLE … ADD COLUMN`; "duplicate column name" means it is already there.
const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("rivers", "region", "TEXT"),
    ("rivers", "notes", "TEXT"),
    ("rivers", "tags", "TEXT"),
];

/// Location of a RiverRun database file.
///
/// No connection is held between operations: every call to
/// [`connect`](Self::connect) opens a fresh one, and the caller drops it when
/// the logical operation is finished.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Opens (creating if necessary) the database at `path` and brings its
    /// schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::InvalidStore`] if the file exists but is not a
    /// SQLite database, or [`RiverRunError::Database`] if it cannot be written.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Self {
            path: path.as_ref().to_path_buf(),
        };
        storage.ensure_schema()?;
        Ok(storage)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a new connection with foreign-key enforcement switched on.
    ///
    /// SQLite keeps `foreign_keys` per connection, so this must run for every
    /// connection or cascade deletes silently stop working.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Creates missing tables and applies additive column migrations.
    ///
    /// Safe to call on every startup. Existing columns are never dropped or
    /// renamed, so no data is lost.
    ///
    /// # Errors
    ///
    /// See [`Storage::open`].
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(include_str!("schema.sql"))
            .map_err(classify_schema_error)?;

        for (table, column, decl) in ADDITIVE_COLUMNS {
            add_column(&conn, table, column, decl)?;
        }
        Ok(())
    }
}

fn add_column(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<()> {
    let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {decl}");
    match conn.execute(&sql, []) {
        Ok(_) => {
            log::info!("Migrated {table}: added column {column}");
            Ok(())
        }
        Err(e) if e.to_string().contains("duplicate column name") => {
            log::debug!("Column {table}.{column} already present");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn classify_schema_error(err: rusqlite::Error) -> RiverRunError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::NotADatabase => {
            RiverRunError::InvalidStore("Not a RiverRun database".to_string())
        }
        _ => RiverRunError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn table_names(storage: &Storage) -> Vec<String> {
        let conn = storage.connect().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        names
    }

    fn has_column(storage: &Storage, table: &str, column: &str) -> bool {
        storage
            .connect()
            .unwrap()
            .query_row(
                &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name=?1"),
                [column],
                |row| row.get::<_, i64>(0).map(|count| count > 0),
            )
            .unwrap()
    }

    #[test]
    fn test_open_creates_tables() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();

        let tables = table_names(&storage);
        assert!(tables.contains(&"rivers".to_string()));
        assert!(tables.contains(&"trip_logs".to_string()));
        assert!(tables.contains(&"river_documents".to_string()));
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();
        storage.ensure_schema().unwrap();
        storage.ensure_schema().unwrap();

        // Reopening an existing store must also be harmless.
        Storage::open(temp.path()).unwrap();
        assert_eq!(table_names(&storage).iter().filter(|t| *t == "rivers").count(), 1);
    }

    #[test]
    fn test_connections_enforce_foreign_keys() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::open(temp.path()).unwrap();
        let enabled: i64 = storage
            .connect()
            .unwrap()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database ".repeat(100)).unwrap();

        let result = Storage::open(temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_migration_adds_tags_column_and_keeps_rows() {
        let temp = NamedTempFile::new().unwrap();

        // Store written before tags/notes/region existed.
        {
            let conn = Connection::open(temp.path()).unwrap();
            conn.execute_batch(
                "CREATE TABLE rivers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    location TEXT NOT NULL,
                    date_added TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                );
                INSERT INTO rivers (name, location) VALUES ('Ocoee', 'Tennessee');",
            )
            .unwrap();
        }

        let storage = Storage::open(temp.path()).unwrap();
        assert!(has_column(&storage, "rivers", "tags"));
        assert!(has_column(&storage, "rivers", "notes"));
        assert!(has_column(&storage, "rivers", "region"));

        let name: String = storage
            .connect()
            .unwrap()
            .query_row("SELECT name FROM rivers WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "Ocoee");
    }
}
