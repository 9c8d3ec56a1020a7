//! Where the database and the attachment directory live on disk.

use crate::{Result, RiverRunError};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory name under the platform data directory.
pub const APP_DIR_NAME: &str = "RiverRunner";
pub const DATABASE_FILE_NAME: &str = "river_data.db";
pub const ATTACHMENTS_DIR_NAME: &str = "attachments";

/// Resolved locations of the on-disk store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataLocation {
    pub root: PathBuf,
    pub database: PathBuf,
    pub attachments: PathBuf,
}

impl DataLocation {
    /// Lays out the store inside `root`.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            database: root.join(DATABASE_FILE_NAME),
            attachments: root.join(ATTACHMENTS_DIR_NAME),
            root,
        }
    }

    /// The platform default: `<data_dir>/RiverRunner`.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::Io`] if the platform has no data directory.
    pub fn resolve() -> Result<Self> {
        let base = dirs::data_dir().ok_or_else(|| {
            RiverRunError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no platform data directory",
            ))
        })?;
        Ok(Self::in_dir(base.join(APP_DIR_NAME)))
    }

    /// Creates the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

/// What [`migrate_legacy_data`] moved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub database_migrated: bool,
    pub attachments_migrated: bool,
    /// Steps that were attempted but failed.
    pub errors: Vec<String>,
}

impl MigrationReport {
    pub fn migrated_anything(&self) -> bool {
        self.database_migrated || self.attachments_migrated
    }
}

/// Copies a store left in `legacy_dir` (older versions kept it in the
/// working directory) into `location`.
///
/// Each piece is copied only if it exists in `legacy_dir` and is absent from
/// `location`, so running this on every start is harmless. The legacy copy
/// is left in place. A failed step is recorded in the report and does not
/// stop the other one.
///
/// # Errors
///
/// Returns [`RiverRunError::Io`] only if the destination root cannot be created.
pub fn migrate_legacy_data(legacy_dir: &Path, location: &DataLocation) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    let old_db = legacy_dir.join(DATABASE_FILE_NAME);
    let old_attachments = legacy_dir.join(ATTACHMENTS_DIR_NAME);

    let db_pending = old_db.is_file() && !location.database.exists();
    let attachments_pending = old_attachments.is_dir() && !location.attachments.exists();
    if !db_pending && !attachments_pending {
        return Ok(report);
    }
    location.ensure_root()?;

    if db_pending {
        match fs::copy(&old_db, &location.database) {
            Ok(_) => {
                log::info!(
                    "Migrated database from {} to {}",
                    old_db.display(),
                    location.database.display()
                );
                report.database_migrated = true;
            }
            Err(e) => {
                log::warn!("Failed to migrate database: {e}");
                report.errors.push(format!("database: {e}"));
            }
        }
    }

    if attachments_pending {
        match copy_dir_recursive(&old_attachments, &location.attachments) {
            Ok(()) => {
                log::info!(
                    "Migrated attachments from {} to {}",
                    old_attachments.display(),
                    location.attachments.display()
                );
                report.attachments_migrated = true;
            }
            Err(e) => {
                log::warn!("Failed to migrate attachments: {e}");
                report.errors.push(format!("attachments: {e}"));
            }
        }
    }

    Ok(report)
}

fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
