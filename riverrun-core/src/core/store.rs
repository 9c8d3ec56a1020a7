//! CRUD over rivers, trip logs and attachment metadata.

use crate::core::attachment::map_attachment_row;
use crate::core::timestamp::{self, format_timestamp, parse_timestamp};
use crate::core::trip_log::{parse_trip_date, TRIP_DATE_FORMAT};
use crate::{
    Attachment, DifficultyClass, NewAttachment, Result, River, RiverData, RiverDeletion,
    RiverFilter, RiverRunError, Storage, TripLog, TripLogData,
};
use rusqlite::types::Value;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;

const RIVER_SELECT: &str = "SELECT id, name, location, region, latitude, longitude, difficulty_class,
        length_miles, typical_flow_min, typical_flow_max, put_in_location, take_out_location,
        shuttle_info, parking_details, best_seasons, water_level_source, hazards, portages,
        emergency_contacts, description, personal_rating, notes, tags, date_added, last_updated
    FROM rivers";

const TRIP_SELECT: &str = "SELECT t.id, t.river_id, t.trip_date, t.companions, t.water_level,
        t.weather_conditions, t.flow_rate, t.duration_hours, t.difficulty_experienced,
        t.highlights, t.challenges, t.gear_used, t.trip_rating, t.notes, t.created_date, r.name
    FROM trip_logs t
    JOIN rivers r ON t.river_id = r.id";

const ATTACHMENT_SELECT: &str = "SELECT id, river_id, file_name, file_path, file_type, file_size,
        description, upload_date
    FROM river_documents";

/// The query and mutation surface over a RiverRun database.
///
/// Every method opens its own connection through [`Storage::connect`] and
/// releases it before returning, so a `RiverStore` is cheap to clone and
/// holds no lock between calls.
#[derive(Debug, Clone)]
pub struct RiverStore {
    storage: Storage,
}

impl RiverStore {
    /// Opens the database at `path`, creating it and migrating its schema as needed.
    ///
    /// # Errors
    ///
    /// See [`Storage::open`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path)?,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn connect(&self) -> Result<Connection> {
        self.storage.connect()
    }

    // ── Rivers ────────────────────────────────────────────────────

    /// Inserts a new river and returns its id.
    ///
    /// `date_added` and `last_updated` are both set to the same instant.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::ValidationFailed`] before writing anything if
    /// `data` breaks a field constraint, or [`RiverRunError::Database`].
    pub fn add_river(&self, data: &RiverData) -> Result<i64> {
        data.validate()?;
        let data = data.clone().normalized();
        let stamp = format_timestamp(timestamp::now());

        let conn = self.connect()?;
        let mut values = river_values(&data);
        values.push(Value::Text(stamp.clone()));
        values.push(Value::Text(stamp));
        conn.execute(
            "INSERT INTO rivers (name, location, region, latitude, longitude, difficulty_class,
                length_miles, typical_flow_min, typical_flow_max, put_in_location,
                take_out_location, shuttle_info, parking_details, best_seasons,
                water_level_source, hazards, portages, emergency_contacts, description,
                personal_rating, notes, tags, date_added, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params_from_iter(values),
        )?;
        let id = conn.last_insert_rowid();
        log::debug!("Added river {id} ({})", data.name);
        Ok(id)
    }

    /// Fetches a river, or `None` if no river has this id.
    pub fn find_river(&self, river_id: i64) -> Result<Option<River>> {
        let conn = self.connect()?;
        let river = conn
            .query_row(&format!("{RIVER_SELECT} WHERE id = ?1"), [river_id], map_river_row)
            .optional()?;
        Ok(river)
    }

    /// Fetches a river.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::RiverNotFound`] if no river has this id.
    pub fn get_river(&self, river_id: i64) -> Result<River> {
        self.find_river(river_id)?
            .ok_or(RiverRunError::RiverNotFound(river_id))
    }

    /// Returns all rivers ordered by name.
    pub fn list_rivers(&self) -> Result<Vec<River>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{RIVER_SELECT} ORDER BY name, id"))?;
        let rivers = stmt
            .query_map([], map_river_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rivers)
    }

    /// Returns the rivers matching `filter`, ordered by name.
    pub fn list_rivers_filtered(&self, filter: &RiverFilter) -> Result<Vec<River>> {
        Ok(self
            .list_rivers()?
            .into_iter()
            .filter(|river| filter.matches(river))
            .collect())
    }

    pub fn count_rivers(&self) -> Result<usize> {
        let count: i64 = self
            .connect()?
            .query_row("SELECT COUNT(*) FROM rivers", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Replaces every writable field of a river and returns the stored row.
    ///
    /// `last_updated` always moves forward, even when two updates land in the
    /// same clock tick; `id` and `date_added` are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::ValidationFailed`] before writing anything,
    /// [`RiverRunError::RiverNotFound`] for an unknown id, or
    /// [`RiverRunError::Database`].
    pub fn update_river(&self, river_id: i64, data: &RiverData) -> Result<River> {
        data.validate()?;
        let data = data.clone().normalized();

        let conn = self.connect()?;
        let previous: Option<String> = conn
            .query_row(
                "SELECT last_updated FROM rivers WHERE id = ?1",
                [river_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RiverRunError::RiverNotFound(river_id))?;
        let stamp = previous
            .as_deref()
            .and_then(parse_timestamp)
            .map_or_else(timestamp::now, timestamp::advance_from);

        let mut values = river_values(&data);
        values.push(Value::Text(format_timestamp(stamp)));
        values.push(Value::Integer(river_id));
        conn.execute(
            "UPDATE rivers SET name = ?1, location = ?2, region = ?3, latitude = ?4,
                longitude = ?5, difficulty_class = ?6, length_miles = ?7,
                typical_flow_min = ?8, typical_flow_max = ?9, put_in_location = ?10,
                take_out_location = ?11, shuttle_info = ?12, parking_details = ?13,
                best_seasons = ?14, water_level_source = ?15, hazards = ?16, portages = ?17,
                emergency_contacts = ?18, description = ?19, personal_rating = ?20,
                notes = ?21, tags = ?22, last_updated = ?23
             WHERE id = ?24",
            params_from_iter(values),
        )?;
        drop(conn);

        self.get_river(river_id)
    }

    /// Deletes a river together with its trip logs and attachment rows.
    ///
    /// All three deletes run in one transaction. The removed attachment rows
    /// are returned so the caller can delete their files; see
    /// [`AttachmentManager::delete_river`](crate::AttachmentManager::delete_river).
    /// An unknown id is a no-op and returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::Database`] for any SQLite failure; the
    /// transaction is rolled back and nothing is removed.
    pub fn delete_river(&self, river_id: i64) -> Result<Option<RiverDeletion>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT COUNT(*) FROM rivers WHERE id = ?1",
            [river_id],
            |row| row.get::<_, i64>(0).map(|count| count > 0),
        )?;
        if !exists {
            return Ok(None);
        }

        let attachments = {
            let mut stmt =
                tx.prepare(&format!("{ATTACHMENT_SELECT} WHERE river_id = ?1 ORDER BY id"))?;
            let rows = stmt
                .query_map([river_id], map_attachment_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let trip_logs_removed = tx.execute("DELETE FROM trip_logs WHERE river_id = ?1", [river_id])?;
        tx.execute("DELETE FROM river_documents WHERE river_id = ?1", [river_id])?;
        tx.execute("DELETE FROM rivers WHERE id = ?1", [river_id])?;
        tx.commit()?;

        log::info!(
            "Deleted river {river_id} with {trip_logs_removed} trip logs and {} attachments",
            attachments.len()
        );
        Ok(Some(RiverDeletion {
            river_id,
            trip_logs_removed,
            attachments,
        }))
    }

    // ── Trip logs ─────────────────────────────────────────────────

    /// Inserts a trip log and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::ValidationFailed`] or
    /// [`RiverRunError::RiverNotFound`] before writing anything, or
    /// [`RiverRunError::Database`].
    pub fn add_trip_log(&self, data: &TripLogData) -> Result<i64> {
        data.validate()?;
        let data = data.clone().normalized();

        let conn = self.connect()?;
        ensure_river_exists(&conn, data.river_id)?;

        let mut values = trip_values(&data);
        values.push(Value::Text(format_timestamp(timestamp::now())));
        conn.execute(
            "INSERT INTO trip_logs (river_id, trip_date, companions, water_level,
                weather_conditions, flow_rate, duration_hours, difficulty_experienced,
                highlights, challenges, gear_used, trip_rating, notes, created_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params_from_iter(values),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_trip_log(&self, trip_id: i64) -> Result<Option<TripLog>> {
        let conn = self.connect()?;
        let trip = conn
            .query_row(&format!("{TRIP_SELECT} WHERE t.id = ?1"), [trip_id], map_trip_row)
            .optional()?
            .flatten();
        Ok(trip)
    }

    /// # Errors
    ///
    /// Returns [`RiverRunError::TripLogNotFound`] if no trip log has this id.
    pub fn get_trip_log(&self, trip_id: i64) -> Result<TripLog> {
        self.find_trip_log(trip_id)?
            .ok_or(RiverRunError::TripLogNotFound(trip_id))
    }

    /// Returns trip logs newest first, optionally only those for `river_id`.
    ///
    /// Trips on the same date keep the order they were logged in.
    pub fn get_trip_logs(&self, river_id: Option<i64>) -> Result<Vec<TripLog>> {
        let conn = self.connect()?;
        let trips = match river_id {
            Some(river_id) => {
                let mut stmt = conn.prepare(&format!(
                    "{TRIP_SELECT} WHERE t.river_id = ?1 ORDER BY t.trip_date DESC, t.id ASC"
                ))?;
                let rows = stmt
                    .query_map([river_id], map_trip_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.into_iter().flatten().collect()
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{TRIP_SELECT} ORDER BY t.trip_date DESC, t.id ASC"))?;
                let rows = stmt
                    .query_map([], map_trip_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows.into_iter().flatten().collect()
            }
        };
        Ok(trips)
    }

    /// Replaces every writable field of a trip log and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::ValidationFailed`],
    /// [`RiverRunError::TripLogNotFound`] or [`RiverRunError::RiverNotFound`]
    /// (for a reassigned `river_id`) before writing anything, or
    /// [`RiverRunError::Database`].
    pub fn update_trip_log(&self, trip_id: i64, data: &TripLogData) -> Result<TripLog> {
        data.validate()?;
        let data = data.clone().normalized();

        let conn = self.connect()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) FROM trip_logs WHERE id = ?1",
            [trip_id],
            |row| row.get::<_, i64>(0).map(|count| count > 0),
        )?;
        if !exists {
            return Err(RiverRunError::TripLogNotFound(trip_id));
        }
        ensure_river_exists(&conn, data.river_id)?;

        let mut values = trip_values(&data);
        values.push(Value::Integer(trip_id));
        conn.execute(
            "UPDATE trip_logs SET river_id = ?1, trip_date = ?2, companions = ?3,
                water_level = ?4, weather_conditions = ?5, flow_rate = ?6,
                duration_hours = ?7, difficulty_experienced = ?8, highlights = ?9,
                challenges = ?10, gear_used = ?11, trip_rating = ?12, notes = ?13
             WHERE id = ?14",
            params_from_iter(values),
        )?;
        drop(conn);

        self.get_trip_log(trip_id)
    }

    /// Deletes a trip log. Returns `false` if there was nothing to delete.
    pub fn delete_trip_log(&self, trip_id: i64) -> Result<bool> {
        let removed = self
            .connect()?
            .execute("DELETE FROM trip_logs WHERE id = ?1", [trip_id])?;
        Ok(removed > 0)
    }

    pub fn count_trip_logs(&self, river_id: Option<i64>) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = match river_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM trip_logs WHERE river_id = ?1",
                [id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM trip_logs", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    // ── Attachment metadata ───────────────────────────────────────

    /// Registers attachment metadata. The file itself is handled by
    /// [`AttachmentManager`](crate::AttachmentManager).
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::RiverNotFound`] or [`RiverRunError::Database`].
    pub fn add_attachment(&self, new: &NewAttachment) -> Result<i64> {
        let conn = self.connect()?;
        ensure_river_exists(&conn, new.river_id)?;
        conn.execute(
            "INSERT INTO river_documents (river_id, file_name, file_path, file_type, file_size,
                description, upload_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.river_id,
                new.file_name,
                new.file_path,
                new.file_type,
                new.file_size,
                new.description,
                format_timestamp(timestamp::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_attachment(&self, attachment_id: i64) -> Result<Option<Attachment>> {
        let conn = self.connect()?;
        let attachment = conn
            .query_row(
                &format!("{ATTACHMENT_SELECT} WHERE id = ?1"),
                [attachment_id],
                map_attachment_row,
            )
            .optional()?;
        Ok(attachment)
    }

    /// # Errors
    ///
    /// Returns [`RiverRunError::AttachmentNotFound`] if no attachment has this id.
    pub fn get_attachment(&self, attachment_id: i64) -> Result<Attachment> {
        self.find_attachment(attachment_id)?
            .ok_or(RiverRunError::AttachmentNotFound(attachment_id))
    }

    /// Returns the attachments of a river in upload order.
    pub fn get_river_documents(&self, river_id: i64) -> Result<Vec<Attachment>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{ATTACHMENT_SELECT} WHERE river_id = ?1 ORDER BY id"))?;
        let docs = stmt
            .query_map([river_id], map_attachment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    /// Changes an attachment's description. File name, path, type and size
    /// describe the managed copy and are fixed at ingest.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::AttachmentNotFound`] for an unknown id.
    pub fn update_attachment_description(
        &self,
        attachment_id: i64,
        description: &str,
    ) -> Result<Attachment> {
        let changed = self.connect()?.execute(
            "UPDATE river_documents SET description = ?1 WHERE id = ?2",
            params![description.trim(), attachment_id],
        )?;
        if changed == 0 {
            return Err(RiverRunError::AttachmentNotFound(attachment_id));
        }
        self.get_attachment(attachment_id)
    }

    /// Deletes an attachment row and returns it, or `None` if it did not exist.
    pub fn delete_attachment(&self, attachment_id: i64) -> Result<Option<Attachment>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let attachment = tx
            .query_row(
                &format!("{ATTACHMENT_SELECT} WHERE id = ?1"),
                [attachment_id],
                map_attachment_row,
            )
            .optional()?;
        if attachment.is_some() {
            tx.execute("DELETE FROM river_documents WHERE id = ?1", [attachment_id])?;
            tx.commit()?;
        }
        Ok(attachment)
    }
}

fn ensure_river_exists(conn: &Connection, river_id: i64) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM rivers WHERE id = ?1",
        [river_id],
        |row| row.get::<_, i64>(0).map(|count| count > 0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(RiverRunError::RiverNotFound(river_id))
    }
}

/// Bind values for the 22 writable river columns, in table order.
fn river_values(data: &RiverData) -> Vec<Value> {
    vec![
        Value::Text(data.name.clone()),
        Value::Text(data.location.clone()),
        Value::from(data.region.clone()),
        Value::from(data.latitude),
        Value::from(data.longitude),
        Value::from(data.difficulty_class.map(|d| d.as_str().to_string())),
        Value::from(data.length_miles),
        Value::from(data.typical_flow_min),
        Value::from(data.typical_flow_max),
        Value::from(data.put_in_location.clone()),
        Value::from(data.take_out_location.clone()),
        Value::from(data.shuttle_info.clone()),
        Value::from(data.parking_details.clone()),
        Value::from(data.best_seasons.clone()),
        Value::from(data.water_level_source.clone()),
        Value::from(data.hazards.clone()),
        Value::from(data.portages.clone()),
        Value::from(data.emergency_contacts.clone()),
        Value::from(data.description.clone()),
        Value::from(data.personal_rating.map(i64::from)),
        Value::from(data.notes.clone()),
        Value::from(data.tags.clone()),
    ]
}

/// Bind values for the 13 writable trip columns, in table order.
fn trip_values(data: &TripLogData) -> Vec<Value> {
    vec![
        Value::Integer(data.river_id),
        Value::Text(data.trip_date.format(TRIP_DATE_FORMAT).to_string()),
        Value::from(data.companions.clone()),
        Value::from(data.water_level.clone()),
        Value::from(data.weather_conditions.clone()),
        Value::from(data.flow_rate),
        Value::from(data.duration_hours),
        Value::from(data.difficulty_experienced.clone()),
        Value::from(data.highlights.clone()),
        Value::from(data.challenges.clone()),
        Value::from(data.gear_used.clone()),
        Value::from(data.trip_rating.map(i64::from)),
        Value::from(data.notes.clone()),
    ]
}

fn map_river_row(row: &rusqlite::Row) -> rusqlite::Result<River> {
    let id: i64 = row.get(0)?;
    let difficulty_raw = lenient_text(row, 6)?;
    let difficulty_class = match difficulty_raw.as_deref().map(DifficultyClass::parse_optional) {
        Some(Ok(class)) => class,
        Some(Err(e)) => {
            log::warn!("River {id}: ignoring stored difficulty class: {e}");
            None
        }
        None => None,
    };

    let data = RiverData {
        name: lenient_text(row, 1)?.unwrap_or_default(),
        location: lenient_text(row, 2)?.unwrap_or_default(),
        region: lenient_text(row, 3)?,
        latitude: lenient_f64(row, 4, id, "latitude")?,
        longitude: lenient_f64(row, 5, id, "longitude")?,
        difficulty_class,
        length_miles: lenient_f64(row, 7, id, "length_miles")?,
        typical_flow_min: lenient_i64(row, 8, id, "typical_flow_min")?,
        typical_flow_max: lenient_i64(row, 9, id, "typical_flow_max")?,
        put_in_location: lenient_text(row, 10)?,
        take_out_location: lenient_text(row, 11)?,
        shuttle_info: lenient_text(row, 12)?,
        parking_details: lenient_text(row, 13)?,
        best_seasons: lenient_text(row, 14)?,
        water_level_source: lenient_text(row, 15)?,
        hazards: lenient_text(row, 16)?,
        portages: lenient_text(row, 17)?,
        emergency_contacts: lenient_text(row, 18)?,
        description: lenient_text(row, 19)?,
        personal_rating: lenient_rating(row, 20, id, "personal_rating")?,
        notes: lenient_text(row, 21)?,
        tags: lenient_text(row, 22)?,
    };

    Ok(River {
        id,
        data: data.normalized(),
        date_added: timestamp::column(row, 23)?,
        last_updated: timestamp::column(row, 24)?,
    })
}

/// Maps a trip row, or `None` when its date cannot be read. Such rows are
/// left in the table but kept out of every listing.
fn map_trip_row(row: &rusqlite::Row) -> rusqlite::Result<Option<TripLog>> {
    let id: i64 = row.get(0)?;
    let Some(trip_date) = stored_trip_date(row.get(2)?) else {
        log::warn!("Skipping trip log {id}: unreadable trip date");
        return Ok(None);
    };

    let data = TripLogData {
        river_id: row.get(1)?,
        trip_date,
        companions: lenient_text(row, 3)?,
        water_level: lenient_text(row, 4)?,
        weather_conditions: lenient_text(row, 5)?,
        flow_rate: lenient_i64(row, 6, id, "flow_rate")?,
        duration_hours: lenient_f64(row, 7, id, "duration_hours")?,
        difficulty_experienced: lenient_text(row, 8)?,
        highlights: lenient_text(row, 9)?,
        challenges: lenient_text(row, 10)?,
        gear_used: lenient_text(row, 11)?,
        trip_rating: lenient_rating(row, 12, id, "trip_rating")?,
        notes: lenient_text(row, 13)?,
    };

    Ok(Some(TripLog {
        id,
        data: data.normalized(),
        created_date: timestamp::column(row, 14)?,
        river_name: row.get(15)?,
    }))
}

// Older versions bound form input straight into the table, so numeric and
// date columns may hold text such as '' or "about 3". The readers below turn
// anything unusable into `None` instead of failing the whole query.

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn stored_trip_date(value: Value) -> Option<NaiveDate> {
    let Value::Text(raw) = value else {
        return None;
    };
    let raw = raw.trim();
    parse_trip_date(raw)
        .ok()
        .or_else(|| raw.get(..10).and_then(|day| parse_trip_date(day).ok()))
}

fn lenient_text(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get::<_, Value>(idx)? {
        Value::Text(s) => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Null | Value::Blob(_) => None,
    })
}

fn lenient_f64(
    row: &rusqlite::Row,
    idx: usize,
    id: i64,
    field: &str,
) -> rusqlite::Result<Option<f64>> {
    let parsed = match row.get::<_, Value>(idx)? {
        Value::Null => None,
        Value::Integer(i) => Some(i as f64),
        Value::Real(r) => Some(r),
        Value::Text(s) if s.trim().is_empty() => None,
        Value::Text(s) => {
            let number = s.trim().parse::<f64>().ok().filter(|n| n.is_finite());
            if number.is_none() {
                log::warn!("Row {id}: ignoring non-numeric {field} '{s}'");
            }
            number
        }
        Value::Blob(_) => {
            log::warn!("Row {id}: ignoring binary {field}");
            None
        }
    };
    Ok(parsed)
}

fn lenient_i64(
    row: &rusqlite::Row,
    idx: usize,
    id: i64,
    field: &str,
) -> rusqlite::Result<Option<i64>> {
    let parsed = match row.get::<_, Value>(idx)? {
        Value::Null => None,
        Value::Integer(i) => Some(i),
        Value::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => Some(r as i64),
        Value::Text(s) if s.trim().is_empty() => None,
        Value::Text(s) => {
            let number = s.trim().parse::<i64>().ok();
            if number.is_none() {
                log::warn!("Row {id}: ignoring non-integer {field} '{s}'");
            }
            number
        }
        Value::Real(r) => {
            log::warn!("Row {id}: ignoring non-integer {field} {r}");
            None
        }
        Value::Blob(_) => {
            log::warn!("Row {id}: ignoring binary {field}");
            None
        }
    };
    Ok(parsed)
}

fn lenient_rating(
    row: &rusqlite::Row,
    idx: usize,
    id: i64,
    field: &str,
) -> rusqlite::Result<Option<u8>> {
    Ok(lenient_i64(row, idx, id, field)?.and_then(|n| match u8::try_from(n) {
        Ok(rating @ 1..=5) => Some(rating),
        _ => {
            log::warn!("Row {id}: ignoring out-of-range {field} {n}");
            None
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn setup() -> (RiverStore, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let store = RiverStore::open(temp.path()).unwrap();
        (store, temp)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn attach_row(store: &RiverStore, river_id: i64, name: &str) -> i64 {
        store
            .add_attachment(&NewAttachment {
                river_id,
                file_name: name.to_string(),
                file_path: format!("/tmp/{name}"),
                file_type: ".txt".to_string(),
                file_size: 3,
                description: String::new(),
            })
            .unwrap()
    }

    #[test]
    fn test_add_and_get_river() {
        let (store, _temp) = setup();
        let data = RiverData {
            difficulty_class: Some(DifficultyClass::ClassIII),
            personal_rating: Some(4),
            latitude: Some(35.06),
            hazards: Some("Hell Hole".to_string()),
            ..RiverData::new("Ocoee", "Tennessee")
        };

        let id = store.add_river(&data).unwrap();
        let river = store.get_river(id).unwrap();

        assert_eq!(river.id, id);
        assert_eq!(river.data, data);
        assert_eq!(river.date_added, river.last_updated);
    }

    #[test]
    fn test_add_river_rejects_missing_location() {
        let (store, _temp) = setup();
        let result = store.add_river(&RiverData::new("Ocoee", "   "));
        assert!(matches!(result, Err(RiverRunError::ValidationFailed(_))));
        assert_eq!(store.count_rivers().unwrap(), 0);
    }

    #[test]
    fn test_get_river_not_found() {
        let (store, _temp) = setup();
        assert!(matches!(store.get_river(77), Err(RiverRunError::RiverNotFound(77))));
        assert!(store.find_river(77).unwrap().is_none());
    }

    #[test]
    fn test_list_rivers_is_name_ordered() {
        let (store, _temp) = setup();
        store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        store.add_river(&RiverData::new("Gauley", "West Virginia")).unwrap();
        store.add_river(&RiverData::new("Nantahala", "North Carolina")).unwrap();

        let names: Vec<String> = store.list_rivers().unwrap().into_iter().map(|r| r.data.name).collect();
        assert_eq!(names, vec!["Gauley", "Nantahala", "Ocoee"]);
    }

    #[test]
    fn test_list_rivers_filtered() {
        let (store, _temp) = setup();
        store
            .add_river(&RiverData {
                difficulty_class: Some(DifficultyClass::ClassV),
                ..RiverData::new("Gauley", "West Virginia")
            })
            .unwrap();
        store
            .add_river(&RiverData {
                difficulty_class: Some(DifficultyClass::ClassII),
                ..RiverData::new("Nantahala", "North Carolina")
            })
            .unwrap();

        let filter = RiverFilter {
            search: Some("carolina".to_string()),
            difficulty: None,
        };
        let hits = store.list_rivers_filtered(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data.name, "Nantahala");

        let filter = RiverFilter {
            search: None,
            difficulty: Some(DifficultyClass::ClassV),
        };
        assert_eq!(store.list_rivers_filtered(&filter).unwrap()[0].data.name, "Gauley");
    }

    #[test]
    fn test_update_river_advances_last_updated() {
        let (store, _temp) = setup();
        let id = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        let before = store.get_river(id).unwrap();

        let mut data = before.data.clone();
        data.personal_rating = Some(5);
        let after = store.update_river(id, &data).unwrap();
        let again = store.update_river(id, &data).unwrap();

        assert_eq!(after.id, before.id);
        assert_eq!(after.date_added, before.date_added);
        assert!(after.last_updated > before.last_updated);
        assert!(again.last_updated > after.last_updated);
        assert_eq!(after.data.personal_rating, Some(5));
    }

    #[test]
    fn test_update_river_not_found() {
        let (store, _temp) = setup();
        let result = store.update_river(12, &RiverData::new("Ocoee", "Tennessee"));
        assert!(matches!(result, Err(RiverRunError::RiverNotFound(12))));
    }

    #[test]
    fn test_update_river_validation_happens_first() {
        let (store, _temp) = setup();
        let id = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        let result = store.update_river(id, &RiverData::new("", "Tennessee"));
        assert!(matches!(result, Err(RiverRunError::ValidationFailed(_))));
        assert_eq!(store.get_river(id).unwrap().data.name, "Ocoee");
    }

    #[test]
    fn test_delete_river_cascades() {
        let (store, _temp) = setup();
        let id = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        let other = store.add_river(&RiverData::new("Gauley", "West Virginia")).unwrap();
        store.add_trip_log(&TripLogData::new(id, date(2024, 6, 1))).unwrap();
        store.add_trip_log(&TripLogData::new(id, date(2024, 6, 8))).unwrap();
        store.add_trip_log(&TripLogData::new(other, date(2024, 9, 14))).unwrap();
        attach_row(&store, id, "map.txt");

        let deletion = store.delete_river(id).unwrap().unwrap();
        assert_eq!(deletion.trip_logs_removed, 2);
        assert_eq!(deletion.attachments.len(), 1);
        assert_eq!(deletion.attachments[0].file_name, "map.txt");

        assert!(store.find_river(id).unwrap().is_none());
        assert_eq!(store.count_trip_logs(Some(id)).unwrap(), 0);
        assert!(store.get_river_documents(id).unwrap().is_empty());
        assert_eq!(store.count_trip_logs(Some(other)).unwrap(), 1);
    }

    #[test]
    fn test_delete_unknown_river_is_noop() {
        let (store, _temp) = setup();
        assert!(store.delete_river(5).unwrap().is_none());
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let (store, _temp) = setup();
        let first = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        store.delete_river(first).unwrap();
        let second = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_trip_logs_ordered_newest_first_with_stable_ties() {
        let (store, _temp) = setup();
        let ocoee = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        let gauley = store.add_river(&RiverData::new("Gauley", "West Virginia")).unwrap();

        let a = store.add_trip_log(&TripLogData::new(ocoee, date(2024, 5, 1))).unwrap();
        let b = store.add_trip_log(&TripLogData::new(gauley, date(2024, 9, 20))).unwrap();
        let c = store.add_trip_log(&TripLogData::new(ocoee, date(2024, 5, 1))).unwrap();

        let ids: Vec<i64> = store.get_trip_logs(None).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b, a, c]);

        let ocoee_trips = store.get_trip_logs(Some(ocoee)).unwrap();
        assert_eq!(ocoee_trips.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a, c]);
        assert!(ocoee_trips.iter().all(|t| t.river_name == "Ocoee"));
    }

    #[test]
    fn test_add_trip_log_for_unknown_river() {
        let (store, _temp) = setup();
        let result = store.add_trip_log(&TripLogData::new(404, date(2024, 1, 1)));
        assert!(matches!(result, Err(RiverRunError::RiverNotFound(404))));
        assert_eq!(store.count_trip_logs(None).unwrap(), 0);
    }

    #[test]
    fn test_update_and_delete_trip_log() {
        let (store, _temp) = setup();
        let river = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        let trip_id = store.add_trip_log(&TripLogData::new(river, date(2024, 7, 4))).unwrap();

        let mut data = store.get_trip_log(trip_id).unwrap().data;
        data.trip_rating = Some(5);
        data.companions = Some("Sam, Alex".to_string());
        let updated = store.update_trip_log(trip_id, &data).unwrap();
        assert_eq!(updated.data.trip_rating, Some(5));

        assert!(matches!(
            store.update_trip_log(999, &data),
            Err(RiverRunError::TripLogNotFound(999))
        ));

        assert!(store.delete_trip_log(trip_id).unwrap());
        assert!(!store.delete_trip_log(trip_id).unwrap());
        assert!(matches!(store.get_trip_log(trip_id), Err(RiverRunError::TripLogNotFound(_))));
    }

    #[test]
    fn test_attachment_rows() {
        let (store, _temp) = setup();
        let river = store.add_river(&RiverData::new("Ocoee", "Tennessee")).unwrap();
        let first = attach_row(&store, river, "a.txt");
        let second = attach_row(&store, river, "b.txt");

        let docs = store.get_river_documents(river).unwrap();
        assert_eq!(docs.iter().map(|d| d.id).collect::<Vec<_>>(), vec![first, second]);

        let updated = store.update_attachment_description(first, " Gauge photo ").unwrap();
        assert_eq!(updated.description, "Gauge photo");
        assert!(matches!(
            store.update_attachment_description(999, "x"),
            Err(RiverRunError::AttachmentNotFound(999))
        ));

        let removed = store.delete_attachment(second).unwrap().unwrap();
        assert_eq!(removed.file_name, "b.txt");
        assert!(store.delete_attachment(second).unwrap().is_none());
        assert!(matches!(
            store.add_attachment(&NewAttachment {
                river_id: 404,
                file_name: "c.txt".to_string(),
                file_path: "/tmp/c.txt".to_string(),
                file_type: ".txt".to_string(),
                file_size: 1,
                description: String::new(),
            }),
            Err(RiverRunError::RiverNotFound(404))
        ));
    }

    #[test]
    fn test_reads_rows_written_by_older_versions() {
        let (store, _temp) = setup();
        store
            .storage()
            .connect()
            .unwrap()
            .execute_batch(
                "INSERT INTO rivers (name, location, difficulty_class, hazards, date_added, last_updated)
                 VALUES ('Chattooga', 'Georgia', '', '', '2022-03-01 10:00:00', '2022-03-01 10:00:00');
                 INSERT INTO trip_logs (river_id, trip_date, companions, created_date)
                 VALUES (1, '2022-04-02', '', '2022-04-03 09:00:00');",
            )
            .unwrap();

        let river = store.get_river(1).unwrap();
        assert_eq!(river.data.difficulty_class, None);
        assert_eq!(river.data.hazards, None);

        let trips = store.get_trip_logs(Some(1)).unwrap();
        assert_eq!(trips[0].data.trip_date, date(2022, 4, 2));
        assert_eq!(trips[0].data.companions, None);
    }

    #[test]
    fn test_loosely_typed_river_columns_do_not_break_listing() {
        let (store, _temp) = setup();
        store
            .storage()
            .connect()
            .unwrap()
            .execute_batch(
                "INSERT INTO rivers (name, location, latitude, longitude, difficulty_class,
                     length_miles, typical_flow_min, personal_rating, date_added, last_updated)
                 VALUES ('Nantahala', 'North Carolina', '', 'N/A', 'Class II', '8', '',
                     'great', '2021-05-01 10:00:00', '2021-05-01 10:00:00');
                 INSERT INTO rivers (name, location, personal_rating, date_added, last_updated)
                 VALUES ('Ocoee', 'Tennessee', 9, '2021-05-02 10:00:00', '2021-05-02 10:00:00');",
            )
            .unwrap();

        let rivers = store.list_rivers().unwrap();
        assert_eq!(rivers.len(), 2);
        let nantahala = &rivers[0].data;
        assert_eq!(nantahala.latitude, None);
        assert_eq!(nantahala.longitude, None);
        assert_eq!(nantahala.length_miles, Some(8.0));
        assert_eq!(nantahala.typical_flow_min, None);
        assert_eq!(nantahala.personal_rating, None);
        assert_eq!(nantahala.difficulty_class, Some(DifficultyClass::ClassII));
        assert_eq!(rivers[1].data.personal_rating, None);

        assert_eq!(store.statistics().unwrap().total_rivers, 2);
        assert_eq!(crate::export_document(&store, false).unwrap().rivers.len(), 2);

        let incoming = vec![
            serde_json::json!({"name": "Nantahala", "location": "North Carolina"}),
            serde_json::json!({"name": "Chattooga", "location": "Georgia"}),
        ];
        let report = crate::reconcile_rivers(&store, &incoming).unwrap();
        assert_eq!(report.records[0].outcome, crate::RecordOutcome::SkippedDuplicate);
        assert!(report.records[1].outcome.is_imported());
    }

    #[test]
    fn test_trip_with_unreadable_date_is_left_out_of_listings() {
        let (store, _temp) = setup();
        let river_id = store.add_river(&RiverData::new("Chattooga", "Georgia")).unwrap();
        store
            .storage()
            .connect()
            .unwrap()
            .execute_batch(&format!(
                "INSERT INTO trip_logs (river_id, trip_date, created_date)
                 VALUES ({river_id}, '', '2022-04-01 09:00:00');
                 INSERT INTO trip_logs (river_id, trip_date, flow_rate, duration_hours,
                     trip_rating, created_date)
                 VALUES ({river_id}, '2022-04-02 00:00:00', '1200', 'a while', '9',
                     '2022-04-02 09:00:00');
                 INSERT INTO trip_logs (river_id, trip_date, created_date)
                 VALUES ({river_id}, '2022-05-01', '2022-05-01 09:00:00');"
            ))
            .unwrap();

        assert!(store.find_trip_log(1).unwrap().is_none());
        assert_eq!(store.count_trip_logs(None).unwrap(), 3);

        let trips = store.get_trip_logs(None).unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].data.trip_date, date(2022, 5, 1));
        assert_eq!(trips[1].data.trip_date, date(2022, 4, 2));
        assert_eq!(trips[1].data.flow_rate, Some(1200));
        assert_eq!(trips[1].data.duration_hours, None);
        assert_eq!(trips[1].data.trip_rating, None);
        assert_eq!(store.get_trip_logs(Some(river_id)).unwrap().len(), 2);

        assert_eq!(store.statistics().unwrap().total_trips, 2);
        let exported = crate::export_document(&store, true).unwrap();
        assert_eq!(exported.trips.map(|t| t.len()), Some(2));

        let incoming = vec![
            serde_json::json!({"river_id": 7, "river_name": "Chattooga", "trip_date": "2022-05-01"}),
            serde_json::json!({"river_id": 7, "river_name": "Chattooga", "trip_date": "2022-06-01"}),
        ];
        let report = crate::reconcile_trips(&store, &incoming).unwrap();
        assert_eq!(report.records[0].outcome, crate::RecordOutcome::SkippedDuplicate);
        assert!(report.records[1].outcome.is_imported());
    }
}
