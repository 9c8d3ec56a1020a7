//! Timestamp encoding for the `TIMESTAMP` columns.
//!
//! New rows are written as RFC 3339 UTC with microsecond precision. Rows
//! written by older versions use SQLite's `CURRENT_TIMESTAMP` format
//! (`YYYY-MM-DD HH:MM:SS`, implicitly UTC); both are accepted on read.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};

const LEGACY_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    LEGACY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Current time truncated to what survives a round trip through the database.
pub(crate) fn now() -> DateTime<Utc> {
    let ts = Utc::now();
    parse_timestamp(&format_timestamp(ts)).unwrap_or(ts)
}

/// A stamp strictly later than `previous`, even if the clock has not moved on.
pub(crate) fn advance_from(previous: DateTime<Utc>) -> DateTime<Utc> {
    let ts = now();
    if ts > previous {
        ts
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Reads a `TIMESTAMP` column into a `DateTime<Utc>`.
pub(crate) fn column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognised timestamp '{raw}'").into(),
        )
    })
}
