//! The JSON interchange document used for export and import.
//!
//! Export serializes stored rows as-is. Import is deliberately loose: the
//! document is checked for shape only, and each record stays a raw
//! [`serde_json::Value`] until [`reconcile`](crate::core::reconcile) looks at
//! it, so one bad record never sinks the whole file.

use crate::{Result, River, RiverRunError, RiverStore, TripLog};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Top-level structure written by [`export_document`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub rivers: Vec<River>,
    pub export_date: DateTime<Utc>,
    pub includes_trip_logs: bool,
    /// Present only when the export was made with trip logs included.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trips: Option<Vec<TripLog>>,
}

impl ExportDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Snapshots every river, and every trip log when `include_trip_logs` is set.
pub fn export_document(store: &RiverStore, include_trip_logs: bool) -> Result<ExportDocument> {
    let rivers = store.list_rivers()?;
    let trips = if include_trip_logs {
        Some(store.get_trip_logs(None)?)
    } else {
        None
    };
    Ok(ExportDocument {
        rivers,
        export_date: Utc::now(),
        includes_trip_logs: include_trip_logs,
        trips,
    })
}

/// Exports the store to `path` as pretty-printed JSON and returns what was written.
///
/// # Errors
///
/// Returns [`RiverRunError::Io`] if the file cannot be written, or any
/// error from [`export_document`].
pub fn write_export(
    store: &RiverStore,
    path: &Path,
    include_trip_logs: bool,
) -> Result<ExportDocument> {
    let document = export_document(store, include_trip_logs)?;
    fs::write(path, document.to_json_pretty()?)?;
    log::info!(
        "Exported {} rivers and {} trip logs to {}",
        document.rivers.len(),
        document.trips.as_ref().map_or(0, Vec::len),
        path.display()
    );
    Ok(document)
}

/// Suggested file name for an export made on `date`.
pub fn default_export_file_name(date: NaiveDate) -> String {
    format!("whitewater_data_{}.json", date.format("%Y%m%d"))
}

/// A parsed interchange document whose records have not been interpreted yet.
#[derive(Debug, Clone, Default)]
pub struct ImportPayload {
    pub rivers: Vec<Value>,
    pub trips: Vec<Value>,
    pub export_date: Option<String>,
    pub includes_trip_logs: Option<bool>,
}

/// Checks the shape of an interchange document and splits out its records.
///
/// # Errors
///
/// Returns [`RiverRunError::InvalidFormat`] if `text` is not JSON, is not an
/// object, has no `rivers` array, or has a `trips` value that is neither an
/// array nor `null`.
pub fn parse_document(text: &str) -> Result<ImportPayload> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| RiverRunError::InvalidFormat(format!("not valid JSON: {e}")))?;
    let Value::Object(mut root) = root else {
        return Err(RiverRunError::InvalidFormat(
            "top level must be an object".to_string(),
        ));
    };

    let rivers = match root.remove("rivers") {
        Some(Value::Array(rivers)) => rivers,
        Some(_) => {
            return Err(RiverRunError::InvalidFormat(
                "'rivers' must be an array".to_string(),
            ))
        }
        None => return Err(RiverRunError::InvalidFormat("missing 'rivers'".to_string())),
    };

    let trips = match root.remove("trips") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(trips)) => trips,
        Some(_) => {
            return Err(RiverRunError::InvalidFormat(
                "'trips' must be an array".to_string(),
            ))
        }
    };

    Ok(ImportPayload {
        rivers,
        trips,
        export_date: root
            .get("export_date")
            .and_then(Value::as_str)
            .map(str::to_string),
        includes_trip_logs: root.get("includes_trip_logs").and_then(Value::as_bool),
    })
}

/// Reads and parses an interchange document from disk.
pub fn read_document(path: &Path) -> Result<ImportPayload> {
    let text = fs::read_to_string(path)?;
    parse_document(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DifficultyClass, RiverData, TripLogData};
    use tempfile::{NamedTempFile, TempDir};

    fn seeded_store() -> (RiverStore, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let store = RiverStore::open(temp.path()).unwrap();
        let ocoee = store
            .add_river(&RiverData {
                difficulty_class: Some(DifficultyClass::ClassIII),
                ..RiverData::new("Ocoee", "Tennessee")
            })
            .unwrap();
        store
            .add_trip_log(&TripLogData::new(
                ocoee,
                NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            ))
            .unwrap();
        (store, temp)
    }

    #[test]
    fn test_export_with_trips() {
        let (store, _temp) = seeded_store();
        let doc = export_document(&store, true).unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["includes_trip_logs"], true);
        assert_eq!(value["rivers"][0]["name"], "Ocoee");
        assert!(value["rivers"][0]["id"].is_i64());
        assert_eq!(value["trips"][0]["river_name"], "Ocoee");
        assert_eq!(value["trips"][0]["trip_date"], "2024-06-15");
    }

    #[test]
    fn test_export_without_trips_omits_key() {
        let (store, _temp) = seeded_store();
        let doc = export_document(&store, false).unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["includes_trip_logs"], false);
        assert!(value.get("trips").is_none());
    }

    #[test]
    fn test_keys_are_written_in_document_order() {
        let (store, _temp) = seeded_store();
        let json = export_document(&store, true).unwrap().to_json_pretty().unwrap();
        let rivers = json.find("\"rivers\"").unwrap();
        let date = json.find("\"export_date\"").unwrap();
        let flag = json.find("\"includes_trip_logs\"").unwrap();
        let trips = json.find("\"trips\"").unwrap();
        assert!(rivers < date && date < flag && flag < trips);
    }

    #[test]
    fn test_write_export_then_read_document() {
        let (store, _temp) = seeded_store();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(default_export_file_name(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        ));

        write_export(&store, &path, true).unwrap();
        let payload = read_document(&path).unwrap();

        assert!(path.ends_with("whitewater_data_20240701.json"));
        assert_eq!(payload.rivers.len(), 1);
        assert_eq!(payload.trips.len(), 1);
        assert_eq!(payload.includes_trip_logs, Some(true));
        assert!(payload.export_date.is_some());
    }

    #[test]
    fn test_parse_document_null_or_missing_trips() {
        let payload = parse_document(r#"{"rivers": [], "trips": null}"#).unwrap();
        assert!(payload.trips.is_empty());

        let payload = parse_document(r#"{"rivers": [{"name": "Gauley"}]}"#).unwrap();
        assert_eq!(payload.rivers.len(), 1);
        assert!(payload.trips.is_empty());
        assert_eq!(payload.includes_trip_logs, None);
    }

    #[test]
    fn test_parse_document_rejects_bad_shapes() {
        for text in [
            "not json at all",
            "[1, 2, 3]",
            r#"{"trips": []}"#,
            r#"{"rivers": {"name": "Ocoee"}}"#,
            r#"{"rivers": [], "trips": "none"}"#,
        ] {
            assert!(
                matches!(parse_document(text), Err(RiverRunError::InvalidFormat(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn test_read_document_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_document(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(RiverRunError::Io(_))));
    }
}
