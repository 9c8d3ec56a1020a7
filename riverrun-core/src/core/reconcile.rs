//! Merges an imported document into the store without creating duplicates.
//!
//! Rivers are matched on name and location, trips on river and date, both
//! case- and whitespace-insensitive. Existing rows are never modified: a
//! match is simply skipped. Every incoming record gets a [`RecordResult`],
//! and a record that cannot be imported never aborts the rest of the batch.

use crate::core::export::ImportPayload;
use crate::core::trip_log::{parse_trip_date, TRIP_DATE_FORMAT};
use crate::{Result, RiverData, RiverRunError, RiverStore, TripLogData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// What happened to one incoming record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Imported { id: i64 },
    SkippedDuplicate,
    /// A trip whose `river_name` matches no river in the store.
    SkippedUnresolvedRiver,
    /// The record has the wrong shape or breaks a field constraint.
    SkippedInvalid { reason: String },
    /// The store refused the write for some other reason.
    SkippedFailed { reason: String },
}

impl RecordOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    /// Position of the record in the incoming list.
    pub index: usize,
    /// Human-readable identification, e.g. the river name.
    pub label: String,
    pub outcome: RecordOutcome,
}

/// Per-record results for one kind of record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub records: Vec<RecordResult>,
}

impl ReconcileReport {
    pub fn imported_count(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_imported()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.records.len() - self.imported_count()
    }

    fn push(&mut self, index: usize, label: String, outcome: RecordOutcome) {
        match &outcome {
            RecordOutcome::SkippedFailed { reason } => {
                log::warn!("Import of record {index} ({label}) failed: {reason}");
            }
            RecordOutcome::SkippedInvalid { reason } => {
                log::debug!("Skipping invalid record {index} ({label}): {reason}");
            }
            _ => {}
        }
        self.records.push(RecordResult {
            index,
            label,
            outcome,
        });
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// When false, incoming trips are counted in
    /// [`ImportSummary::trips_ignored`] and otherwise left alone.
    pub include_trip_logs: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            include_trip_logs: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub rivers: ReconcileReport,
    pub trips: ReconcileReport,
    /// Trips present in the document but not processed because trip
    /// interchange was disabled.
    pub trips_ignored: usize,
}

impl ImportSummary {
    pub fn imported_count(&self) -> usize {
        self.rivers.imported_count() + self.trips.imported_count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rivers.skipped_count() + self.trips.skipped_count() + self.trips_ignored
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn river_key(name: &str, location: &str) -> String {
    format!("{}|{}", normalize(name), normalize(location))
}

fn str_field<'a>(record: &'a Value, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Turns a store error for a single record into its outcome.
fn failure_outcome(err: RiverRunError) -> RecordOutcome {
    match err {
        RiverRunError::ValidationFailed(reason) | RiverRunError::InvalidFormat(reason) => {
            RecordOutcome::SkippedInvalid { reason }
        }
        other => RecordOutcome::SkippedFailed {
            reason: other.to_string(),
        },
    }
}

/// Adds every incoming river whose normalized name and location are not
/// already present, in the store or earlier in the same batch.
///
/// # Errors
///
/// Only fails if the existing rivers cannot be read; per-record failures
/// are reported in the returned [`ReconcileReport`].
pub fn reconcile_rivers(store: &RiverStore, incoming: &[Value]) -> Result<ReconcileReport> {
    let mut known: HashSet<String> = store
        .list_rivers()?
        .iter()
        .map(|river| river_key(&river.data.name, &river.data.location))
        .collect();

    let mut report = ReconcileReport::default();
    for (index, record) in incoming.iter().enumerate() {
        let label = str_field(record, "name").to_string();
        if !record.is_object() {
            report.push(
                index,
                label,
                RecordOutcome::SkippedInvalid {
                    reason: "record is not an object".to_string(),
                },
            );
            continue;
        }

        let key = river_key(&label, str_field(record, "location"));
        if known.contains(&key) {
            report.push(index, label, RecordOutcome::SkippedDuplicate);
            continue;
        }

        // Unknown keys such as id and the timestamps are ignored here.
        let data: RiverData = match serde_json::from_value(record.clone()) {
            Ok(data) => data,
            Err(e) => {
                report.push(
                    index,
                    label,
                    RecordOutcome::SkippedInvalid {
                        reason: e.to_string(),
                    },
                );
                continue;
            }
        };

        let outcome = match store.add_river(&data) {
            Ok(id) => {
                known.insert(key);
                RecordOutcome::Imported { id }
            }
            Err(e) => failure_outcome(e),
        };
        report.push(index, label, outcome);
    }

    log::info!(
        "River import: {} imported, {} skipped",
        report.imported_count(),
        report.skipped_count()
    );
    Ok(report)
}

/// Lenient view of an incoming trip; ids are resolved separately.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TripRecord {
    river_name: Option<String>,
    trip_date: Option<String>,
    companions: Option<String>,
    water_level: Option<String>,
    weather_conditions: Option<String>,
    flow_rate: Option<i64>,
    duration_hours: Option<f64>,
    difficulty_experienced: Option<String>,
    highlights: Option<String>,
    challenges: Option<String>,
    gear_used: Option<String>,
    trip_rating: Option<u8>,
    notes: Option<String>,
}

impl TripRecord {
    fn into_data(self, river_id: i64) -> Result<TripLogData> {
        let trip_date = parse_trip_date(self.trip_date.as_deref().unwrap_or_default())?;
        Ok(TripLogData {
            river_id,
            trip_date,
            companions: self.companions,
            water_level: self.water_level,
            weather_conditions: self.weather_conditions,
            flow_rate: self.flow_rate,
            duration_hours: self.duration_hours,
            difficulty_experienced: self.difficulty_experienced,
            highlights: self.highlights,
            challenges: self.challenges,
            gear_used: self.gear_used,
            trip_rating: self.trip_rating,
            notes: self.notes,
        })
    }
}

/// Adds incoming trips, remapping each onto the local river with the same
/// name. Run this after [`reconcile_rivers`] so rivers from the same
/// document resolve.
///
/// When several rivers share a name the one with the highest id wins.
///
/// # Errors
///
/// Only fails if the existing rivers or trips cannot be read.
pub fn reconcile_trips(store: &RiverStore, incoming: &[Value]) -> Result<ReconcileReport> {
    let river_ids: HashMap<String, i64> = store
        .list_rivers()?
        .into_iter()
        .map(|river| (normalize(&river.data.name), river.id))
        .fold(HashMap::new(), |mut map, (name, id)| {
            let slot = map.entry(name).or_insert(id);
            *slot = (*slot).max(id);
            map
        });
    let mut known: HashSet<String> = store
        .get_trip_logs(None)?
        .iter()
        .map(|trip| trip_key(trip.data.river_id, &trip.data))
        .collect();

    let mut report = ReconcileReport::default();
    for (index, record) in incoming.iter().enumerate() {
        let label = format!(
            "{} {}",
            str_field(record, "river_name"),
            str_field(record, "trip_date")
        )
        .trim()
        .to_string();

        if !record.is_object() {
            report.push(
                index,
                label,
                RecordOutcome::SkippedInvalid {
                    reason: "record is not an object".to_string(),
                },
            );
            continue;
        }

        let parsed: TripRecord = match serde_json::from_value(record.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                report.push(
                    index,
                    label,
                    RecordOutcome::SkippedInvalid {
                        reason: e.to_string(),
                    },
                );
                continue;
            }
        };

        let Some(&river_id) = parsed
            .river_name
            .as_deref()
            .and_then(|name| river_ids.get(&normalize(name)))
        else {
            report.push(index, label, RecordOutcome::SkippedUnresolvedRiver);
            continue;
        };

        let data = match parsed.into_data(river_id) {
            Ok(data) => data,
            Err(e) => {
                report.push(index, label, failure_outcome(e));
                continue;
            }
        };

        let key = trip_key(river_id, &data);
        if known.contains(&key) {
            report.push(index, label, RecordOutcome::SkippedDuplicate);
            continue;
        }

        let outcome = match store.add_trip_log(&data) {
            Ok(id) => {
                known.insert(key);
                RecordOutcome::Imported { id }
            }
            Err(e) => failure_outcome(e),
        };
        report.push(index, label, outcome);
    }

    log::info!(
        "Trip import: {} imported, {} skipped",
        report.imported_count(),
        report.skipped_count()
    );
    Ok(report)
}

fn trip_key(river_id: i64, data: &TripLogData) -> String {
    format!("{river_id}|{}", data.trip_date.format(TRIP_DATE_FORMAT))
}

/// Imports rivers, then trips if `options` allow it.
pub fn import_payload(
    store: &RiverStore,
    payload: &ImportPayload,
    options: ImportOptions,
) -> Result<ImportSummary> {
    let rivers = reconcile_rivers(store, &payload.rivers)?;
    let (trips, trips_ignored) = if options.include_trip_logs {
        (reconcile_trips(store, &payload.trips)?, 0)
    } else {
        if !payload.trips.is_empty() {
            log::info!(
                "Trip import disabled; ignoring {} trip logs",
                payload.trips.len()
            );
        }
        (ReconcileReport::default(), payload.trips.len())
    };
    Ok(ImportSummary {
        rivers,
        trips,
        trips_ignored,
    })
}
