//! Paddling statistics derived from the store.

use crate::{Result, RiverStore, TripLog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used in [`Statistics::difficulty_breakdown`] for unclassified rivers.
pub const UNKNOWN_DIFFICULTY: &str = "Unknown";

/// How many trips [`Statistics::recent_trips`] holds.
pub const RECENT_TRIP_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total_rivers: usize,
    pub total_trips: usize,
    /// River count per difficulty label.
    pub difficulty_breakdown: BTreeMap<String, usize>,
    /// Mean of the rated trips, `None` when no trip has a rating.
    pub average_rating: Option<f64>,
    pub total_trip_hours: f64,
    /// Newest trips first.
    pub recent_trips: Vec<TripLog>,
}

impl RiverStore {
    pub fn statistics(&self) -> Result<Statistics> {
        let rivers = self.list_rivers()?;
        let trips = self.get_trip_logs(None)?;

        let mut difficulty_breakdown = BTreeMap::new();
        for river in &rivers {
            let label = river
                .data
                .difficulty_class
                .map_or(UNKNOWN_DIFFICULTY, |d| d.as_str());
            *difficulty_breakdown.entry(label.to_string()).or_insert(0) += 1;
        }

        let ratings: Vec<f64> = trips
            .iter()
            .filter_map(|t| t.data.trip_rating)
            .map(f64::from)
            .collect();
        let average_rating =
            (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);

        let total_trip_hours: f64 = trips.iter().filter_map(|t| t.data.duration_hours).sum();

        Ok(Statistics {
            total_rivers: rivers.len(),
            total_trips: trips.len(),
            difficulty_breakdown,
            average_rating,
            total_trip_hours,
            recent_trips: trips.into_iter().take(RECENT_TRIP_COUNT).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{DifficultyClass, RiverData, RiverStore, TripLogData};
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    #[test]
    fn test_statistics_on_empty_store() {
        let temp = NamedTempFile::new().unwrap();
        let store = RiverStore::open(temp.path()).unwrap();
        let stats = store.statistics().unwrap();

        assert_eq!(stats.total_rivers, 0);
        assert_eq!(stats.total_trips, 0);
        assert!(stats.difficulty_breakdown.is_empty());
        assert_eq!(stats.average_rating, None);
        assert_eq!(stats.total_trip_hours, 0.0);
    }

    #[test]
    fn test_statistics() {
        let temp = NamedTempFile::new().unwrap();
        let store = RiverStore::open(temp.path()).unwrap();
        let gauley = store
            .add_river(&RiverData {
                difficulty_class: Some(DifficultyClass::ClassV),
                ..RiverData::new("Gauley", "West Virginia")
            })
            .unwrap();
        store.add_river(&RiverData::new("Unnamed Creek", "Somewhere")).unwrap();

        for day in 1..=7 {
            let mut trip = TripLogData::new(gauley, NaiveDate::from_ymd_opt(2024, 9, day).unwrap());
            trip.duration_hours = Some(2.5);
            if day <= 2 {
                trip.trip_rating = Some(day as u8 + 2);
            }
            store.add_trip_log(&trip).unwrap();
        }

        let stats = store.statistics().unwrap();
        assert_eq!(stats.total_rivers, 2);
        assert_eq!(stats.total_trips, 7);
        assert_eq!(stats.difficulty_breakdown["Class V"], 1);
        assert_eq!(stats.difficulty_breakdown["Unknown"], 1);
        assert_eq!(stats.average_rating, Some(3.5));
        assert_eq!(stats.total_trip_hours, 17.5);
        assert_eq!(stats.recent_trips.len(), 5);
        assert_eq!(
            stats.recent_trips[0].data.trip_date,
            NaiveDate::from_ymd_opt(2024, 9, 7).unwrap()
        );
    }
}
