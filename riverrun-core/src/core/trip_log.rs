//! Trip log types.

use crate::core::river::{blank_to_none, check_non_negative, check_rating};
use crate::{Result, RiverRunError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Date format of the `trip_date` column and of `trip_date` in exports.
pub const TRIP_DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything about a trip that a caller may write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLogData {
    pub river_id: i64,
    pub trip_date: NaiveDate,
    pub companions: Option<String>,
    pub water_level: Option<String>,
    pub weather_conditions: Option<String>,
    pub flow_rate: Option<i64>,
    pub duration_hours: Option<f64>,
    pub difficulty_experienced: Option<String>,
    pub highlights: Option<String>,
    pub challenges: Option<String>,
    pub gear_used: Option<String>,
    pub trip_rating: Option<u8>,
    pub notes: Option<String>,
}

impl TripLogData {
    pub fn new(river_id: i64, trip_date: NaiveDate) -> Self {
        Self {
            river_id,
            trip_date,
            companions: None,
            water_level: None,
            weather_conditions: None,
            flow_rate: None,
            duration_hours: None,
            difficulty_experienced: None,
            highlights: None,
            challenges: None,
            gear_used: None,
            trip_rating: None,
            notes: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`RiverRunError::ValidationFailed`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.flow_rate.is_some_and(|v| v < 0) {
            return Err(RiverRunError::ValidationFailed("flow_rate cannot be negative".to_string()));
        }
        check_non_negative("duration_hours", self.duration_hours)?;
        check_rating("trip_rating", self.trip_rating)
    }

    pub(crate) fn normalized(mut self) -> Self {
        for field in [
            &mut self.companions,
            &mut self.water_level,
            &mut self.weather_conditions,
            &mut self.difficulty_experienced,
            &mut self.highlights,
            &mut self.challenges,
            &mut self.gear_used,
            &mut self.notes,
        ] {
            blank_to_none(field);
        }
        self
    }
}

/// A stored trip log, carrying the owning river's name for display and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLog {
    pub id: i64,
    #[serde(flatten)]
    pub data: TripLogData,
    pub river_name: String,
    pub created_date: DateTime<Utc>,
}

/// Parses a `YYYY-MM-DD` trip date.
///
/// # Errors
///
/// Returns [`RiverRunError::ValidationFailed`] if `raw` is not a calendar date.
pub fn parse_trip_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), TRIP_DATE_FORMAT)
        .map_err(|_| RiverRunError::ValidationFailed(format!("Invalid trip date '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_date_serializes_as_plain_date() {
        let data = TripLogData::new(3, NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["trip_date"], "2024-07-04");
    }

    #[test]
    fn test_parse_trip_date() {
        assert_eq!(
            parse_trip_date(" 2023-10-21 ").unwrap(),
            NaiveDate::from_ymd_opt(2023, 10, 21).unwrap()
        );
        assert!(parse_trip_date("21/10/2023").is_err());
        assert!(parse_trip_date("2023-02-30").is_err());
    }

    #[test]
    fn test_validate_trip_rating_and_duration() {
        let mut data = TripLogData::new(1, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(data.validate().is_ok());

        data.trip_rating = Some(0);
        assert!(data.validate().is_err());

        data.trip_rating = Some(4);
        data.duration_hours = Some(-1.5);
        assert!(data.validate().is_err());
    }
}
