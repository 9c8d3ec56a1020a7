//! River profile types and field validation.

use crate::{Result, RiverRunError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// International whitewater difficulty scale.
///
/// Serialized as the human label (`"Class III"`), which is also what the
/// `difficulty_class` column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DifficultyClass {
    #[serde(rename = "Class I")]
    ClassI,
    #[serde(rename = "Class II")]
    ClassII,
    #[serde(rename = "Class III")]
    ClassIII,
    #[serde(rename = "Class IV")]
    ClassIV,
    #[serde(rename = "Class V")]
    ClassV,
    #[serde(rename = "Class VI")]
    ClassVI,
}

impl DifficultyClass {
    pub const ALL: [DifficultyClass; 6] = [
        Self::ClassI,
        Self::ClassII,
        Self::ClassIII,
        Self::ClassIV,
        Self::ClassV,
        Self::ClassVI,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassI => "Class I",
            Self::ClassII => "Class II",
            Self::ClassIII => "Class III",
            Self::ClassIV => "Class IV",
            Self::ClassV => "Class V",
            Self::ClassVI => "Class VI",
        }
    }

    /// Parses a stored or imported label; the empty string means "unclassified".
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::ValidationFailed`] for any other unknown label.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for DifficultyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyClass {
    type Err = RiverRunError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RiverRunError::ValidationFailed(format!("Unknown difficulty class '{s}'")))
    }
}

/// Everything about a river that a caller may write.
///
/// This is the payload for [`RiverStore::add_river`](crate::RiverStore::add_river)
/// and [`RiverStore::update_river`](crate::RiverStore::update_river). Store-assigned
/// fields (`id`, `date_added`, `last_updated`) live on [`River`] only, so an
/// imported record can never smuggle them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverData {
    pub name: String,
    pub location: String,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "difficulty_or_blank")]
    pub difficulty_class: Option<DifficultyClass>,
    pub length_miles: Option<f64>,
    pub typical_flow_min: Option<i64>,
    pub typical_flow_max: Option<i64>,
    pub put_in_location: Option<String>,
    pub take_out_location: Option<String>,
    pub shuttle_info: Option<String>,
    pub parking_details: Option<String>,
    pub best_seasons: Option<String>,
    pub water_level_source: Option<String>,
    pub hazards: Option<String>,
    pub portages: Option<String>,
    pub emergency_contacts: Option<String>,
    pub description: Option<String>,
    pub personal_rating: Option<u8>,
    pub notes: Option<String>,
    pub tags: Option<String>,
}

impl RiverData {
    /// Minimal payload with only the required fields set.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    /// Checks the field constraints every persisted river must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::ValidationFailed`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RiverRunError::ValidationFailed("River name is required".to_string()));
        }
        if self.location.trim().is_empty() {
            return Err(RiverRunError::ValidationFailed("River location is required".to_string()));
        }
        check_range("latitude", self.latitude, -90.0, 90.0)?;
        check_range("longitude", self.longitude, -180.0, 180.0)?;
        check_non_negative("length_miles", self.length_miles)?;
        for (field, flow) in [
            ("typical_flow_min", self.typical_flow_min),
            ("typical_flow_max", self.typical_flow_max),
        ] {
            if flow.is_some_and(|v| v < 0) {
                return Err(RiverRunError::ValidationFailed(format!("{field} cannot be negative")));
            }
        }
        check_rating("personal_rating", self.personal_rating)
    }

    /// Blank optional text becomes `None`, so "" and NULL never both mean empty.
    pub(crate) fn normalized(mut self) -> Self {
        for field in [
            &mut self.region,
            &mut self.put_in_location,
            &mut self.take_out_location,
            &mut self.shuttle_info,
            &mut self.parking_details,
            &mut self.best_seasons,
            &mut self.water_level_source,
            &mut self.hazards,
            &mut self.portages,
            &mut self.emergency_contacts,
            &mut self.description,
            &mut self.notes,
            &mut self.tags,
        ] {
            blank_to_none(field);
        }
        self
    }
}

/// A river as stored, including the store-assigned identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct River {
    pub id: i64,
    #[serde(flatten)]
    pub data: RiverData,
    pub date_added: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Narrows [`RiverStore::list_rivers_filtered`](crate::RiverStore::list_rivers_filtered).
#[derive(Debug, Clone, Default)]
pub struct RiverFilter {
    /// Case-insensitive substring matched against name, location and difficulty.
    pub search: Option<String>,
    /// Exact difficulty class.
    pub difficulty: Option<DifficultyClass>,
}

impl RiverFilter {
    pub fn matches(&self, river: &River) -> bool {
        if let Some(wanted) = self.difficulty {
            if river.data.difficulty_class != Some(wanted) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let haystack = format!(
                    "{} {} {}",
                    river.data.name,
                    river.data.location,
                    river.data.difficulty_class.map(|d| d.as_str()).unwrap_or_default()
                )
                .to_lowercase();
                haystack.contains(&needle.to_lowercase())
            }
        }
    }
}

pub(crate) fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => Err(RiverRunError::ValidationFailed(
            format!("{field} must be between {min} and {max}"),
        )),
        _ => Ok(()),
    }
}

pub(crate) fn check_non_negative(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(RiverRunError::ValidationFailed(format!(
            "{field} cannot be negative"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_rating(field: &str, value: Option<u8>) -> Result<()> {
    match value {
        Some(r) if !(1..=5).contains(&r) => Err(RiverRunError::ValidationFailed(format!(
            "{field} must be between 1 and 5"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn blank_to_none(field: &mut Option<String>) {
    if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
        *field = None;
    }
}

/// Older exports write `""` for an unclassified river.
fn difficulty_or_blank<'de, D>(deserializer: D) -> std::result::Result<Option<DifficultyClass>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(label) => DifficultyClass::parse_optional(&label).map_err(serde::de::Error::custom),
    }
}
