//! Application settings persistence for RiverRun.
//!
//! Stores user preferences in a JSON file at an OS-appropriate location.
//! The core library never reads this file; the shell passes the relevant
//! values in explicitly.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Nature,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Nature => "nature",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nature" | "light" => Ok(Theme::Nature),
            "dark" => Ok(Theme::Dark),
            other => bail!("Unknown theme '{other}' (expected 'nature' or 'dark')"),
        }
    }
}

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub theme: Theme,
    /// Whether export and import carry trip logs.
    pub include_trip_logs: bool,
    /// Overrides the platform data directory when set.
    pub data_directory: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Nature,
            include_trip_logs: true,
            data_directory: None,
        }
    }
}

impl AppSettings {
    /// Applies `key = value` from the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "theme" => self.theme = value.parse()?,
            "include-trip-logs" | "include_trip_logs" => {
                self.include_trip_logs = parse_bool(value)?;
            }
            "data-directory" | "data_directory" => {
                let value = value.trim();
                self.data_directory = (!value.is_empty()).then(|| value.to_string());
            }
            other => bail!(
                "Unknown setting '{other}' (expected theme, include-trip-logs or data-directory)"
            ),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => bail!("Expected true or false, got '{other}'"),
    }
}

/// Returns the default path of the settings JSON file:
/// `<config_dir>/riverrun/settings.json`.
pub fn settings_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("riverrun")
        .join("settings.json")
}

/// Loads settings from disk; returns defaults if the file is missing or corrupt.
pub fn load_settings(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable settings file {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings to disk, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create settings directory")?;
    }
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, json).context("Failed to write settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(&dir.path().join("settings.json"));
        assert_eq!(settings, AppSettings::default());
        assert!(settings.include_trip_logs);
        assert_eq!(settings.theme, Theme::Nature);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path), AppSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = AppSettings::default();
        settings.set("theme", "dark").unwrap();
        settings.set("include-trip-logs", "no").unwrap();
        settings.set("data-directory", "/srv/rivers").unwrap();

        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(&path);

        assert_eq!(loaded.theme, Theme::Dark);
        assert!(!loaded.include_trip_logs);
        assert_eq!(loaded.data_directory.as_deref(), Some("/srv/rivers"));
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.theme, Theme::Dark);
        assert!(settings.include_trip_logs);
    }

    #[test]
    fn test_set_rejects_unknown_values() {
        let mut settings = AppSettings::default();
        assert!(settings.set("theme", "neon").is_err());
        assert!(settings.set("include-trip-logs", "maybe").is_err());
        assert!(settings.set("font-size", "12").is_err());
        settings.set("data-directory", "  ").unwrap();
        assert_eq!(settings.data_directory, None);
    }
}
