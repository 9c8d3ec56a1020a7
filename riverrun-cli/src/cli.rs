//! CLI definitions using clap.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use riverrun_core::DifficultyClass;
use std::path::PathBuf;

/// RiverRun - a personal log of whitewater rivers and paddling trips
#[derive(Parser, Debug)]
#[command(name = "riverrun", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding river_data.db and attachments/
    #[arg(long, global = true, env = "RIVERRUN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Settings file (default: <config dir>/riverrun/settings.json)
    #[arg(long, global = true, env = "RIVERRUN_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no log output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// River profiles
    River {
        #[command(subcommand)]
        command: RiverCommands,
    },

    /// Trip logs
    Trip {
        #[command(subcommand)]
        command: TripCommands,
    },

    /// File attachments
    Attach {
        #[command(subcommand)]
        command: AttachCommands,
    },

    /// Export rivers (and trip logs) to a JSON file
    Export {
        /// Output file (default: ./whitewater_data_YYYYMMDD.json)
        path: Option<PathBuf>,

        #[command(flatten)]
        trips: TripToggle,
    },

    /// Import rivers (and trip logs) from a JSON file, skipping duplicates
    Import {
        path: PathBuf,

        #[command(flatten)]
        trips: TripToggle,
    },

    /// Show paddling statistics
    Stats,

    /// Application settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Show where data is stored
    Location,
}

/// Overrides the `include_trip_logs` setting for one export or import.
#[derive(Args, Debug, Clone, Copy)]
pub struct TripToggle {
    /// Include trip logs regardless of settings
    #[arg(long, conflicts_with = "no_trips")]
    pub with_trips: bool,

    /// Leave trip logs out regardless of settings
    #[arg(long)]
    pub no_trips: bool,
}

impl TripToggle {
    pub fn resolve(self, setting: bool) -> bool {
        if self.with_trips {
            true
        } else if self.no_trips {
            false
        } else {
            setting
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum RiverCommands {
    /// Add a river
    Add {
        name: String,
        location: String,

        #[command(flatten)]
        fields: RiverFields,
    },

    /// List rivers
    List {
        /// Match name, location or difficulty (case-insensitive)
        #[arg(long, short)]
        search: Option<String>,

        /// Only rivers of this class, e.g. "Class III"
        #[arg(long, short)]
        difficulty: Option<DifficultyClass>,
    },

    /// Show one river with its trips and attachments
    Show { id: i64 },

    /// Change fields of a river; unspecified fields keep their value
    Edit {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[command(flatten)]
        fields: RiverFields,
    },

    /// Delete a river with its trip logs and attachments
    Delete { id: i64 },
}

/// Optional river fields shared by `river add` and `river edit`.
#[derive(Args, Debug, Default)]
pub struct RiverFields {
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,
    /// "Class I" through "Class VI"
    #[arg(long)]
    pub difficulty: Option<DifficultyClass>,
    #[arg(long)]
    pub length_miles: Option<f64>,
    /// Typical minimum flow in CFS
    #[arg(long)]
    pub flow_min: Option<i64>,
    /// Typical maximum flow in CFS
    #[arg(long)]
    pub flow_max: Option<i64>,
    #[arg(long)]
    pub put_in: Option<String>,
    #[arg(long)]
    pub take_out: Option<String>,
    #[arg(long)]
    pub shuttle: Option<String>,
    #[arg(long)]
    pub parking: Option<String>,
    #[arg(long)]
    pub seasons: Option<String>,
    #[arg(long)]
    pub gauge: Option<String>,
    #[arg(long)]
    pub hazards: Option<String>,
    #[arg(long)]
    pub portages: Option<String>,
    #[arg(long)]
    pub emergency: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Personal rating, 1-5
    #[arg(long)]
    pub rating: Option<u8>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TripCommands {
    /// Log a trip
    Add {
        river_id: i64,

        /// Trip date, YYYY-MM-DD
        date: NaiveDate,

        #[command(flatten)]
        fields: TripFields,
    },

    /// List trips, newest first
    List {
        /// Only trips on this river
        #[arg(long)]
        river: Option<i64>,
    },

    /// Change fields of a trip log; unspecified fields keep their value
    Edit {
        id: i64,

        /// Move the trip to another river
        #[arg(long)]
        river: Option<i64>,

        /// Trip date, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        fields: TripFields,
    },

    /// Delete a trip log
    Delete { id: i64 },
}

/// Optional trip fields shared by `trip add` and `trip edit`.
#[derive(Args, Debug, Default)]
pub struct TripFields {
    #[arg(long)]
    pub companions: Option<String>,
    #[arg(long)]
    pub water_level: Option<String>,
    #[arg(long)]
    pub weather: Option<String>,
    /// Flow in CFS
    #[arg(long)]
    pub flow: Option<i64>,
    #[arg(long)]
    pub hours: Option<f64>,
    #[arg(long)]
    pub difficulty: Option<String>,
    #[arg(long)]
    pub highlights: Option<String>,
    #[arg(long)]
    pub challenges: Option<String>,
    #[arg(long)]
    pub gear: Option<String>,
    /// Trip rating, 1-5
    #[arg(long)]
    pub rating: Option<u8>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AttachCommands {
    /// Copy a file into the attachment store for a river
    Add {
        river_id: i64,
        file: PathBuf,

        #[arg(long, short, default_value = "")]
        description: String,
    },

    /// List a river's attachments
    List { river_id: i64 },

    /// Change an attachment's description
    Describe { id: i64, description: String },

    /// Delete an attachment and its file
    Remove { id: i64 },

    /// Open an attachment with the system viewer
    Open { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print current settings
    Show,

    /// Change a setting: theme, include-trip-logs or data-directory
    Set { key: String, value: String },
}
