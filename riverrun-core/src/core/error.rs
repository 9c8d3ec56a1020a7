//! Error types for the RiverRun core library.

use thiserror::Error;

/// All errors that can occur within the RiverRun core library.
#[derive(Debug, Error)]
pub enum RiverRunError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The opened file is not a usable RiverRun store.
    #[error("Invalid store: {0}")]
    InvalidStore(String),

    /// A river ID was requested that does not exist in the database.
    #[error("River not found: {0}")]
    RiverNotFound(i64),

    /// A trip log ID was requested that does not exist in the database.
    #[error("Trip log not found: {0}")]
    TripLogNotFound(i64),

    /// An attachment ID was requested that does not exist in the database.
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(i64),

    /// A write payload broke a field constraint (empty name, rating out of range, ...).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// An interchange document does not have the expected shape.
    #[error("Invalid import format: {0}")]
    InvalidFormat(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be serialized to JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`RiverRunError`].
pub type Result<T> = std::result::Result<T, RiverRunError>;

impl RiverRunError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::InvalidStore(_) => "Could not open the river database".to_string(),
            Self::RiverNotFound(id) => format!("River {id} does not exist"),
            Self::TripLogNotFound(id) => format!("Trip log {id} does not exist"),
            Self::AttachmentNotFound(id) => format!("Attachment {id} does not exist"),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::InvalidFormat(_) => {
                "The selected file does not contain valid River Runner data".to_string()
            }
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }

    /// Returns `true` for the not-found family of errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RiverNotFound(_) | Self::TripLogNotFound(_) | Self::AttachmentNotFound(_)
        )
    }
}
