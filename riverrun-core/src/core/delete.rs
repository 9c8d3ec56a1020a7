//! Result types for river deletion.
//!
//! Deleting a river is a two-step affair. [`RiverStore::delete_river`] removes
//! the river row, its trip logs and its attachment rows in one transaction and
//! hands back a [`RiverDeletion`] listing the attachment metadata it removed.
//! The physical files are the caller's job; [`AttachmentManager::delete_river`]
//! does both and reports file failures in a [`RiverRemoval`] without rolling
//! the metadata back.
//!
//! [`RiverStore::delete_river`]: crate::RiverStore::delete_river
//! [`AttachmentManager::delete_river`]: crate::AttachmentManager::delete_river

use serde::{Deserialize, Serialize};

use crate::core::attachment::Attachment;

/// What a successful cascade delete removed from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiverDeletion {
    pub river_id: i64,
    pub trip_logs_removed: usize,
    /// Attachment rows that were removed; their files may still be on disk.
    pub attachments: Vec<Attachment>,
}

/// A physical attachment file that could not be deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRemovalFailure {
    pub attachment_id: i64,
    pub file_path: String,
    pub error: String,
}

/// Outcome of deleting a river together with its attachment files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiverRemoval {
    pub deletion: RiverDeletion,
    pub file_failures: Vec<FileRemovalFailure>,
}

impl RiverRemoval {
    /// `true` when every attachment file was removed (or was already gone).
    pub fn is_clean(&self) -> bool {
        self.file_failures.is_empty()
    }
}
