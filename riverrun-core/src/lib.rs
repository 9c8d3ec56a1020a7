//! Core library for RiverRun, a personal log of whitewater rivers and paddling trips.
//!
//! The primary entry point is [`RiverStore`], which wraps an on-disk SQLite
//! database. File attachments go through [`AttachmentManager`], and bulk
//! transfer between stores goes through [`export_document`] and
//! [`import_payload`].
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    attachment::{Attachment, AttachmentManager, AttachmentRemoval, NewAttachment},
    delete::{FileRemovalFailure, RiverDeletion, RiverRemoval},
    error::{Result, RiverRunError},
    export::{
        default_export_file_name, export_document, parse_document, read_document, write_export,
        ExportDocument, ImportPayload,
    },
    paths::{migrate_legacy_data, DataLocation, MigrationReport},
    reconcile::{
        import_payload, reconcile_rivers, reconcile_trips, ImportOptions, ImportSummary,
        ReconcileReport, RecordOutcome, RecordResult,
    },
    river::{DifficultyClass, River, RiverData, RiverFilter},
    stats::Statistics,
    storage::Storage,
    store::RiverStore,
    trip_log::{parse_trip_date, TripLog, TripLogData},
};
