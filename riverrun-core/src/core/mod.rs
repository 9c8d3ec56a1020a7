//! Internal domain modules for the RiverRun core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod attachment;
pub mod delete;
pub mod error;
pub mod export;
pub mod paths;
pub mod reconcile;
pub mod river;
pub mod stats;
pub mod storage;
pub mod store;
pub(crate) mod timestamp;
pub mod trip_log;

#[doc(inline)]
pub use attachment::{Attachment, AttachmentManager, AttachmentRemoval, NewAttachment};
#[doc(inline)]
pub use delete::{FileRemovalFailure, RiverDeletion, RiverRemoval};
#[doc(inline)]
pub use error::{Result, RiverRunError};
#[doc(inline)]
pub use export::{
    default_export_file_name, export_document, parse_document, read_document, write_export,
    ExportDocument, ImportPayload,
};
#[doc(inline)]
pub use paths::{migrate_legacy_data, DataLocation, MigrationReport};
#[doc(inline)]
pub use reconcile::{
    import_payload, reconcile_rivers, reconcile_trips, ImportOptions, ImportSummary,
    ReconcileReport, RecordOutcome, RecordResult,
};
#[doc(inline)]
pub use river::{DifficultyClass, River, RiverData, RiverFilter};
#[doc(inline)]
pub use stats::Statistics;
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use store::RiverStore;
#[doc(inline)]
pub use trip_log::{parse_trip_date, TripLog, TripLogData};
