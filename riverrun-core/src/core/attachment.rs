//! File attachments: the managed content directory and its metadata rows.
//!
//! An attachment is a file copied into the content directory plus a
//! `river_documents` row pointing at it. The row is the authoritative record;
//! the directory is never scanned to rebuild state.

use crate::core::delete::{FileRemovalFailure, RiverRemoval};
use crate::core::timestamp;
use crate::{Result, RiverRunError, RiverStore};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Prefix format for copied files: `<YYYYMMDD_HHMMSS>_<original-file-name>`.
const INGEST_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Metadata row for a file attached to a river.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub river_id: i64,
    /// Base name of the file as it was picked by the user.
    pub file_name: String,
    /// Location of the managed copy inside the content directory.
    pub file_path: String,
    /// Lower-cased extension including the dot (`".pdf"`), empty if none.
    pub file_type: String,
    pub file_size: i64,
    pub description: String,
    pub upload_date: DateTime<Utc>,
}

/// Payload for registering attachment metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub river_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub description: String,
}

/// Outcome of [`AttachmentManager::remove`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRemoval {
    pub attachment: Attachment,
    /// Set when the metadata row was removed but the file could not be.
    pub warning: Option<String>,
}

/// Copies files into the content directory and keeps their metadata in sync.
#[derive(Debug, Clone)]
pub struct AttachmentManager {
    store: RiverStore,
    content_dir: PathBuf,
}

impl AttachmentManager {
    pub fn new(store: RiverStore, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            content_dir: content_dir.into(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn store(&self) -> &RiverStore {
        &self.store
    }

    /// Copies `source` into the content directory and registers it against `river_id`.
    ///
    /// All or nothing: if the copy fails no row is written, and if the row
    /// cannot be written the copy is deleted again. An empty `description`
    /// defaults to the file's stem.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::RiverNotFound`] for an unknown river,
    /// [`RiverRunError::Io`] if the source is missing or the copy fails, or
    /// [`RiverRunError::Database`] if the metadata row cannot be written.
    pub fn attach(&self, river_id: i64, source: &Path, description: &str) -> Result<Attachment> {
        self.store.get_river(river_id)?;

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RiverRunError::Io(io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("'{}' does not name a file", source.display()),
                ))
            })?;
        let file_type = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        let file_size = i64::try_from(fs::metadata(source)?.len()).unwrap_or(i64::MAX);

        fs::create_dir_all(&self.content_dir)?;
        let stamp = Local::now().format(INGEST_STAMP_FORMAT).to_string();
        let (dest_path, dest) = claim_destination(&self.content_dir, &stamp, &file_name)?;

        if let Err(e) = copy_into(source, dest) {
            discard(&dest_path);
            return Err(e.into());
        }

        let description = if description.trim().is_empty() {
            source
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&file_name)
                .to_string()
        } else {
            description.to_string()
        };

        let new = NewAttachment {
            river_id,
            file_name,
            file_path: dest_path.to_string_lossy().into_owned(),
            file_type,
            file_size,
            description,
        };
        let id = match self.store.add_attachment(&new) {
            Ok(id) => id,
            Err(e) => {
                discard(&dest_path);
                return Err(e);
            }
        };
        log::debug!("Attached {} to river {river_id} as {}", new.file_name, new.file_path);
        self.store.get_attachment(id)
    }

    /// Deletes the metadata row, then the file.
    ///
    /// The row goes first because it is the record of whether the attachment
    /// exists. If the file cannot be deleted the row stays deleted and the
    /// failure is returned as a warning. A file that is already gone counts
    /// as removed.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::AttachmentNotFound`] for an unknown id or
    /// [`RiverRunError::Database`] if the row cannot be deleted.
    pub fn remove(&self, attachment_id: i64) -> Result<AttachmentRemoval> {
        let attachment = self
            .store
            .delete_attachment(attachment_id)?
            .ok_or(RiverRunError::AttachmentNotFound(attachment_id))?;

        let warning = remove_file(&attachment.file_path).err().map(|e| {
            log::warn!(
                "Attachment {} removed but file {} could not be deleted: {e}",
                attachment.id,
                attachment.file_path
            );
            format!("Could not delete {}: {e}", attachment.file_path)
        });

        Ok(AttachmentRemoval { attachment, warning })
    }

    /// Deletes a river with its trip logs and attachments, then removes the
    /// attachment files.
    ///
    /// Returns `Ok(None)` if the river does not exist. File removal failures
    /// are collected in the result; the database delete is not rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::Database`] if the cascade delete fails, in
    /// which case no files are touched.
    pub fn delete_river(&self, river_id: i64) -> Result<Option<RiverRemoval>> {
        let Some(deletion) = self.store.delete_river(river_id)? else {
            return Ok(None);
        };

        let file_failures: Vec<FileRemovalFailure> = deletion
            .attachments
            .iter()
            .filter_map(|a| {
                remove_file(&a.file_path).err().map(|e| {
                    log::warn!("Could not delete attachment file {}: {e}", a.file_path);
                    FileRemovalFailure {
                        attachment_id: a.id,
                        file_path: a.file_path.clone(),
                        error: e.to_string(),
                    }
                })
            })
            .collect();

        Ok(Some(RiverRemoval { deletion, file_failures }))
    }

    /// Hands the attachment's file to the platform's default opener.
    ///
    /// This is a convenience for the presentation layer; it neither reads nor
    /// changes the store beyond looking the attachment up.
    ///
    /// # Errors
    ///
    /// Returns [`RiverRunError::AttachmentNotFound`] for an unknown id, or
    /// [`RiverRunError::Io`] if the file is missing or no opener could be launched.
    pub fn open(&self, attachment_id: i64) -> Result<()> {
        let attachment = self.store.get_attachment(attachment_id)?;
        let path = Path::new(&attachment.file_path);
        if !path.exists() {
            return Err(RiverRunError::Io(io::Error::new(
                ErrorKind::NotFound,
                format!("File not found: {}", attachment.file_path),
            )));
        }
        open::that(path)?;
        Ok(())
    }
}

/// Creates the destination file exclusively so two ingests can never share a name.
///
/// The first choice is `<stamp>_<file_name>`; if that is taken (same name
/// within the same second) the stem gets a `-2`, `-3`, … suffix.
/// How many `-N` suffixes are tried before an ingest gives up.
const MAX_NAME_ATTEMPTS: u32 = 100;

fn claim_destination(dir: &Path, stamp: &str, file_name: &str) -> io::Result<(PathBuf, File)> {
    let original = Path::new(file_name);
    let stem = original.file_stem().and_then(|s| s.to_str()).unwrap_or(file_name);
    let ext = original.extension().and_then(|e| e.to_str());

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let candidate = match (attempt, ext) {
            (1, _) => format!("{stamp}_{file_name}"),
            (n, Some(ext)) => format!("{stamp}_{stem}-{n}.{ext}"),
            (n, None) => format!("{stamp}_{stem}-{n}"),
        };
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(ErrorKind::AlreadyExists, "no free attachment name"))
}

fn copy_into(source: &Path, mut dest: File) -> io::Result<()> {
    let mut src = File::open(source)?;
    io::copy(&mut src, &mut dest)?;
    dest.sync_all()
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Could not clean up partial copy {}: {e}", path.display());
    }
}

fn remove_file(path: &str) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

pub(crate) fn map_attachment_row(row: &rusqlite::Row) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        river_id: row.get(1)?,
        file_name: row.get(2)?,
        file_path: row.get(3)?,
        file_type: row.get(4)?,
        file_size: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        description: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        upload_date: timestamp::column(row, 7)?,
    })
}
