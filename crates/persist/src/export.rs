//! Explicit, user-initiated export.
//!
//! The picker is asked for a destination first. If the curator cancels,
//! nothing is written. If no picker is available (or it fails), the file
//! is "downloaded": written under a timestamped name into the download
//! directory. Export never touches the catalog's dirty flag.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use herbari_core::import::serialize_catalog;
use herbari_core::model::PlantRecord;
use herbari_core::notice::Notice;
use herbari_core::rename::{rename_script, RenameDirective, RENAME_SCRIPT_FILE_NAME};

use crate::error::PersistError;
use crate::handle::{FilePicker, PickerError};

/// Suggested name when the catalog was not opened from a file.
pub const DEFAULT_EXPORT_NAME: &str = "plantes.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Written to the destination the picker returned.
    Written { path: PathBuf },
    /// Written into the download directory.
    Downloaded { path: PathBuf },
    /// The curator dismissed the picker.
    Cancelled,
}

impl ExportOutcome {
    pub fn to_notice(&self) -> Notice {
        match self {
            Self::Written { path } => Notice::success(format!("Exported to {}", path.display())),
            Self::Downloaded { path } => {
                Notice::success(format!("Downloaded {}", path.display()))
            }
            Self::Cancelled => Notice::info("Export cancelled"),
        }
    }
}

/// Download name for a catalog exported at `now`:
/// `plantes-YYYY-MM-DDTHH-MM-SS.json` (UTC).
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use herbari_persist::export::timestamped_file_name;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
/// assert_eq!(timestamped_file_name(at), "plantes-2024-03-09T14-05-30.json");
/// ```
pub fn timestamped_file_name(now: DateTime<Utc>) -> String {
    format!("plantes-{}.json", now.format("%Y-%m-%dT%H-%M-%S"))
}

pub struct Exporter {
    picker: Arc<dyn FilePicker>,
    download_dir: PathBuf,
}

impl Exporter {
    pub fn new(picker: Arc<dyn FilePicker>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            picker,
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Export the catalog. `suggested_name` is the name of the file the
    /// catalog was opened from, if any.
    pub async fn export_catalog(
        &self,
        records: &[PlantRecord],
        suggested_name: Option<&str>,
    ) -> Result<ExportOutcome, PersistError> {
        let payload = serialize_catalog(records)?;
        let suggested = suggested_name.unwrap_or(DEFAULT_EXPORT_NAME);

        match self.picker.pick_save(suggested).await {
            Ok(handle) => match handle.write(&payload).await {
                Ok(()) => {
                    tracing::info!(path = %handle.path().display(), count = records.len(), "Catalog exported");
                    return Ok(ExportOutcome::Written {
                        path: handle.path().to_path_buf(),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Export through picker failed, downloading instead");
                }
            },
            Err(PickerError::Cancelled) => {
                tracing::info!("Export cancelled");
                return Ok(ExportOutcome::Cancelled);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Picker unavailable, downloading instead");
            }
        }

        let path = self
            .download(&timestamped_file_name(Utc::now()), &payload)
            .await?;
        Ok(ExportOutcome::Downloaded { path })
    }

    /// Offer the rename script for re-labelled images as a download.
    /// Returns `None` when there is nothing to rename.
    pub async fn export_rename_script(
        &self,
        directives: &[RenameDirective],
    ) -> Result<Option<PathBuf>, PersistError> {
        let Some(script) = rename_script(directives) else {
            return Ok(None);
        };
        let path = self.download(RENAME_SCRIPT_FILE_NAME, &script).await?;
        tracing::info!(path = %path.display(), renames = directives.len(), "Rename script written");
        Ok(Some(path))
    }

    /// Copy a local file (a newly attached image) into the download
    /// directory as `file_name`, ready to be placed in the asset store.
    pub async fn stage_file(&self, source: &Path, file_name: &str) -> Result<PathBuf, PersistError> {
        self.ensure_download_dir().await?;
        let path = self.download_dir.join(file_name);
        tokio::fs::copy(source, &path)
            .await
            .map_err(|e| PersistError::io(source, e))?;
        Ok(path)
    }

    /// Write `contents` as `file_name` into the download directory.
    pub async fn download(&self, file_name: &str, contents: &str) -> Result<PathBuf, PersistError> {
        self.ensure_download_dir().await?;
        let path = self.download_dir.join(file_name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| PersistError::io(&path, e))?;
        Ok(path)
    }

    async fn ensure_download_dir(&self) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| PersistError::io(&self.download_dir, e))
    }
}
