//! File handles granted by the explicit "open" action.
//!
//! A [`FileHandle`] is the permission to read and write one user-chosen
//! file. The session keeps at most one in a [`HandleSlot`]; while a handle
//! is held, [`HeldFileStrategy`] writes every save back to that file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use herbari_core::environment::Environment;

use crate::error::PersistError;
use crate::strategy::{Attempt, PersistStrategy, SaveOutcome, StrategyKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, used as the suggested export name.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub async fn read(&self) -> Result<Vec<u8>, PersistError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| PersistError::io(&self.path, e))
    }

    /// Replace the file contents.
    ///
    /// Writes a sibling temporary file and renames it over the target so a
    /// failed write never leaves a truncated catalog behind.
    pub async fn write(&self, contents: &str) -> Result<(), PersistError> {
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| PersistError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(PersistError::io(&self.path, e));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// At most one held handle, shared between the session and the save chain.
#[derive(Debug, Default)]
pub struct HandleSlot {
    inner: Mutex<Option<FileHandle>>,
}

impl HandleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `handle`, replacing any previous one.
    pub fn hold(&self, handle: FileHandle) {
        *self.lock() = Some(handle);
    }

    pub fn release(&self) -> Option<FileHandle> {
        self.lock().take()
    }

    pub fn current(&self) -> Option<FileHandle> {
        self.lock().clone()
    }

    pub fn is_held(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<FileHandle>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writes the catalog back to the held handle.
///
/// A failed write does not fall through to the next strategy: the curator
/// asked for this file explicitly.
pub struct HeldFileStrategy {
    slot: Arc<HandleSlot>,
}

impl HeldFileStrategy {
    pub fn new(slot: Arc<HandleSlot>) -> Self {
        Self { slot }
    }
}

#[async_trait]
impl PersistStrategy for HeldFileStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeldFile
    }

    fn is_applicable(&self, _environment: &Environment) -> bool {
        self.slot.is_held()
    }

    async fn attempt(&self, payload: &str) -> Attempt {
        let Some(handle) = self.slot.current() else {
            return Attempt::Fallthrough("no file handle held".into());
        };
        match handle.write(payload).await {
            Ok(()) => Attempt::Saved(SaveOutcome::HeldFile {
                path: handle.path().to_path_buf(),
            }),
            Err(e) => Attempt::Failed(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Picker
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PickerError {
    #[error("Cancelled by the user")]
    Cancelled,

    #[error("No file picker is available")]
    Unsupported,

    #[error("File picker failed: {0}")]
    Failed(String),
}

/// Source of user-granted file handles.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Ask for an existing file to open with read/write permission.
    async fn pick_open(&self) -> Result<FileHandle, PickerError>;

    /// Ask for a destination to save to, suggesting `suggested_name`.
    async fn pick_save(&self, suggested_name: &str) -> Result<FileHandle, PickerError>;
}

/// Picker for runtimes without native file access.
pub struct UnsupportedPicker;

#[async_trait]
impl FilePicker for UnsupportedPicker {
    async fn pick_open(&self) -> Result<FileHandle, PickerError> {
        Err(PickerError::Unsupported)
    }

    async fn pick_save(&self, _suggested_name: &str) -> Result<FileHandle, PickerError> {
        Err(PickerError::Unsupported)
    }
}

/// Non-interactive picker answering with paths chosen up front
/// (command-line arguments).
///
/// `pick_save` treats an existing directory as the destination folder and
/// joins the suggested name onto it. A side without a path is
/// [`PickerError::Unsupported`].
pub struct FixedPathPicker {
    open: Option<PathBuf>,
    save: Option<PathBuf>,
}

impl FixedPathPicker {
    /// Open from and save to the same path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            open: Some(path.clone()),
            save: Some(path),
        }
    }

    pub fn with_paths(open: Option<PathBuf>, save: Option<PathBuf>) -> Self {
        Self { open, save }
    }
}

#[async_trait]
impl FilePicker for FixedPathPicker {
    async fn pick_open(&self) -> Result<FileHandle, PickerError> {
        let path = self.open.as_ref().ok_or(PickerError::Unsupported)?;
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(FileHandle::new(path)),
            Ok(_) => Err(PickerError::Failed(format!("{} is not a file", path.display()))),
            Err(e) => Err(PickerError::Failed(format!("{}: {e}", path.display()))),
        }
    }

    async fn pick_save(&self, suggested_name: &str) -> Result<FileHandle, PickerError> {
        let path = self.save.as_ref().ok_or(PickerError::Unsupported)?;
        let is_dir = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            Ok(FileHandle::new(path.join(suggested_name)))
        } else {
            Ok(FileHandle::new(path))
        }
    }
}
