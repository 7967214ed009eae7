use herbari_assets::ProbeError;
use herbari_core::error::CoreError;
use herbari_core::import::FormatError;
use herbari_persist::{PersistError, PickerError};

/// Errors surfaced by [`EditorSession`](crate::session::EditorSession).
///
/// None of them end the session; in-memory state is kept.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Picker(#[from] PickerError),

    #[error("No plant is being edited")]
    NotEditing,

    #[error("Native file access is not available in this environment")]
    NativeFilesUnavailable,
}
