use std::path::PathBuf;

use herbari_core::import::FormatError;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-2xx status code.
    #[error("Endpoint error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The endpoint answered but did not report success.
    #[error("Endpoint did not confirm the save{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    NotConfirmed { message: Option<String> },
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
