//! The asset store seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::http::HttpAssetStore;
use crate::local::LocalAssetStore;

/// Read-only image store.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Where the store lives, for log lines.
    fn location(&self) -> String;

    /// Whether `file_name` exists and its leading bytes are a known image
    /// format. Every failure means "not found".
    async fn probe(&self, file_name: &str) -> bool;

    /// All file names in the store, when the store can enumerate itself.
    async fn list(&self) -> Option<Vec<String>> {
        None
    }
}

/// Whether `bytes` start with the signature of a supported image format.
pub fn looks_like_image(bytes: &[u8]) -> bool {
    image::guess_format(bytes).is_ok()
}

/// Open the store at `location`.
///
/// `http://` / `https://` URLs become an [`HttpAssetStore`]; `file://` URLs
/// and plain paths a [`LocalAssetStore`] directory.
pub fn open_store(location: &str, client: reqwest::Client) -> Result<Arc<dyn AssetStore>, ProbeError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(ProbeError::EmptyLocation);
    }

    match location.split_once("://") {
        Some(("http" | "https", _)) => Ok(Arc::new(HttpAssetStore::with_client(client, location))),
        Some(("file", path)) => Ok(Arc::new(LocalAssetStore::new(path))),
        Some((scheme, _)) => Err(ProbeError::UnsupportedScheme(scheme.to_string())),
        None => Ok(Arc::new(LocalAssetStore::new(location))),
    }
}
