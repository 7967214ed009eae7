//! Asset store backed by a static HTTP host.

use async_trait::async_trait;

use crate::store::{looks_like_image, AssetStore};

/// Images served below a base URL. Has no listing capability.
pub struct HttpAssetStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    fn location(&self) -> String {
        self.base_url.clone()
    }

    async fn probe(&self, file_name: &str) -> bool {
        let url = self.url_for(file_name);
        let mut response = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::trace!(%url, status = response.status().as_u16(), "Asset absent");
                return false;
            }
            Err(e) => {
                tracing::trace!(%url, error = %e, "Asset request failed");
                return false;
            }
        };

        // Only the first chunk is needed to recognise the format.
        match response.chunk().await {
            Ok(Some(chunk)) => looks_like_image(&chunk),
            Ok(None) => false,
            Err(e) => {
                tracing::trace!(%url, error = %e, "Asset body unreadable");
                false
            }
        }
    }
}
