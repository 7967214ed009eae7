//! Asset store backed by a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::store::{looks_like_image, AssetStore};

/// Bytes read from the head of a file to recognise its format.
const SNIFF_LEN: usize = 64;

/// Images in a directory on disk. Supports listing.
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_head(&self, file_name: &str) -> std::io::Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(self.root.join(file_name)).await?;
        let mut head = vec![0u8; SNIFF_LEN];
        let mut filled = 0;
        while filled < SNIFF_LEN {
            let n = file.read(&mut head[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        head.truncate(filled);
        Ok(head)
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn probe(&self, file_name: &str) -> bool {
        match self.read_head(file_name).await {
            Ok(head) => looks_like_image(&head),
            Err(_) => false,
        }
    }

    async fn list(&self) -> Option<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(root = %self.root.display(), error = %e, "Asset directory not listable");
                return None;
            }
        };

        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(root = %self.root.display(), error = %e, "Asset directory listing interrupted");
                    return None;
                }
            }
        }
        Some(names)
    }
}
