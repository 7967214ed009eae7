//! Existence probing of candidate image names.
//!
//! For a slug, every `category x index x extension` combination is a
//! candidate. All candidates are probed concurrently, each bounded by its
//! own timeout, and the batch is joined with no early exit. Results are
//! reported in candidate order, so two runs against an unchanged store
//! return the same list.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use herbari_core::environment::Environment;
use herbari_core::images::{DiscoveredAsset, EditBuffer};
use herbari_core::model::{ImageCategory, ImageRef};
use herbari_core::naming::{self, IMAGE_EXTENSIONS};

use crate::store::AssetStore;

/// Indices probed per category unless configured otherwise.
pub const DEFAULT_MAX_INDEX: usize = 20;

/// Per-probe timeout unless configured otherwise.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Indices `0..max_index` are probed.
    pub max_index: usize,
    pub extensions: Vec<String>,
    pub timeout: Duration,
    /// Categories in probe order.
    pub categories: Vec<ImageCategory>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_index: DEFAULT_MAX_INDEX,
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            categories: ImageCategory::PROBE_ORDER.to_vec(),
        }
    }
}

impl ProbeConfig {
    /// Number of candidates generated per slug.
    pub fn candidate_count(&self) -> usize {
        self.categories.len() * self.max_index * self.extensions.len()
    }
}

/// How a [`Discovery`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMethod {
    /// Every candidate was probed.
    Probed,
    /// The store listed its contents; only listed candidates were probed.
    Listed,
    /// Nothing was probed (empty slug or environment not worth probing).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Confirmed assets in candidate order.
    pub found: Vec<DiscoveredAsset>,
    /// Probes actually issued.
    pub probed: usize,
    pub method: DiscoveryMethod,
}

impl Discovery {
    fn skipped() -> Self {
        Self {
            found: Vec::new(),
            probed: 0,
            method: DiscoveryMethod::Skipped,
        }
    }
}

// ---------------------------------------------------------------------------
// Prober
// ---------------------------------------------------------------------------

pub struct AssetProber {
    store: Arc<dyn AssetStore>,
    config: ProbeConfig,
}

impl AssetProber {
    pub fn new(store: Arc<dyn AssetStore>, config: ProbeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    /// Every candidate name for `slug`, in probe order.
    pub fn candidates(&self, slug: &str) -> Vec<DiscoveredAsset> {
        let mut out = Vec::with_capacity(self.config.candidate_count());
        for &category in &self.config.categories {
            for index in 0..self.config.max_index {
                for ext in &self.config.extensions {
                    out.push(DiscoveredAsset {
                        category,
                        file_name: naming::image_file_name(slug, index, category, ext),
                    });
                }
            }
        }
        out
    }

    /// Find which candidates for `slug` exist in the store.
    ///
    /// Individual probe failures and timeouts count as "not found"; this
    /// never fails. A listing that does not arrive within the probe timeout
    /// is ignored and every candidate is probed.
    pub async fn discover(&self, slug: &str) -> Discovery {
        if slug.is_empty() {
            return Discovery::skipped();
        }

        let started = Instant::now();
        let mut candidates = self.candidates(slug);
        let listing = match tokio::time::timeout(self.config.timeout, self.store.list()).await {
            Ok(listing) => listing,
            Err(_) => {
                tracing::warn!(store = %self.store.location(), "Asset listing timed out, probing instead");
                None
            }
        };
        let method = match listing {
            Some(listing) => {
                let listed: HashSet<String> = listing.into_iter().collect();
                candidates.retain(|c| listed.contains(&c.file_name));
                DiscoveryMethod::Listed
            }
            None => DiscoveryMethod::Probed,
        };

        let probes = candidates.iter().map(|candidate| {
            let store = Arc::clone(&self.store);
            let timeout = self.config.timeout;
            async move {
                tokio::time::timeout(timeout, store.probe(&candidate.file_name))
                    .await
                    .unwrap_or(false)
            }
        });
        let results = join_all(probes).await;

        let probed = candidates.len();
        let found: Vec<DiscoveredAsset> = candidates
            .into_iter()
            .zip(results)
            .filter_map(|(candidate, exists)| exists.then_some(candidate))
            .collect();

        tracing::info!(
            slug,
            store = %self.store.location(),
            ?method,
            probed,
            found = found.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Asset discovery finished"
        );

        Discovery {
            found,
            probed,
            method,
        }
    }

    /// Rebuild the server-resident part of `buffer` for `slug`.
    ///
    /// Server-resident entries are dropped and pending ones kept. When the
    /// environment makes probing worthwhile, discovered assets are added and
    /// the categories stored on the record (`known`) are re-applied.
    /// Otherwise the record's own image list is taken as is.
    pub async fn refresh(
        &self,
        environment: &Environment,
        buffer: &mut EditBuffer,
        slug: &str,
        known: &[ImageRef],
    ) -> Discovery {
        buffer.retain_pending();
        if !environment.probing_worthwhile() {
            tracing::debug!(mode = %environment.mode, "Skipping asset discovery");
            buffer.absorb_discovered(known.iter().map(|image| DiscoveredAsset {
                category: image.category,
                file_name: image.file_name.clone(),
            }));
            return Discovery::skipped();
        }

        let discovery = self.discover(slug).await;
        buffer.absorb_discovered(discovery.found.iter().cloned());
        buffer.apply_known_categories(known);
        discovery
    }
}
