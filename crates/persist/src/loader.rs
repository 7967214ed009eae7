//! Initial catalog load.
//!
//! The catalog is fetched from a URL (when served over HTTP) or read from
//! disk. A missing or unreadable catalog is not an error: the session
//! starts empty and the curator is told why.

use std::path::PathBuf;

use herbari_core::import::parse_catalog;
use herbari_core::model::PlantRecord;
use herbari_core::notice::Notice;

use crate::error::PersistError;

/// Default catalog location, relative to the origin or the working
/// directory.
pub const DEFAULT_CATALOG_PATH: &str = "dades/plantes.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    Remote(String),
    Local(PathBuf),
}

impl CatalogLocation {
    /// `http(s)://` URLs are remote; `file://` URLs and plain paths local.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Remote(location.to_string())
        } else if let Some(path) = location.strip_prefix("file://") {
            Self::Local(PathBuf::from(path))
        } else {
            Self::Local(PathBuf::from(location))
        }
    }

    /// Last path segment, remembered as the suggested export name.
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Remote(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').next())
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            Self::Local(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string),
        }
    }
}

impl std::fmt::Display for CatalogLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Records plus the message to show after loading.
#[derive(Debug, Clone)]
pub struct CatalogLoad {
    pub records: Vec<PlantRecord>,
    pub notice: Notice,
}

enum FetchError {
    Missing,
    Unreadable(PersistError),
}

/// Load the catalog at `location`. Never fails.
pub async fn load_catalog(client: &reqwest::Client, location: &CatalogLocation) -> CatalogLoad {
    let bytes = match fetch(client, location).await {
        Ok(bytes) => bytes,
        Err(FetchError::Missing) => {
            tracing::info!(%location, "No catalog found, starting empty");
            return CatalogLoad {
                records: Vec::new(),
                notice: Notice::info(format!("No catalog at {location}; starting with an empty one")),
            };
        }
        Err(FetchError::Unreadable(e)) => {
            tracing::warn!(%location, error = %e, "Catalog could not be read");
            return CatalogLoad {
                records: Vec::new(),
                notice: Notice::warning(format!("Could not read the catalog at {location}: {e}")),
            };
        }
    };

    match parse_catalog(&bytes) {
        Ok(records) => {
            tracing::info!(%location, count = records.len(), "Catalog loaded");
            let notice = Notice::success(format!("Loaded {} plants", records.len()));
            CatalogLoad { records, notice }
        }
        Err(e) => {
            tracing::warn!(%location, error = %e, "Catalog has an unrecognised format");
            CatalogLoad {
                records: Vec::new(),
                notice: Notice::error(format!("The catalog at {location} could not be imported: {e}")),
            }
        }
    }
}

async fn fetch(client: &reqwest::Client, location: &CatalogLocation) -> Result<Vec<u8>, FetchError> {
    match location {
        CatalogLocation::Remote(url) => {
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Unreadable(e.into()))?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::Missing);
            }
            if !status.is_success() {
                return Err(FetchError::Unreadable(PersistError::Status {
                    status: status.as_u16(),
                    body: String::new(),
                }));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| FetchError::Unreadable(e.into()))?;
            Ok(bytes.to_vec())
        }
        CatalogLocation::Local(path) => match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::Missing),
            Err(e) => Err(FetchError::Unreadable(PersistError::io(path, e))),
        },
    }
}
