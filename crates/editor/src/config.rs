//! Deployment configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use herbari_assets::prober::{DEFAULT_MAX_INDEX, DEFAULT_PROBE_TIMEOUT};
use herbari_assets::ProbeConfig;
use herbari_core::environment::{Environment, EnvironmentProbe, DEFAULT_STATIC_SUFFIXES};
use herbari_persist::legacy::DEFAULT_LEGACY_ENDPOINT;
use herbari_persist::loader::DEFAULT_CATALOG_PATH;
use reqwest::Url;

/// Default image directory, relative to the origin or working directory.
pub const DEFAULT_ASSETS_PATH: &str = "assets/imatges";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got `{value}`")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Origin the catalog is served from, as given.
    pub origin: Option<String>,
    /// Catalog location, resolved against the origin.
    pub catalog: String,
    /// Image store location, resolved against the origin.
    pub assets: String,
    /// Absolute legacy endpoint URL. Only set for `http(s)` origins.
    pub legacy_endpoint: Option<String>,
    pub static_suffixes: Vec<String>,
    pub native_file_access: bool,
    pub probe_timeout: Duration,
    pub probe_max_index: usize,
    /// Where downloads (exports, rename scripts, staged images) are written.
    pub download_dir: PathBuf,
}

impl EditorConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `HERBARI_ORIGIN`           | unset                    |
    /// | `HERBARI_CATALOG`          | `dades/plantes.json`     |
    /// | `HERBARI_ASSETS`           | `assets/imatges`         |
    /// | `HERBARI_LEGACY_ENDPOINT`  | `save_json.php`          |
    /// | `HERBARI_STATIC_SUFFIXES`  | `github.io`              |
    /// | `HERBARI_NATIVE_FILES`     | `true`                   |
    /// | `HERBARI_PROBE_TIMEOUT_MS` | `1000`                   |
    /// | `HERBARI_PROBE_MAX_INDEX`  | `20`                     |
    /// | `HERBARI_DOWNLOAD_DIR`     | user download dir or `.` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let origin = var("HERBARI_ORIGIN");
        let base = origin.as_deref().and_then(|o| Url::parse(o).ok());

        let catalog = resolve(
            base.as_ref(),
            &var("HERBARI_CATALOG").unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string()),
        );
        let assets = resolve(
            base.as_ref(),
            &var("HERBARI_ASSETS").unwrap_or_else(|| DEFAULT_ASSETS_PATH.to_string()),
        );
        let legacy_endpoint = base
            .as_ref()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .and_then(|url| {
                let endpoint =
                    var("HERBARI_LEGACY_ENDPOINT").unwrap_or_else(|| DEFAULT_LEGACY_ENDPOINT.to_string());
                url.join(&endpoint).ok()
            })
            .map(String::from);

        let static_suffixes = match var("HERBARI_STATIC_SUFFIXES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_STATIC_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        };

        let native_file_access = match var("HERBARI_NATIVE_FILES") {
            Some(value) => parse_bool("HERBARI_NATIVE_FILES", &value)?,
            None => true,
        };

        let probe_timeout = match var("HERBARI_PROBE_TIMEOUT_MS") {
            Some(value) => Duration::from_millis(parse_number("HERBARI_PROBE_TIMEOUT_MS", &value)?),
            None => DEFAULT_PROBE_TIMEOUT,
        };
        let probe_max_index = match var("HERBARI_PROBE_MAX_INDEX") {
            Some(value) => parse_number("HERBARI_PROBE_MAX_INDEX", &value)? as usize,
            None => DEFAULT_MAX_INDEX,
        };

        let download_dir = var("HERBARI_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            origin,
            catalog,
            assets,
            legacy_endpoint,
            static_suffixes,
            native_file_access,
            probe_timeout,
            probe_max_index,
            download_dir,
        })
    }

    /// Classify the hosting environment described by this configuration.
    pub fn environment(&self) -> Environment {
        Environment::classify(EnvironmentProbe {
            origin: self.origin.as_deref(),
            static_suffixes: &self.static_suffixes,
            native_file_access: self.native_file_access,
        })
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            max_index: self.probe_max_index,
            timeout: self.probe_timeout,
            ..ProbeConfig::default()
        }
    }
}

/// Resolve `location` against the origin URL when there is one.
fn resolve(base: Option<&Url>, location: &str) -> String {
    match base.and_then(|url| url.join(location).ok()) {
        Some(url) => url.into(),
        None => location.to_string(),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            expected: "a boolean",
            value: value.to_string(),
        }),
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        expected: "a non-negative integer",
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use herbari_core::environment::HostingMode;

    fn config(vars: &[(&str, &str)]) -> Result<EditorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EditorConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_origin() {
        let config = config(&[("HERBARI_DOWNLOAD_DIR", "/tmp/baixades")]).unwrap();

        assert_eq!(config.catalog, "dades/plantes.json");
        assert_eq!(config.assets, "assets/imatges");
        assert_eq!(config.legacy_endpoint, None);
        assert_eq!(config.static_suffixes, ["github.io"]);
        assert!(config.native_file_access);
        assert_eq!(config.probe_timeout, Duration::from_secs(1));
        assert_eq!(config.probe_max_index, 20);
        assert_eq!(config.download_dir, PathBuf::from("/tmp/baixades"));
        assert_eq!(config.environment(), Environment::conservative());
    }

    #[test]
    fn http_origin_resolves_locations_and_endpoint() {
        let config = config(&[("HERBARI_ORIGIN", "http://localhost:8000/")]).unwrap();

        assert_eq!(config.catalog, "http://localhost:8000/dades/plantes.json");
        assert_eq!(config.assets, "http://localhost:8000/assets/imatges");
        assert_eq!(
            config.legacy_endpoint.as_deref(),
            Some("http://localhost:8000/save_json.php")
        );
        assert_eq!(config.environment().mode, HostingMode::LocalServer);
    }

    #[test]
    fn file_origin_resolves_next_to_the_page() {
        let config = config(&[("HERBARI_ORIGIN", "file:///srv/herbari/index.html")]).unwrap();

        assert_eq!(config.catalog, "file:///srv/herbari/dades/plantes.json");
        assert_eq!(config.legacy_endpoint, None);
        assert_eq!(config.environment().mode, HostingMode::FileProtocol);
    }

    #[test]
    fn custom_static_suffixes() {
        let config = config(&[
            ("HERBARI_ORIGIN", "https://herbari.pages.example.org/"),
            ("HERBARI_STATIC_SUFFIXES", "pages.example.org, github.io"),
        ])
        .unwrap();

        assert_eq!(config.static_suffixes, ["pages.example.org", "github.io"]);
        assert_eq!(config.environment().mode, HostingMode::StaticPages);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_matches!(
            config(&[("HERBARI_NATIVE_FILES", "potser")]),
            Err(ConfigError::Invalid { var: "HERBARI_NATIVE_FILES", .. })
        );
        assert_matches!(
            config(&[("HERBARI_PROBE_TIMEOUT_MS", "-5")]),
            Err(ConfigError::Invalid { var: "HERBARI_PROBE_TIMEOUT_MS", .. })
        );
    }

    #[test]
    fn probe_settings_flow_into_probe_config() {
        let config = config(&[
            ("HERBARI_PROBE_TIMEOUT_MS", "250"),
            ("HERBARI_PROBE_MAX_INDEX", "4"),
        ])
        .unwrap();

        let probe = config.probe_config();
        assert_eq!(probe.timeout, Duration::from_millis(250));
        assert_eq!(probe.candidate_count(), 6 * 4 * 2);
    }
}
