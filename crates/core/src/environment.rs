//! Hosting environment classification.
//!
//! [`Environment::classify`] inspects the origin the catalog is served
//! from and reports which persistence capabilities are worth trying. It is
//! synchronous and makes no remote calls; anything it cannot recognise
//! falls back to [`Environment::conservative`].

use serde::Serialize;

/// Host suffix recognised as static pages hosting when no override is
/// configured.
pub const DEFAULT_STATIC_SUFFIXES: &[&str] = &["github.io"];

/// Hosts treated as a local development server.
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Descriptive hosting mode behind the capability facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostingMode {
    /// Static pages host: the origin never accepts writes.
    StaticPages,
    /// Local development server, possibly with a legacy write-back endpoint.
    LocalServer,
    /// Opened straight from disk (`file:`), no HTTP back-channel.
    FileProtocol,
    Unknown,
}

impl HostingMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::StaticPages => "static pages hosting",
            Self::LocalServer => "local server",
            Self::FileProtocol => "file protocol",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HostingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs to classification.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentProbe<'a> {
    /// Origin URL the catalog is served from, e.g. `http://localhost:8000`.
    pub origin: Option<&'a str>,
    /// Host suffixes that denote static pages hosting.
    pub static_suffixes: &'a [String],
    /// Whether the runtime can hand out read/write handles to user-chosen
    /// files.
    pub native_file_access: bool,
}

/// Capability descriptor, computed once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub mode: HostingMode,
    /// No write-back to the serving origin is possible.
    pub static_hosting: bool,
    /// A legacy write-back endpoint may exist and is worth probing.
    pub local_context: bool,
    /// Native file handles can be requested.
    pub native_file_access: bool,
}

impl Environment {
    /// Static hosting, no local context, no native file access.
    pub const fn conservative() -> Self {
        Self {
            mode: HostingMode::Unknown,
            static_hosting: true,
            local_context: false,
            native_file_access: false,
        }
    }

    pub fn classify(probe: EnvironmentProbe<'_>) -> Self {
        let mode = probe
            .origin
            .map(|origin| hosting_mode(origin, probe.static_suffixes))
            .unwrap_or(HostingMode::Unknown);

        match mode {
            HostingMode::Unknown => Self::conservative(),
            HostingMode::LocalServer => Self {
                mode,
                static_hosting: false,
                local_context: true,
                native_file_access: probe.native_file_access,
            },
            HostingMode::StaticPages | HostingMode::FileProtocol => Self {
                mode,
                static_hosting: true,
                local_context: false,
                native_file_access: probe.native_file_access,
            },
        }
    }

    /// The legacy write-back endpoint is only worth trying on a local,
    /// non-static origin.
    pub fn legacy_endpoint_eligible(&self) -> bool {
        !self.static_hosting && self.local_context
    }

    /// Whether probing the asset store for existing images makes sense.
    ///
    /// A static or local origin serves its assets without a listing, so the
    /// prober is the only way to see them. The conservative fallback is
    /// static and probes too.
    pub fn probing_worthwhile(&self) -> bool {
        self.static_hosting || self.local_context
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::conservative()
    }
}

fn hosting_mode(origin: &str, static_suffixes: &[String]) -> HostingMode {
    let Some((scheme, rest)) = origin.trim().split_once(':') else {
        return HostingMode::Unknown;
    };

    match scheme.to_ascii_lowercase().as_str() {
        "file" => HostingMode::FileProtocol,
        "http" | "https" => {
            let Some(host) = rest.strip_prefix("//").and_then(parse_host) else {
                return HostingMode::Unknown;
            };
            if LOCAL_HOSTS.contains(&host.as_str()) {
                HostingMode::LocalServer
            } else if is_static_host(&host, static_suffixes) {
                HostingMode::StaticPages
            } else {
                HostingMode::Unknown
            }
        }
        _ => HostingMode::Unknown,
    }
}

/// Extract the lowercase host from `host[:port][/path]`, unwrapping
/// bracketed IPv6 literals.
fn parse_host(authority_and_path: &str) -> Option<String> {
    let authority = authority_and_path
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or(authority);

    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        bracketed.split(']').next()?
    } else {
        authority.split(':').next()?
    };

    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

fn is_static_host(host: &str, suffixes: &[String]) -> bool {
    let matches = |suffix: &str| {
        let suffix = suffix.trim_start_matches('.').to_ascii_lowercase();
        !suffix.is_empty() && (host == suffix || host.ends_with(&format!(".{suffix}")))
    };

    if suffixes.is_empty() {
        DEFAULT_STATIC_SUFFIXES.iter().any(|s| matches(s))
    } else {
        suffixes.iter().any(|s| matches(s))
    }
}
