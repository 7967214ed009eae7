//! The persistence strategy seam and save outcomes.

use std::path::PathBuf;

use async_trait::async_trait;
use herbari_core::environment::Environment;
use herbari_core::notice::Notice;
use serde::Serialize;

use crate::error::PersistError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    HeldFile,
    LegacyEndpoint,
    NoOp,
}

impl StrategyKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::HeldFile => "held file",
            Self::LegacyEndpoint => "legacy endpoint",
            Self::NoOp => "no-op",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one save call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written back to the file opened with write permission.
    HeldFile { path: PathBuf },
    /// Accepted by the legacy write-back endpoint.
    LegacyEndpoint { endpoint: String },
    /// Nothing was written; the curator has to export explicitly.
    Skipped { reason: String },
    /// A terminal strategy failed. In-memory state is unaffected.
    Failed { strategy: StrategyKind, message: String },
}

impl SaveOutcome {
    /// Whether the catalog reached durable storage.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::HeldFile { .. } | Self::LegacyEndpoint { .. })
    }

    pub fn to_notice(&self) -> Notice {
        match self {
            Self::HeldFile { path } => Notice::success(format!("Saved to {}", path.display())),
            Self::LegacyEndpoint { .. } => Notice::success("Saved on the server"),
            Self::Skipped { reason } => Notice::info(reason.clone()),
            Self::Failed { strategy, message } => {
                Notice::error(format!("Save via {strategy} failed: {message}"))
            }
        }
    }
}

/// What a strategy did with a save request.
#[derive(Debug)]
pub enum Attempt {
    Saved(SaveOutcome),
    /// Not available right now; the next strategy should be tried.
    Fallthrough(String),
    /// Failed in a way that ends the chain.
    Failed(PersistError),
}

/// One way of recording the serialized catalog.
#[async_trait]
pub trait PersistStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Cheap, synchronous applicability check. No I/O.
    fn is_applicable(&self, environment: &Environment) -> bool;

    async fn attempt(&self, payload: &str) -> Attempt;
}

/// Last link of every chain: records nothing and says so.
pub struct NoOpStrategy;

pub const EXPORT_REQUIRED: &str =
    "Changes are kept in this session only; export the catalog to keep them";

#[async_trait]
impl PersistStrategy for NoOpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NoOp
    }

    fn is_applicable(&self, _environment: &Environment) -> bool {
        true
    }

    async fn attempt(&self, _payload: &str) -> Attempt {
        Attempt::Saved(SaveOutcome::Skipped {
            reason: EXPORT_REQUIRED.into(),
        })
    }
}
