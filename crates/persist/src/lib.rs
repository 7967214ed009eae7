//! Durable storage for the catalog.
//!
//! [`resolver::PersistenceResolver`] walks an ordered chain of
//! [`strategy::PersistStrategy`] implementations and reports which one
//! recorded the catalog. [`export::Exporter`] covers the explicit,
//! user-initiated export and [`loader`] the initial fetch.

pub mod error;
pub mod export;
pub mod handle;
pub mod legacy;
pub mod loader;
pub mod resolver;
pub mod strategy;

pub use error::PersistError;
pub use export::{ExportOutcome, Exporter};
pub use handle::{FileHandle, FilePicker, HandleSlot, PickerError};
pub use resolver::PersistenceResolver;
pub use strategy::{SaveOutcome, StrategyKind};
