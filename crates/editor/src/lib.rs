//! Editing session over the catalog.
//!
//! [`session::EditorSession`] is the explicit context a front end drives:
//! it owns the catalog store, the classified environment, the save chain,
//! the exporter and the asset prober. [`config::EditorConfig`] reads the
//! deployment settings from the environment.

pub mod config;
pub mod error;
pub mod session;

pub use config::EditorConfig;
pub use error::EditorError;
pub use session::{CommitReport, EditSession, EditorSession};
