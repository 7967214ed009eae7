//! `herbari-core` -- data model and pure logic for the plant catalog.
//!
//! No I/O lives here: the catalog store, import normalization, naming
//! conventions, environment classification and the image edit buffer are
//! all plain in-memory operations. Persistence and asset discovery build on
//! top of these types in the `herbari-persist` and `herbari-assets` crates.

pub mod bloom;
pub mod catalog;
pub mod environment;
pub mod error;
pub mod images;
pub mod import;
pub mod model;
pub mod naming;
pub mod notice;
pub mod record;
pub mod rename;
pub mod tags;
