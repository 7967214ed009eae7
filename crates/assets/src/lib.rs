//! Asset discovery for catalog images.
//!
//! The image store offers no listing in the general case (a static file
//! host), so [`prober::AssetProber`] reconstructs which images exist for a
//! plant by probing every name the naming convention allows. Stores that
//! can list their contents (a local directory) narrow the probe set first.

pub mod error;
pub mod http;
pub mod local;
pub mod prober;
pub mod store;

pub use error::ProbeError;
pub use prober::{AssetProber, Discovery, DiscoveryMethod, ProbeConfig};
pub use store::{open_store, AssetStore};
