//! Layerforge - batch processing of image layers
//!
//! This library crate ties the workspace crates together for the CLI and
//! for integration testing.

pub mod manifest;
pub mod session;

pub use manifest::{Manifest, ManifestItem, ManifestProcedure};
pub use session::BatchSession;
