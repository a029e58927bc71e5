//! lf-core: shared types, IDs, errors and application configuration.
//!
//! This crate is the foundational dependency for all other lf-* crates.

pub mod config;
pub mod error;
pub mod ids;
pub mod model;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use model::*;
