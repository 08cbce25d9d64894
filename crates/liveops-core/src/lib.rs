//! liveops-core: shared model, errors and configuration.
//!
//! This crate is the foundational dependency for the other liveops crates,
//! providing the channel/resource data model, a unified error type that maps
//! onto HTTP status codes, and the application configuration.

pub mod config;
pub mod error;
pub mod model;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use model::*;
