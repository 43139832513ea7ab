//! Cross-module tests for the harvest resolver.
//!
//! - `scenarios.rs`: end-to-end resolutions through the in-memory host
//! - `determinism.rs`: identical seeds give identical result streams
//! - `helpers.rs`: catalogs, configs and host setup shared by both

mod determinism;
mod helpers;

pub use helpers::*;
