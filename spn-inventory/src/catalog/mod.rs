//! SPN catalog and its snapshot loader
//!
//! This module contains the in-memory catalog (PGN → SPN definitions)
//! and the JSON parameter-table loader that builds it.

pub mod database;
pub mod json;

// Re-export key types for convenience
pub use database::{CatalogStats, PgnEntry, SpnCatalog, SpnDefinition};
pub use json::CatalogRecord;
