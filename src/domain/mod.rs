//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - catalogs of countries and indicators (`Catalog`)
//! - extracted observation records (`Observation`)
//! - run configuration (`HarvestConfig`, `OutputFormat`, `ParseFailurePolicy`)

pub mod types;

pub use types::*;
