//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - metric and dimension enums (`Metric`, `Column`)
//! - the canonical merged row (`CanonicalRecord`)
//! - forecast outputs (`ForecastResult`, `ForecastPoint`)
//! - source configuration (`SourceConfig`)

pub mod types;

pub use types::*;
