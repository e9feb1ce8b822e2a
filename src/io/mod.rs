//! Input/output helpers.
//!
//! - view and forecast exports (CSV) (`export`)
//! - forecast JSON read/write (`json`)

pub mod export;
pub mod json;

pub use export::*;
pub use json::*;
