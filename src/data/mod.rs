//! Source data: fetching, raw tables, cleaning and the merged dataset.
//!
//! - source retrieval with timeout/retry (`source`)
//! - untyped `;`-delimited tables (`table`)
//! - per-source cleaning (`clean`)
//! - merge into the canonical dataset (`builder`, `dataset`)

pub mod builder;
pub mod clean;
pub mod dataset;
pub mod source;
pub mod table;

pub use builder::*;
pub use dataset::*;
pub use source::*;
pub use table::*;
