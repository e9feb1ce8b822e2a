//! Query functions over the canonical dataset.
//!
//! - pure view operations (`view`): filter by year/region, group by columns
//! - region-scope combinators for charts and shares (`scope`)

pub mod scope;
pub mod view;

pub use scope::*;
pub use view::*;
