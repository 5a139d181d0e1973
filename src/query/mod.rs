//! Queries over a built relationship graph
//!
//! Provides the required-variable closure, variable classification and
//! shape-based grouping.

mod classify;
mod closure;
mod grouping;

pub use classify::ClassificationEngine;
pub use closure::ClosureEngine;
pub use grouping::DimensionGroups;
