//! Map Module
//!
//! Provides a concurrent map that keeps its memory footprint proportional to
//! its live entries under delete/insert churn.

mod generational;
mod stats;


// Re-export public types
pub use generational::GenerationalMap;
pub use stats::MapStats;
