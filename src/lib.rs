//! Safemap - concurrent in-process containers
//!
//! Provides a generational map that reclaims storage under delete/insert
//! churn, and a fixed-capacity LRU cache with O(1) operations.

pub mod cache;
pub mod config;
pub mod error;
pub mod map;

pub use cache::{CacheStats, LruCache};
pub use config::{Config, MapConfig};
pub use error::{CacheError, Result};
pub use map::{GenerationalMap, MapStats};
