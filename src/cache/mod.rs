//! Cache Module
//!
//! Provides a fixed-capacity LRU cache with O(1) get, put and eviction.

mod lru;
mod recency;
mod stats;


// Re-export public types
pub use lru::LruCache;
pub use stats::CacheStats;
