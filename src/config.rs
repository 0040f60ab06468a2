//! Configuration Module
//!
//! Generation thresholds for the map, plus the driver's workload settings
//! loaded from environment variables.

use std::env;
use std::str::FromStr;

use crate::error::{CacheError, Result};

// == Map Config ==
/// Thresholds controlling when a generation is compacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Deletions a generation must accumulate before it may be compacted
    pub max_deletion: usize,
    /// Live-entry ceiling below which a compaction copy is allowed
    pub copy_threshold: usize,
}

impl MapConfig {
    /// Deletion count that arms compaction of a generation.
    pub const DEFAULT_MAX_DELETION: usize = 10_000;
    /// Maximum number of entries a single compaction may copy.
    pub const DEFAULT_COPY_THRESHOLD: usize = 1_000;

    /// Rejects thresholds that would make compaction fire on every call.
    pub fn validate(&self) -> Result<()> {
        if self.max_deletion == 0 {
            return Err(CacheError::InvalidConfig(
                "max_deletion must be greater than 0".to_string(),
            ));
        }
        if self.copy_threshold == 0 {
            return Err(CacheError::InvalidConfig(
                "copy_threshold must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            max_deletion: Self::DEFAULT_MAX_DELETION,
            copy_threshold: Self::DEFAULT_COPY_THRESHOLD,
        }
    }
}

/// Workload driver configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the LRU cache fronting the map
    pub lru_capacity: usize,
    /// Generation thresholds for the map
    pub map: MapConfig,
    /// Number of worker threads
    pub workers: usize,
    /// Operations each worker performs
    pub ops_per_worker: usize,
    /// Distinct keys owned by each worker
    pub key_space: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SAFEMAP_LRU_CAPACITY` - LRU capacity (default: 1000)
    /// - `SAFEMAP_MAX_DELETION` - Deletions before compaction (default: 10000)
    /// - `SAFEMAP_COPY_THRESHOLD` - Compaction copy bound (default: 1000)
    /// - `SAFEMAP_WORKERS` - Worker threads (default: 4)
    /// - `SAFEMAP_OPS_PER_WORKER` - Operations per worker (default: 10000)
    /// - `SAFEMAP_KEY_SPACE` - Keys per worker (default: 2000)
    ///
    /// A variable that is set but does not parse is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            lru_capacity: env_or("SAFEMAP_LRU_CAPACITY", defaults.lru_capacity)?,
            map: MapConfig {
                max_deletion: env_or("SAFEMAP_MAX_DELETION", defaults.map.max_deletion)?,
                copy_threshold: env_or("SAFEMAP_COPY_THRESHOLD", defaults.map.copy_threshold)?,
            },
            workers: env_or("SAFEMAP_WORKERS", defaults.workers)?,
            ops_per_worker: env_or("SAFEMAP_OPS_PER_WORKER", defaults.ops_per_worker)?,
            key_space: env_or("SAFEMAP_KEY_SPACE", defaults.key_space)?,
        })
    }

    /// Checks every field, including the nested map thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.lru_capacity == 0 {
            return Err(CacheError::InvalidCapacity(0));
        }
        if self.workers == 0 {
            return Err(CacheError::InvalidConfig(
                "workers must be greater than 0".to_string(),
            ));
        }
        if self.key_space == 0 {
            return Err(CacheError::InvalidConfig(
                "key_space must be greater than 0".to_string(),
            ));
        }
        self.map.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lru_capacity: 1000,
            map: MapConfig::default(),
            workers: 4,
            ops_per_worker: 10_000,
            key_space: 2000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CacheError::InvalidConfig(format!("{name}={raw:?} is not a valid number"))),
        Err(_) => Ok(default),
    }
}
