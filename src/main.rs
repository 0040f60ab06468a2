//! Safemap workload driver
//!
//! Runs a mixed set/get/delete churn workload against a shared
//! `GenerationalMap`, fronted by an `LruCache` read-through layer, and
//! reports the resulting statistics as JSON.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Context};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safemap::{CacheStats, Config, GenerationalMap, LruCache, MapStats};

/// Multiplier that scatters consecutive operations across the key space.
const KEY_STRIDE: u64 = 7919;

#[derive(Debug, Default, Serialize)]
struct WorkerReport {
    sets: u64,
    gets: u64,
    dels: u64,
    /// Keys this worker's own model says are live
    live_keys: u64,
    /// Reads where the map disagreed with the worker's model
    mismatches: u64,
}

#[derive(Debug, Serialize)]
struct RunReport {
    workers: usize,
    elapsed_ms: u128,
    map: MapStats,
    cache: CacheStats,
    per_worker: Vec<WorkerReport>,
}

/// Main entry point for the workload driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build the shared map and cache
/// 4. Run one thread per worker on a disjoint key range
/// 5. Print the combined statistics
fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safemap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: lru_capacity={}, max_deletion={}, copy_threshold={}, workers={}, ops_per_worker={}, key_space={}",
        config.lru_capacity,
        config.map.max_deletion,
        config.map.copy_threshold,
        config.workers,
        config.ops_per_worker,
        config.key_space
    );

    let map = Arc::new(GenerationalMap::with_config(config.map)?);
    let cache = Arc::new(LruCache::new(config.lru_capacity)?);

    let started = Instant::now();
    let handles: Vec<_> = (0..config.workers)
        .map(|id| {
            let map = Arc::clone(&map);
            let cache = Arc::clone(&cache);
            let config = config.clone();
            thread::spawn(move || run_worker(id, &map, &cache, &config))
        })
        .collect();

    let mut per_worker = Vec::with_capacity(handles.len());
    for handle in handles {
        let report = handle
            .join()
            .map_err(|_| anyhow!("worker thread panicked"))?;
        per_worker.push(report);
    }

    let map_stats = map.stats();
    check_totals(map_stats.total_entries(), &per_worker)?;
    let report = RunReport {
        workers: config.workers,
        elapsed_ms: started.elapsed().as_millis(),
        map: map_stats,
        cache: cache.stats(),
        per_worker,
    };

    info!(
        "Workload finished in {}ms: {} live keys, {} compactions, cache hit rate {:.3}",
        report.elapsed_ms,
        report.map.total_entries(),
        report.map.compactions,
        report.cache.hit_rate()
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Runs one worker's share of the workload on keys `[id * key_space, (id + 1) * key_space)`.
///
/// Reads go through the cache first and fill it from the map on a miss;
/// deletes invalidate both.
fn run_worker(
    id: usize,
    map: &GenerationalMap<u64, u64>,
    cache: &LruCache<u64, u64>,
    config: &Config,
) -> WorkerReport {
    let key_space = config.key_space as u64;
    let base = id as u64 * key_space;
    let mut report = WorkerReport::default();
    let mut model: HashMap<u64, u64> = HashMap::new();

    for op in 0..config.ops_per_worker as u64 {
        let key = base + (op * KEY_STRIDE) % key_space;
        match op % 10 {
            0..=4 => {
                map.set(key, op);
                model.insert(key, op);
                cache.delete(&key);
                report.sets += 1;
            }
            5..=6 => {
                let value = match cache.get(&key) {
                    Some(value) => Some(value),
                    None => {
                        let value = map.get(&key);
                        if let Some(value) = value {
                            cache.put(key, value);
                        }
                        value
                    }
                };
                if value != model.get(&key).copied() {
                    report.mismatches += 1;
                }
                report.gets += 1;
            }
            _ => {
                map.del(&key);
                model.remove(&key);
                cache.delete(&key);
                report.dels += 1;
            }
        }
    }

    report.live_keys = model.len() as u64;
    debug!(worker = id, ?report, "worker finished");
    report
}

/// Compares the map's final size and each worker's reads with the workers' models.
fn check_totals(map_entries: usize, per_worker: &[WorkerReport]) -> anyhow::Result<()> {
    let mismatches: u64 = per_worker.iter().map(|r| r.mismatches).sum();
    if mismatches > 0 {
        return Err(anyhow!("{} reads disagreed with the worker models", mismatches));
    }
    let expected_live: u64 = per_worker.iter().map(|r| r.live_keys).sum();
    if map_entries as u64 != expected_live {
        return Err(anyhow!(
            "map holds {} keys but workers left {} live",
            map_entries,
            expected_live
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        Config {
            lru_capacity: 16,
            workers: 1,
            ops_per_worker: 2_000,
            key_space: 64,
            ..Config::default()
        }
    }

    #[test]
    fn test_worker_model_matches_map() {
        let config = small_config();
        let map = GenerationalMap::new();
        let cache = LruCache::new(config.lru_capacity).unwrap();

        let report = run_worker(0, &map, &cache, &config);
        assert_eq!(report.mismatches, 0);
        assert_eq!(report.live_keys, map.len() as u64);
        assert_eq!(report.sets + report.gets + report.dels, 2_000);
        assert!(check_totals(map.len(), &[report]).is_ok());
    }

    #[test]
    fn test_phantom_key_is_detected() {
        let config = small_config();
        let map = GenerationalMap::new();
        let cache = LruCache::new(config.lru_capacity).unwrap();

        let report = run_worker(0, &map, &cache, &config);
        // A key nobody's model knows about must fail the size check.
        map.set(u64::MAX, 0);
        assert!(check_totals(map.len(), &[report]).is_err());
    }

    #[test]
    fn test_read_mismatch_is_detected() {
        let report = WorkerReport {
            mismatches: 1,
            ..WorkerReport::default()
        };
        assert!(check_totals(0, &[report]).is_err());
    }
}
