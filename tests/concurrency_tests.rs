//! Integration Tests for Concurrent Access
//!
//! Exercises both containers from many threads through the public API only.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use safemap::{CacheError, GenerationalMap, LruCache, MapConfig};

// == Helper Functions ==

const THREADS: u64 = 8;
const OPS_PER_THREAD: u64 = 10_000;
const KEYS_PER_THREAD: u64 = 500;

/// Deterministic per-thread operation: returns (key, action) where action is
/// 0 = set, 1 = get, 2 = del.
fn op_for(thread_id: u64, step: u64) -> (u64, u64) {
    let key = thread_id * KEYS_PER_THREAD + (step * 31 + thread_id) % KEYS_PER_THREAD;
    let action = (step * 7 + thread_id) % 3;
    (key, action)
}

// == GenerationalMap ==

#[test]
fn test_map_concurrent_disjoint_ranges() {
    let map = Arc::new(GenerationalMap::with_config(MapConfig {
        max_deletion: 200,
        copy_threshold: 100,
    })
    .unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut model = HashMap::new();
                for step in 0..OPS_PER_THREAD {
                    let (key, action) = op_for(t, step);
                    match action {
                        0 => {
                            map.set(key, step);
                            model.insert(key, step);
                        }
                        1 => assert_eq!(map.get(&key), model.get(&key).copied()),
                        _ => assert_eq!(map.del(&key), model.remove(&key)),
                    }
                }
                model
            })
        })
        .collect();

    let mut expected = HashMap::new();
    for handle in handles {
        expected.extend(handle.join().unwrap());
    }

    assert_eq!(map.len(), expected.len(), "lost updates or phantom keys");
    for (key, value) in &expected {
        assert_eq!(map.get(key), Some(*value));
    }
    let mut keys = map.keys();
    keys.sort_unstable();
    let mut expected_keys: Vec<u64> = expected.keys().copied().collect();
    expected_keys.sort_unstable();
    assert_eq!(keys, expected_keys);
}

#[test]
fn test_map_readers_never_see_partial_compaction() {
    let map = Arc::new(GenerationalMap::with_config(MapConfig {
        max_deletion: 50,
        copy_threshold: 20,
    })
    .unwrap());
    // Stable keys that must stay visible through every compaction.
    for key in 0..10u64 {
        map.set(key, key);
    }

    let writer = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            for round in 0..200u64 {
                for key in 1_000..1_060u64 {
                    map.set(key, round);
                }
                for key in 1_000..1_060u64 {
                    map.del(&key);
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    for key in 0..10u64 {
                        assert_eq!(map.get(&key), Some(key));
                    }
                    assert!(map.len() >= 10);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(map.len(), 10);
    assert!(map.stats().compactions > 0);
}

#[test]
fn test_map_range_callback_reads_while_writer_waits() {
    let map = Arc::new(GenerationalMap::new());
    map.set(1u64, 1u64);

    let (done_tx, done_rx) = mpsc::channel();
    let walker = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            let mut writer = None;
            let mut nested = None;
            map.range(|_, _| {
                let queued = Arc::clone(&map);
                writer = Some(thread::spawn(move || queued.set(2, 2)));
                // Give the writer time to queue behind the held read lock.
                thread::sleep(Duration::from_millis(200));
                nested = map.get(&1);
                false
            });
            let _ = done_tx.send(nested);
            if let Some(writer) = writer {
                writer.join().unwrap();
            }
        })
    };

    let nested = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("nested get inside range blocked behind a queued writer");
    assert_eq!(nested, Some(1));
    walker.join().unwrap();
    assert_eq!(map.get(&2), Some(2));
    assert_eq!(map.len(), 2);
}

#[test]
fn test_map_range_sees_consistent_snapshot() {
    let map = GenerationalMap::new();
    for key in 0..100u32 {
        map.set(key, key * 2);
    }
    let mut total = 0u32;
    let mut count = 0;
    map.range(|k, v| {
        assert_eq!(*v, k * 2);
        total += v;
        count += 1;
        true
    });
    assert_eq!(count, 100);
    assert_eq!(total, (0..100u32).map(|k| k * 2).sum());
}

// == LruCache ==

#[test]
fn test_lru_zero_capacity_is_configuration_error() {
    let err = LruCache::<String, u32>::new(0).unwrap_err();
    assert_eq!(err, CacheError::InvalidCapacity(0));
}

#[test]
fn test_lru_concurrent_puts_respect_capacity() {
    let cache = Arc::new(LruCache::new(64).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for step in 0..OPS_PER_THREAD {
                    let (key, action) = op_for(t, step);
                    match action {
                        0 => {
                            cache.put(key, step);
                        }
                        1 => {
                            if let Some(value) = cache.get(&key) {
                                assert!(value < OPS_PER_THREAD);
                            }
                        }
                        _ => {
                            cache.delete(&key);
                        }
                    }
                    assert!(cache.len() <= 64);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.stats();
    assert!(stats.total_entries <= 64);
    assert_eq!(stats.total_entries, cache.keys().len());
    assert!(stats.evictions > 0);
}

#[test]
fn test_lru_hot_key_survives_concurrent_churn() {
    let cache = Arc::new(LruCache::new(16).unwrap());
    cache.put("hot".to_string(), 0u64);

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for step in 0..2_000u64 {
                    // Refresh the hot key far more often than the cache can cycle.
                    assert!(cache.get("hot").is_some());
                    cache.put(format!("cold-{}-{}", t, step), step);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(cache.contains("hot"));
}
