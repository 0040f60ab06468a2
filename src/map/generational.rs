//! Generational Map Module
//!
//! A concurrent map split into an "old" and a "new" generation. Deletions are
//! counted per generation; once a generation has absorbed enough deletions and
//! shrunk below the copy threshold, its survivors are folded into the other
//! generation and its backing table is dropped. This keeps the memory held by
//! the map proportional to the live key count under heavy delete/insert churn.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::MapConfig;
use crate::error::Result;
use crate::map::MapStats;

// == Generations ==
/// Both generations and their counters, guarded together by one lock.
#[derive(Debug)]
struct Generations<K, V> {
    old: HashMap<K, V>,
    new: HashMap<K, V>,
    deletions_old: usize,
    deletions_new: usize,
    compactions: u64,
}

impl<K, V> Default for Generations<K, V> {
    fn default() -> Self {
        Self {
            old: HashMap::new(),
            new: HashMap::new(),
            deletions_old: 0,
            deletions_new: 0,
            compactions: 0,
        }
    }
}

impl<K: Hash + Eq, V> Generations<K, V> {
    /// Folds a deletion-heavy, mostly empty generation into the other one.
    ///
    /// At most one direction fires per call.
    fn compact(&mut self, config: &MapConfig) {
        if self.deletions_old >= config.max_deletion && self.old.len() < config.copy_threshold {
            let holey = mem::take(&mut self.old);
            let moved = holey.len();
            let mut merged = mem::take(&mut self.new);
            merged.extend(holey);
            // The merged table becomes the old generation and keeps its counter.
            self.old = merged;
            self.deletions_old = self.deletions_new;
            self.deletions_new = 0;
            self.compactions += 1;
            debug!(
                moved,
                old_len = self.old.len(),
                deletions_old = self.deletions_old,
                "compacted old generation into new"
            );
            return;
        }

        if self.deletions_new >= config.max_deletion && self.new.len() < config.copy_threshold {
            let holey = mem::take(&mut self.new);
            let moved = holey.len();
            self.old.extend(holey);
            self.deletions_new = 0;
            self.compactions += 1;
            debug!(
                moved,
                old_len = self.old.len(),
                "compacted new generation into old"
            );
        }
    }
}

// == Generational Map ==
/// Thread-safe map that reclaims storage after mass deletion.
///
/// Reads (`get`, `keys`, `range`, `len`) take a recursive shared lock, so a
/// reader nested inside `range` is never queued behind a waiting writer; `set` and `del`
/// take the exclusive lock, and any compaction runs inside `del`'s critical
/// section so no caller ever observes a half-merged state.
#[derive(Debug)]
pub struct GenerationalMap<K, V> {
    inner: RwLock<Generations<K, V>>,
    config: MapConfig,
}

impl<K: Hash + Eq, V> GenerationalMap<K, V> {
    // == Constructor ==
    /// Creates an empty map with the default thresholds.
    pub fn new() -> Self {
        Self::build(MapConfig::default())
    }

    /// Creates an empty map with custom compaction thresholds.
    pub fn with_config(config: MapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MapConfig) -> Self {
        debug!(
            max_deletion = config.max_deletion,
            copy_threshold = config.copy_threshold,
            "generational map created"
        );
        Self {
            inner: RwLock::new(Generations::default()),
            config,
        }
    }

    /// Thresholds this map was built with.
    pub fn config(&self) -> MapConfig {
        self.config
    }

    // == Set ==
    /// Inserts or overwrites `key`.
    ///
    /// Writes go to the old generation until it has absorbed more than
    /// `max_deletion` removals, then to the new generation until a compaction
    /// resets the old counter. A stale copy in the other generation is removed
    /// and counted as a deletion there.
    pub fn set(&self, key: K, value: V) {
        let mut gens = self.inner.write();

        if gens.deletions_old <= self.config.max_deletion {
            if gens.new.remove(&key).is_some() {
                gens.deletions_new += 1;
            }
            gens.old.insert(key, value);
        } else {
            if gens.old.remove(&key).is_some() {
                gens.deletions_old += 1;
            }
            gens.new.insert(key, value);
        }
    }

    // == Delete ==
    /// Removes `key` from whichever generation holds it and returns its value.
    ///
    /// Compaction conditions are evaluated after every call, hit or miss.
    pub fn del<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut gens = self.inner.write();

        let removed = if let Some(value) = gens.old.remove(key) {
            gens.deletions_old += 1;
            Some(value)
        } else if let Some(value) = gens.new.remove(key) {
            gens.deletions_new += 1;
            Some(value)
        } else {
            None
        };

        gens.compact(&self.config);
        removed
    }

    // == Contains ==
    /// Returns true if `key` is live in either generation.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let gens = self.inner.read_recursive();
        gens.old.contains_key(key) || gens.new.contains_key(key)
    }

    // == Length ==
    /// Live entries across both generations.
    pub fn len(&self) -> usize {
        let gens = self.inner.read_recursive();
        gens.old.len() + gens.new.len()
    }

    // == Is Empty ==
    /// Returns true if neither generation holds a live entry.
    pub fn is_empty(&self) -> bool {
        let gens = self.inner.read_recursive();
        gens.old.is_empty() && gens.new.is_empty()
    }

    // == Range ==
    /// Calls `f` for every entry, old generation first, until `f` returns false.
    ///
    /// The shared lock is held for the whole walk. `f` may read the same map
    /// (`get`, `len`, `keys`, ...) since every read path takes the lock
    /// recursively, but it must not call `set` or `del` on it or it will
    /// deadlock.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let gens = self.inner.read_recursive();
        for (key, value) in gens.old.iter().chain(gens.new.iter()) {
            if !f(key, value) {
                return;
            }
        }
    }

    // == Stats ==
    /// Snapshot of generation sizes and counters.
    pub fn stats(&self) -> MapStats {
        let gens = self.inner.read_recursive();
        MapStats {
            old_len: gens.old.len(),
            new_len: gens.new.len(),
            deletions_old: gens.deletions_old,
            deletions_new: gens.deletions_new,
            compactions: gens.compactions,
        }
    }
}

impl<K: Hash + Eq, V: Clone> GenerationalMap<K, V> {
    // == Get ==
    /// Returns a copy of the value for `key`, checking old then new.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let gens = self.inner.read_recursive();
        gens.old.get(key).or_else(|| gens.new.get(key)).cloned()
    }
}

impl<K: Hash + Eq + Clone, V> GenerationalMap<K, V> {
    // == Keys ==
    /// Snapshot of all live keys, old generation first. Order is unspecified.
    pub fn keys(&self) -> Vec<K> {
        let gens = self.inner.read_recursive();
        let mut keys = Vec::with_capacity(gens.old.len() + gens.new.len());
        keys.extend(gens.old.keys().cloned());
        keys.extend(gens.new.keys().cloned());
        keys
    }
}

impl<K: Hash + Eq, V> Default for GenerationalMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
