//! LRU Cache Module
//!
//! Fixed-capacity cache combining a hash index with a recency list.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::recency::RecencyList;
use crate::cache::CacheStats;
use crate::error::{CacheError, Result};

// == Cache State ==
struct LruState<K, V> {
    /// Key to slot in `order`
    index: HashMap<K, usize>,
    /// Entries, most recently used first
    order: RecencyList<K, V>,
    stats: CacheStats,
}

impl<K: Hash + Eq, V> LruState<K, V> {
    fn slot<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).copied()
    }
}

// == LRU Cache ==
/// Thread-safe least-recently-used cache.
///
/// Every operation takes one mutex, since even `get` reorders entries.
/// `get`, `put` and `delete` are O(1).
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        debug!(capacity, "lru cache created");
        Ok(Self {
            state: Mutex::new(LruState {
                index: HashMap::with_capacity(capacity),
                order: RecencyList::with_capacity(capacity),
                stats: CacheStats::new(capacity),
            }),
            capacity,
        })
    }

    // == Put ==
    /// Inserts or updates `key` and marks it most recently used.
    ///
    /// Inserting a new key into a full cache first evicts the least recently
    /// used entry, which is returned. Updating an existing key never evicts.
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        let mut state = self.state.lock();

        if let Some(idx) = state.slot(&key) {
            if let Some(slot) = state.order.value_mut(idx) {
                *slot = value;
            }
            state.order.touch(idx);
            return None;
        }

        let evicted = if state.index.len() >= self.capacity {
            let oldest = state.order.pop_back();
            if let Some((old_key, _)) = &oldest {
                state.index.remove(old_key);
                state.stats.record_eviction();
                trace!(len = state.index.len(), "evicted least recently used entry");
            }
            oldest
        } else {
            None
        };

        let idx = state.order.push_front(key.clone(), value);
        state.index.insert(key, idx);
        evicted
    }

    // == Delete ==
    /// Removes `key` and returns its value. No-op on a miss.
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();
        let idx = state.index.remove(key)?;
        state.order.remove(idx).map(|(_, value)| value)
    }

    // == Keys ==
    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let state = self.state.lock();
        state.order.iter().map(|(key, _)| key.clone()).collect()
    }
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    // == For Each ==
    /// Visits every entry from most to least recently used.
    ///
    /// Recency is not changed. The lock is held for the whole walk, so `f`
    /// must not call back into this cache at all: any method, including
    /// `get`, `len` or `contains`, deadlocks.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        let state = self.state.lock();
        for (key, value) in state.order.iter() {
            f(key, value);
        }
    }

    // == Contains ==
    /// Returns true if `key` is cached, without touching recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.lock().index.contains_key(key)
    }

    // == Length ==
    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    // == Is Empty ==
    /// Returns true if no entry is cached.
    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    // == Capacity ==
    /// Maximum number of entries before eviction starts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Clear ==
    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.index.clear();
        state.order.clear();
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            total_entries: state.index.len(),
            ..state.stats
        }
    }
}

impl<K: Hash + Eq, V: Clone> LruCache<K, V> {
    // == Get ==
    /// Returns a copy of the value for `key` and marks it most recently used.
    ///
    /// A miss leaves the cache untouched apart from the miss counter.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();
        let Some(idx) = state.slot(key) else {
            state.stats.record_miss();
            return None;
        };
        state.order.touch(idx);
        state.stats.record_hit();
        state.order.entry(idx).map(|(_, value)| value.clone())
    }

    // == Peek ==
    /// Returns a copy of the value without touching recency or counters.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let state = self.state.lock();
        let idx = state.slot(key)?;
        state.order.entry(idx).map(|(_, value)| value.clone())
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &state.order.len())
            .finish()
    }
}
