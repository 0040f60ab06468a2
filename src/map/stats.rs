//! Map Statistics Module
//!
//! Snapshot of the generation bookkeeping inside a `GenerationalMap`.

use serde::Serialize;

// == Map Stats ==
/// Point-in-time view of both generations and their deletion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapStats {
    /// Live entries in the old generation
    pub old_len: usize,
    /// Live entries in the new generation
    pub new_len: usize,
    /// Removals against the old generation since its last compaction
    pub deletions_old: usize,
    /// Removals against the new generation since its last compaction
    pub deletions_new: usize,
    /// Compactions performed over the map's lifetime
    pub compactions: u64,
}

impl MapStats {
    /// Total live entries across both generations.
    pub fn total_entries(&self) -> usize {
        self.old_len + self.new_len
    }
}
