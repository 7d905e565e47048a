//! Cache Statistics Module
//!
//! Counters for hits, misses, evictions, invalidations and refused writes.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that fell through to the loader
    pub misses: u64,
    /// Entries dropped to respect the entry bound
    pub evictions: u64,
    /// Entries removed explicitly after a mutation
    pub invalidations: u64,
    /// Values refused because of key or payload bounds
    pub rejected_writes: u64,
    /// Current number of entries
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns hits / (hits + misses), or 0.0 if nothing was read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
