//! Cache Store Module
//!
//! Synchronous cache engine: HashMap storage with LRU tracking, expiration
//! and size bounds. Wrapped in a lock by [`HybridCache`](super::HybridCache).

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheStats, CacheWriteError, EntryOptions, LruTracker};

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    max_entries: usize,
    max_key_length: usize,
    max_payload_bytes: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `max_entries` - Entry count before the least recently used entry is evicted
    /// * `max_key_length` - Longest accepted key, in bytes
    /// * `max_payload_bytes` - Largest accepted serialized value, in bytes
    pub fn new(max_entries: usize, max_key_length: usize, max_payload_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            max_key_length,
            max_payload_bytes,
        }
    }

    // == Set ==
    /// Stores a value, replacing any previous entry for the key.
    ///
    /// Values outside the key/payload bounds are refused and counted; the
    /// store is left untouched.
    pub fn set(
        &mut self,
        key: &str,
        value: String,
        options: EntryOptions,
    ) -> Result<(), CacheWriteError> {
        if key.len() > self.max_key_length {
            self.stats.rejected_writes += 1;
            return Err(CacheWriteError::KeyTooLong {
                len: key.len(),
                max: self.max_key_length,
            });
        }
        if value.len() > self.max_payload_bytes {
            self.stats.rejected_writes += 1;
            return Err(CacheWriteError::PayloadTooLarge {
                size: value.len(),
                max: self.max_payload_bytes,
            });
        }

        let is_overwrite = self.entries.contains_key(key);
        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.evictions += 1;
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, options));
        self.lru.touch(key);
        Ok(())
    }

    // == Get ==
    /// Returns the value for `key` if present and unexpired.
    ///
    /// Expired entries are dropped on access. Every call counts as a hit or
    /// a miss.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let expired = match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.touch();
                let value = entry.value.clone();
                self.stats.hits += 1;
                self.lru.touch(key);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }
        self.stats.misses += 1;
        None
    }

    // == Remove ==
    /// Evicts `key` unconditionally. Returns true if an entry was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.invalidations += 1;
        }
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }
        expired.len()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            ..self.stats.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
