//! Cache Module
//!
//! Read-through cache in front of the post store. `CacheStore` holds
//! serialized entries with absolute/sliding expiration and LRU eviction;
//! `HybridCache` adds the async `get_or_create`/`remove` surface the
//! handlers use.

mod entry;
mod hybrid;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use thiserror::Error;

// Re-export public types
pub use entry::{CacheEntry, EntryOptions};
pub use hybrid::{DataSource, HybridCache};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Cache Write Error ==
/// Reasons a value is refused by the cache. Callers fall back to the store.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheWriteError {
    /// Key longer than the configured maximum
    #[error("Key length {len} exceeds maximum of {max}")]
    KeyTooLong { len: usize, max: usize },

    /// Serialized value larger than the configured maximum
    #[error("Payload of {size} bytes exceeds maximum of {max}")]
    PayloadTooLarge { size: usize, max: usize },
}
