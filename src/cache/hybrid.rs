//! Read-through cache facade used by the handlers.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore, EntryOptions};
use crate::config::Config;

/// Where a value returned by [`HybridCache::get_or_create`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Database,
}

impl DataSource {
    /// Value written to the `X-Data-Source` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Cache => "Cache",
            DataSource::Database => "Database",
        }
    }
}

struct Inner {
    store: CacheStore,
    /// Bumped by every `remove`. A loader result is only written back when
    /// no removal happened while it ran.
    generation: u64,
}

/// Async read-through cache storing values as JSON.
///
/// The inner lock is never held while a loader runs, so misses on different
/// keys proceed concurrently. Two concurrent misses on the same key may both
/// run their loader; the later write wins. A load that overlaps a `remove`
/// still returns its value but does not cache it.
#[derive(Clone)]
pub struct HybridCache {
    inner: Arc<Mutex<Inner>>,
    options: EntryOptions,
}

impl HybridCache {
    pub fn new(store: CacheStore, options: EntryOptions) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store,
                generation: 0,
            })),
            options,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let store = CacheStore::new(
            config.cache_max_entries,
            config.cache_max_key_length,
            config.cache_max_payload_bytes,
        );
        Self::new(
            store,
            EntryOptions {
                expiration: config.cache_expiration,
                sliding_expiration: config.cache_sliding_expiration,
            },
        )
    }

    /// Returns the cached value for `key`, or runs `loader` once, caches its
    /// result and returns it.
    ///
    /// A value the cache refuses (key or payload bound) is still returned to
    /// the caller with [`DataSource::Database`].
    pub async fn get_or_create<T, F, Fut>(&self, key: &str, loader: F) -> (T, DataSource)
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (cached, generation) = {
            let mut inner = self.inner.lock().await;
            (inner.store.get(key), inner.generation)
        };
        if let Some(raw) = cached {
            match serde_json::from_str(&raw) {
                Ok(value) => return (value, DataSource::Cache),
                Err(e) => {
                    warn!(key, error = %e, "Dropping undecodable cache entry");
                    self.inner.lock().await.store.remove(key);
                }
            }
        }

        let value = loader().await;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                let mut inner = self.inner.lock().await;
                if inner.generation != generation {
                    debug!(key, "Invalidated while loading, value not cached");
                } else if let Err(e) = inner.store.set(key, raw, self.options) {
                    debug!(key, error = %e, "Value not cached");
                }
            }
            Err(e) => warn!(key, error = %e, "Value could not be serialized for caching"),
        }

        (value, DataSource::Database)
    }

    /// Evicts `key` immediately. Loads already in flight will not write
    /// their result back.
    pub async fn remove(&self, key: &str) {
        let mut inner = self.inner.lock().await;
        inner.generation = inner.generation.wrapping_add(1);
        if inner.store.remove(key) {
            debug!(key, "Cache entry invalidated");
        }
    }

    /// Drops every expired entry. Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.inner.lock().await.store.cleanup_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.store.stats()
    }
}
