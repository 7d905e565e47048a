//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with absolute and
//! sliding expiration.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Entry Options ==
/// Expiration settings applied when an entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    /// Lifetime measured from creation
    pub expiration: Duration,
    /// Optional idle lifetime, refreshed on every hit but never past `expiration`
    pub sliding_expiration: Option<Duration>,
}

impl EntryOptions {
    /// Options with only an absolute expiration.
    pub fn absolute(expiration: Duration) -> Self {
        Self {
            expiration,
            sliding_expiration: None,
        }
    }
}

// == Cache Entry ==
/// A single serialized value with its expiration metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored (JSON) value
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Absolute expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Sliding window in milliseconds, if any
    pub sliding_ms: Option<u64>,
    /// Last successful read (Unix milliseconds)
    pub last_access: u64,
}

impl CacheEntry {
    /// Creates a new entry expiring according to `options`.
    pub fn new(value: String, options: EntryOptions) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(options.expiration.as_millis() as u64),
            sliding_ms: options.sliding_expiration.map(|d| d.as_millis() as u64),
            last_access: now,
        }
    }

    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the absolute
    /// expiration, or once it has been idle for the full sliding window.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    fn is_expired_at(&self, now: u64) -> bool {
        if now >= self.expires_at {
            return true;
        }
        match self.sliding_ms {
            Some(sliding) => now >= self.last_access.saturating_add(sliding),
            None => false,
        }
    }

    /// Records a read, extending the sliding window.
    pub fn touch(&mut self) {
        self.last_access = current_timestamp_ms();
    }

    /// Returns remaining lifetime in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> u64 {
        let now = current_timestamp_ms();
        let mut deadline = self.expires_at;
        if let Some(sliding) = self.sliding_ms {
            deadline = deadline.min(self.last_access.saturating_add(sliding));
        }
        deadline.saturating_sub(now)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
