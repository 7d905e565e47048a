//! Rate Limiting Module
//!
//! Named admission-control policies selected per route group. No request is
//! ever queued: a policy without a free permit rejects immediately.

mod concurrency;
mod fixed_window;
mod sliding_window;
mod token_bucket;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::OwnedSemaphorePermit;
use tracing::warn;

use crate::config::RateLimitConfig;

pub use concurrency::ConcurrencyLimiter;
pub use fixed_window::FixedWindow;
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;

pub const FIXED_WINDOW: &str = "FixedWindow";
pub const SLIDING_WINDOW: &str = "SlidingWindow";
pub const TOKEN_BUCKET: &str = "TokenBucket";
pub const CONCURRENCY: &str = "Concurrency";

/// Whole `period`s between `since` and `now`, and the duration they span.
pub(crate) fn elapsed_periods(since: Instant, now: Instant, period: Duration) -> (u128, Duration) {
    let period_ns = period.as_nanos().max(1);
    let periods = now.saturating_duration_since(since).as_nanos() / period_ns;
    let span = periods.saturating_mul(period_ns).min(u64::MAX as u128) as u64;
    (periods, Duration::from_nanos(span))
}

/// Proof of admission. Dropping it returns a concurrency slot, if it holds one.
#[derive(Debug)]
pub struct RateLimitLease {
    _permit: Option<OwnedSemaphorePermit>,
}

#[derive(Debug)]
enum Policy {
    FixedWindow(Mutex<FixedWindow>),
    SlidingWindow(Mutex<SlidingWindow>),
    TokenBucket(Mutex<TokenBucket>),
    Concurrency(ConcurrencyLimiter),
}

// == Rate Limiter ==
/// A single named limiter.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    policy: Policy,
}

impl RateLimiter {
    pub fn fixed_window(name: impl Into<String>, permit_limit: u32, window: Duration) -> Self {
        Self {
            name: name.into(),
            policy: Policy::FixedWindow(Mutex::new(FixedWindow::new(
                permit_limit,
                window,
                Instant::now(),
            ))),
        }
    }

    pub fn sliding_window(
        name: impl Into<String>,
        permit_limit: u32,
        window: Duration,
        segments_per_window: u32,
    ) -> Self {
        Self {
            name: name.into(),
            policy: Policy::SlidingWindow(Mutex::new(SlidingWindow::new(
                permit_limit,
                window,
                segments_per_window,
                Instant::now(),
            ))),
        }
    }

    pub fn token_bucket(
        name: impl Into<String>,
        token_limit: u32,
        tokens_per_period: u32,
        period: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            policy: Policy::TokenBucket(Mutex::new(TokenBucket::new(
                token_limit,
                tokens_per_period,
                period,
                Instant::now(),
            ))),
        }
    }

    pub fn concurrency(name: impl Into<String>, permit_limit: u32) -> Self {
        Self {
            name: name.into(),
            policy: Policy::Concurrency(ConcurrencyLimiter::new(permit_limit)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn try_acquire(&self) -> Option<RateLimitLease> {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> Option<RateLimitLease> {
        let admitted = match &self.policy {
            Policy::FixedWindow(w) => lock(w).try_acquire_at(now),
            Policy::SlidingWindow(w) => lock(w).try_acquire_at(now),
            Policy::TokenBucket(b) => lock(b).try_acquire_at(now),
            Policy::Concurrency(c) => {
                return c.try_acquire().map(|permit| RateLimitLease {
                    _permit: Some(permit),
                })
            }
        };
        admitted.then_some(RateLimitLease { _permit: None })
    }

    /// Advances windows, segments and buckets to the present. Acquisition
    /// does the same lazily, so calling this is optional and idempotent.
    pub fn replenish(&self) {
        let now = Instant::now();
        match &self.policy {
            Policy::FixedWindow(w) => lock(w).replenish_at(now),
            Policy::SlidingWindow(w) => lock(w).replenish_at(now),
            Policy::TokenBucket(b) => lock(b).replenish_at(now),
            Policy::Concurrency(_) => {}
        }
    }

    /// Permits that could be granted right now.
    pub fn available(&self) -> usize {
        match &self.policy {
            Policy::FixedWindow(w) => lock(w).available() as usize,
            Policy::SlidingWindow(w) => lock(w).available() as usize,
            Policy::TokenBucket(b) => lock(b).available() as usize,
            Policy::Concurrency(c) => c.available(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// == Route Group ==
/// The ordered policies applied to one route group.
#[derive(Debug, Clone, Default)]
pub struct RateLimitGroup {
    limiters: Vec<Arc<RateLimiter>>,
}

impl RateLimitGroup {
    pub fn new(limiters: Vec<Arc<RateLimiter>>) -> Self {
        Self { limiters }
    }

    /// Acquires every policy in order. On rejection, returns the rejecting
    /// policy's name; leases already taken are dropped and released.
    pub fn try_acquire(&self) -> Result<Vec<RateLimitLease>, &str> {
        let mut leases = Vec::with_capacity(self.limiters.len());
        for limiter in &self.limiters {
            match limiter.try_acquire() {
                Some(lease) => leases.push(lease),
                None => return Err(limiter.name()),
            }
        }
        Ok(leases)
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    pub fn policy_names(&self) -> Vec<&str> {
        self.limiters.iter().map(|l| l.name()).collect()
    }
}

// == Route Table ==
/// Route groups by path prefix. A prefix matches itself and everything
/// below it (`/posts` matches `/posts/1` but not `/postscript`).
#[derive(Debug, Clone, Default)]
pub struct RateLimitRoutes {
    routes: Vec<(String, RateLimitGroup)>,
}

impl RateLimitRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, prefix: impl Into<String>, group: RateLimitGroup) -> Self {
        self.routes.push((prefix.into(), group));
        self
    }

    /// The group for `path`, if any. The first matching prefix wins.
    pub fn group_for(&self, path: &str) -> Option<&RateLimitGroup> {
        self.routes
            .iter()
            .find(|(prefix, _)| {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .map(|(_, group)| group)
    }
}

// == Registry ==
/// All configured limiters by policy name. Groups naming the same policy
/// share its state.
#[derive(Debug, Clone, Default)]
pub struct RateLimiterRegistry {
    limiters: HashMap<String, Arc<RateLimiter>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the four standard policies.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let mut registry = Self::new();
        registry.register(RateLimiter::fixed_window(
            FIXED_WINDOW,
            config.permit_limit,
            config.window,
        ));
        registry.register(RateLimiter::sliding_window(
            SLIDING_WINDOW,
            config.permit_limit,
            config.window,
            config.segments_per_window,
        ));
        registry.register(RateLimiter::token_bucket(
            TOKEN_BUCKET,
            config.token_limit,
            config.tokens_per_period,
            config.replenishment_period,
        ));
        registry.register(RateLimiter::concurrency(CONCURRENCY, config.permit_limit));
        registry
    }

    pub fn register(&mut self, limiter: RateLimiter) {
        self.limiters
            .insert(limiter.name().to_string(), Arc::new(limiter));
    }

    pub fn get(&self, name: &str) -> Option<Arc<RateLimiter>> {
        self.limiters.get(name).cloned()
    }

    /// Builds a group from policy names. Unknown names are logged and skipped.
    pub fn group<S: AsRef<str>>(&self, names: &[S]) -> RateLimitGroup {
        let limiters = names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let limiter = self.get(name);
                if limiter.is_none() {
                    warn!(policy = name, "Unknown rate limit policy ignored");
                }
                limiter
            })
            .collect();
        RateLimitGroup::new(limiters)
    }

    pub fn replenish_all(&self) {
        for limiter in self.limiters.values() {
            limiter.replenish();
        }
    }
}
