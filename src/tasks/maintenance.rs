//! Maintenance Task
//!
//! Periodic housekeeping that runs independently of request handling.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::antiforgery::Antiforgery;
use crate::cache::HybridCache;
use crate::rate_limit::RateLimiterRegistry;

/// Spawns the maintenance loop. Each run purges expired cache entries,
/// advances rate limit windows, segments and token buckets, and drops expired
/// anti-forgery sessions.
///
/// # Returns
/// A JoinHandle for the spawned task, which is aborted during graceful
/// shutdown.
pub fn spawn_maintenance_task(
    cache: HybridCache,
    limiters: RateLimiterRegistry,
    antiforgery: Arc<Antiforgery>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting maintenance task");

        loop {
            tokio::time::sleep(interval).await;

            let expired = cache.cleanup_expired().await;
            limiters.replenish_all();
            let sessions = antiforgery.purge_expired();

            if expired > 0 || sessions > 0 {
                info!(expired, sessions, "Maintenance: removed expired entries");
            } else {
                debug!("Maintenance: nothing expired");
            }
        }
    })
}
