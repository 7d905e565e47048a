//! Health Module
//!
//! In-process health checks reported by `GET /healthCheck`, and the outbound
//! client `GET /health` uses to probe that endpoint.

mod client;

use std::sync::Arc;

use axum::async_trait;
use tracing::warn;

use crate::cache::HybridCache;
use crate::models::{HealthCheckEntry, HealthReport};
use crate::store::PostStore;

pub use client::{HealthClient, HealthClientError};

/// Outcome of one check. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub status: HealthStatus,
    pub description: String,
}

impl CheckResult {
    pub fn healthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: description.into(),
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: description.into(),
        }
    }
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> CheckResult;
}

// == Checks ==
/// Healthy while the post store holds at least one record.
pub struct DatabaseCheck {
    store: Arc<PostStore>,
}

impl DatabaseCheck {
    pub fn new(store: Arc<PostStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthCheck for DatabaseCheck {
    fn name(&self) -> &str {
        "Database"
    }

    async fn check(&self) -> CheckResult {
        match self.store.len().await {
            0 => CheckResult::unhealthy("The database is unhealthy."),
            n => CheckResult::healthy(format!("{n} Record found!")),
        }
    }
}

/// Reports cache occupancy and hit rate. Never unhealthy.
pub struct CacheCheck {
    cache: HybridCache,
}

impl CacheCheck {
    pub fn new(cache: HybridCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HealthCheck for CacheCheck {
    fn name(&self) -> &str {
        "Cache"
    }

    async fn check(&self) -> CheckResult {
        let stats = self.cache.stats().await;
        CheckResult::healthy(format!(
            "{} entries, hit rate {:.1}%",
            stats.total_entries,
            stats.hit_rate() * 100.0
        ))
    }
}

// == Service ==
#[derive(Clone, Default)]
pub struct HealthService {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, check: impl HealthCheck + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Runs every check in registration order. The aggregate status is the
    /// worst individual status.
    pub async fn run(&self) -> (HealthStatus, HealthReport) {
        let mut overall = HealthStatus::Healthy;
        let mut checks = Vec::with_capacity(self.checks.len());

        for check in &self.checks {
            let result = check.check().await;
            if result.status != HealthStatus::Healthy {
                warn!(check = check.name(), status = result.status.as_str(), "Health check not healthy");
            }
            overall = overall.max(result.status);
            checks.push(HealthCheckEntry {
                name: check.name().to_string(),
                status: result.status.as_str().to_string(),
                description: result.description,
            });
        }

        let report = HealthReport {
            api_status: overall.as_str().to_string(),
            checks,
            checked_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        (overall, report)
    }
}
