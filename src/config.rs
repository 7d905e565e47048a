//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.
//! Values are read once at startup and never change afterwards.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rand::RngCore;

/// Rate limiter parameters shared by the four named policies.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Permits per window (fixed/sliding) or concurrent permits (concurrency)
    pub permit_limit: u32,
    /// Window length for the fixed and sliding window policies
    pub window: Duration,
    /// Number of segments the sliding window is divided into
    pub segments_per_window: u32,
    /// Bucket capacity for the token bucket policy
    pub token_limit: u32,
    /// Tokens added every replenishment period
    pub tokens_per_period: u32,
    /// Token bucket replenishment period
    pub replenishment_period: Duration,
    /// Policies applied, in order, to the `/posts` group
    pub posts_policies: Vec<String>,
    /// Policies applied, in order, to the `/health` endpoint
    pub health_policies: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            permit_limit: 2,
            window: Duration::from_secs(5),
            segments_per_window: 2,
            token_limit: 2,
            tokens_per_period: 2,
            replenishment_period: Duration::from_secs(5),
            posts_policies: default_policies(),
            health_policies: default_policies(),
        }
    }
}

fn default_policies() -> Vec<String> {
    vec!["Concurrency".to_string(), "FixedWindow".to_string()]
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Deployment environment; anything but `development` enables HTTPS redirection
    pub environment: String,
    /// Public HTTP base URL (also an allowed CORS origin)
    pub http_url: String,
    /// Public HTTPS base URL (also an allowed CORS origin and redirect target)
    pub https_url: String,
    /// Base URL the `/health` endpoint probes
    pub health_base_url: String,
    /// Timeout for the outbound health probe
    pub health_timeout: Duration,
    /// Directory static assets are served from
    pub static_dir: String,
    /// Path prefix routed to the static asset directory
    pub static_prefix: String,
    /// Header carrying the anti-forgery request token
    pub antiforgery_header: String,
    /// Cookie carrying the anti-forgery session id
    pub antiforgery_cookie: String,
    /// Key used to sign anti-forgery request tokens
    pub antiforgery_secret: Vec<u8>,
    /// Lifetime of an anti-forgery session
    pub antiforgery_session_ttl: Duration,
    /// Most anti-forgery sessions kept at once; the oldest is evicted beyond it
    pub antiforgery_max_sessions: usize,
    /// Cache key for the full post list
    pub posts_cache_key: String,
    /// Cache key prefix for single-post lookups
    pub post_cache_key_prefix: String,
    /// Absolute expiration applied to every cache entry
    pub cache_expiration: Duration,
    /// Optional sliding expiration applied on top of the absolute one
    pub cache_sliding_expiration: Option<Duration>,
    /// Largest serialized value the cache accepts
    pub cache_max_payload_bytes: usize,
    /// Longest key the cache accepts
    pub cache_max_key_length: usize,
    /// Maximum number of cache entries before LRU eviction
    pub cache_max_entries: usize,
    /// Background maintenance interval
    pub maintenance_interval: Duration,
    /// Rate limiter policy parameters
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 5000)
    /// - `APP_ENV` - Deployment environment (default: development)
    /// - `HTTP_URL` / `HTTPS_URL` - Public base URLs
    /// - `HEALTH_BASE_URL` - Health probe target (default: `HTTP_URL`)
    /// - `AFT_HEADER_NAME` - Anti-forgery header (default: X-AFT-Value)
    /// - `AFT_SECRET` - Token signing key (default: random per process)
    /// - `AFT_MAX_SESSIONS` - Live anti-forgery sessions kept (default: 10000)
    /// - `CACHE_EXPIRATION_SECS` - Cache entry lifetime (default: 300)
    /// - `RATE_LIMIT_PERMITS` - Window and concurrency permits (default: 2)
    /// - `RATE_LIMIT_TOKEN_LIMIT` - Token bucket capacity (default: 2)
    /// - `POSTS_RATE_LIMIT_POLICIES` - Comma separated policy names
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let http_url = env::var("HTTP_URL").unwrap_or(defaults.http_url);

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            environment: env::var("APP_ENV").unwrap_or(defaults.environment),
            health_base_url: env::var("HEALTH_BASE_URL").unwrap_or_else(|_| http_url.clone()),
            http_url,
            https_url: env::var("HTTPS_URL").unwrap_or(defaults.https_url),
            health_timeout: Duration::from_secs(env_or("HEALTH_TIMEOUT_SECS", 5)),
            static_dir: env::var("STATIC_DIR").unwrap_or(defaults.static_dir),
            static_prefix: env::var("STATIC_PREFIX").unwrap_or(defaults.static_prefix),
            antiforgery_header: env::var("AFT_HEADER_NAME").unwrap_or(defaults.antiforgery_header),
            antiforgery_cookie: env::var("AFT_COOKIE_NAME").unwrap_or(defaults.antiforgery_cookie),
            antiforgery_secret: env::var("AFT_SECRET")
                .map(String::into_bytes)
                .unwrap_or(defaults.antiforgery_secret),
            antiforgery_session_ttl: Duration::from_secs(env_or("AFT_SESSION_TTL_SECS", 86_400)),
            antiforgery_max_sessions: env_or("AFT_MAX_SESSIONS", defaults.antiforgery_max_sessions),
            posts_cache_key: env::var("CACHE_POSTS_KEY").unwrap_or(defaults.posts_cache_key),
            post_cache_key_prefix: env::var("CACHE_POST_KEY_PREFIX")
                .unwrap_or(defaults.post_cache_key_prefix),
            cache_expiration: Duration::from_secs(env_or("CACHE_EXPIRATION_SECS", 300)),
            cache_sliding_expiration: env::var("CACHE_SLIDING_EXPIRATION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
            cache_max_payload_bytes: env_or("CACHE_MAX_PAYLOAD_BYTES", defaults.cache_max_payload_bytes),
            cache_max_key_length: env_or("CACHE_MAX_KEY_LENGTH", defaults.cache_max_key_length),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            maintenance_interval: Duration::from_secs(env_or("MAINTENANCE_INTERVAL_SECS", 1)),
            rate_limit: RateLimitConfig {
                permit_limit: env_or("RATE_LIMIT_PERMITS", 2),
                window: Duration::from_secs(env_or("RATE_LIMIT_WINDOW_SECS", 5)),
                segments_per_window: env_or("RATE_LIMIT_SEGMENTS", 2),
                token_limit: env_or("RATE_LIMIT_TOKEN_LIMIT", 2),
                tokens_per_period: env_or("RATE_LIMIT_TOKENS_PER_PERIOD", 2),
                replenishment_period: Duration::from_secs(env_or("RATE_LIMIT_REPLENISH_SECS", 5)),
                posts_policies: env_list("POSTS_RATE_LIMIT_POLICIES")
                    .unwrap_or(defaults.rate_limit.posts_policies),
                health_policies: env_list("HEALTH_RATE_LIMIT_POLICIES")
                    .unwrap_or(defaults.rate_limit.health_policies),
            },
        }
    }

    /// Returns true when running in the development environment.
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 5000,
            environment: "development".to_string(),
            http_url: "http://localhost:5000".to_string(),
            https_url: "https://localhost:5001".to_string(),
            health_base_url: "http://localhost:5000".to_string(),
            health_timeout: Duration::from_secs(5),
            static_dir: "wwwroot".to_string(),
            static_prefix: "/css".to_string(),
            antiforgery_header: "X-AFT-Value".to_string(),
            antiforgery_cookie: ".PostGuard.Antiforgery".to_string(),
            antiforgery_secret: random_secret(),
            antiforgery_session_ttl: Duration::from_secs(86_400),
            antiforgery_max_sessions: 10_000,
            posts_cache_key: "posts:all".to_string(),
            post_cache_key_prefix: "posts:".to_string(),
            cache_expiration: Duration::from_secs(300),
            cache_sliding_expiration: None,
            cache_max_payload_bytes: 1024 * 1024,
            cache_max_key_length: 1024,
            cache_max_entries: 1000,
            maintenance_interval: Duration::from_secs(1),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
