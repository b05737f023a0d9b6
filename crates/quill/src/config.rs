use std::{env, str::FromStr, time::Duration};

use quill_auth::AuthConfig;
use quill_core::cache::ReconnectPolicy;

use crate::cache::CacheSettings;

/// Which cache store backs the cache client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
    Disabled,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(format!("unknown cache backend: {other}")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`. Needed before tracing is set up, so it stands
    /// apart from [`Config::from_env`].
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_backend: CacheBackend,
    /// Redis connection URL (default: "redis://localhost:6379")
    pub redis_url: String,
    /// TTL for cached responses in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of entries in the memory backend (default: 10,000)
    pub cache_max_entries: usize,
    /// TTL for cached users in seconds (default: 3600)
    pub user_cache_ttl_seconds: u64,
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub auth: AuthConfig,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_millis(name: &str, default: u64) -> Duration {
    Duration::from_millis(parse_var(name, default))
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_BACKEND` - `redis`, `memory` or `disabled` (default: redis)
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `CACHE_TTL_SECONDS` - Response cache TTL (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Memory backend capacity (default: 10,000)
    /// - `USER_CACHE_TTL_SECONDS` - User cache TTL (default: 3600)
    /// - `CACHE_BREAKER_THRESHOLD` - Failures before the breaker opens (default: 5)
    /// - `CACHE_BREAKER_COOLDOWN_MS` - Breaker cooldown (default: 30,000)
    /// - `CACHE_MAX_RECONNECT_ATTEMPTS` - Reconnect attempts (default: 10)
    /// - `CACHE_RECONNECT_BASE_MS` - First reconnect delay (default: 100)
    /// - `CACHE_RECONNECT_MAX_MS` - Reconnect delay cap (default: 3,000)
    /// - `CACHE_CONNECT_TIMEOUT_MS` - Connect timeout (default: 10,000)
    /// - `CACHE_OPERATION_TIMEOUT_MS` - Per-operation timeout (default: 2,000)
    /// - `JWT_SECRET`, `JWT_EXPIRY_HOURS` - see [`AuthConfig::from_env`]
    pub fn from_env() -> Self {
        let cache_backend = match env::var("CACHE_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to the redis cache backend");
                CacheBackend::Redis
            }),
            Err(_) => CacheBackend::Redis,
        };

        Self {
            cache_backend,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            cache_ttl_seconds: parse_var("CACHE_TTL_SECONDS", 300),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES", 10_000),
            user_cache_ttl_seconds: parse_var("USER_CACHE_TTL_SECONDS", 3600),
            breaker_threshold: parse_var("CACHE_BREAKER_THRESHOLD", 5),
            breaker_cooldown: parse_millis("CACHE_BREAKER_COOLDOWN_MS", 30_000),
            max_reconnect_attempts: parse_var("CACHE_MAX_RECONNECT_ATTEMPTS", 10),
            reconnect_base_delay: parse_millis("CACHE_RECONNECT_BASE_MS", 100),
            reconnect_max_delay: parse_millis("CACHE_RECONNECT_MAX_MS", 3_000),
            connect_timeout: parse_millis("CACHE_CONNECT_TIMEOUT_MS", 10_000),
            operation_timeout: parse_millis("CACHE_OPERATION_TIMEOUT_MS", 2_000),
            auth: AuthConfig::from_env(),
        }
    }

    /// Settings for the cache client.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            reconnect: ReconnectPolicy::new(
                self.reconnect_base_delay,
                self.reconnect_max_delay,
                self.max_reconnect_attempts,
            ),
            breaker_threshold: self.breaker_threshold,
            breaker_cooldown: self.breaker_cooldown,
            connect_timeout: self.connect_timeout,
            operation_timeout: self.operation_timeout,
        }
    }
}

impl Default for Config {
    /// Defaults without reading the environment, with the memory backend.
    fn default() -> Self {
        Self {
            cache_backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            cache_ttl_seconds: 300,
            cache_max_entries: 10_000,
            user_cache_ttl_seconds: 3600,
            breaker_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
            max_reconnect_attempts: 10,
            reconnect_base_delay: Duration::from_millis(100),
            reconnect_max_delay: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(2),
            auth: AuthConfig::default(),
        }
    }
}
