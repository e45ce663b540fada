//! Configuration Module
//!
//! Handles loading cache and queue configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Reads and parses an environment variable, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// == Cache Config ==
/// Cache store parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL used by `set` when no explicit TTL is given
    pub default_ttl: Duration,
    /// Interval between background expiry sweeps
    pub cleanup_interval: Duration,
    /// Estimated memory usage above which health checks report an issue
    pub memory_soft_limit: usize,
}

impl CacheConfig {
    /// Loads cache settings from the environment.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `CACHE_MEMORY_SOFT_LIMIT` - Soft memory ceiling in bytes (default: 50 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.max_entries),
            default_ttl: Duration::from_secs(env_or(
                "CACHE_DEFAULT_TTL",
                defaults.default_ttl.as_secs(),
            )),
            cleanup_interval: Duration::from_secs(env_or(
                "CACHE_CLEANUP_INTERVAL",
                defaults.cleanup_interval.as_secs(),
            )),
            memory_soft_limit: env_or("CACHE_MEMORY_SOFT_LIMIT", defaults.memory_soft_limit),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
            memory_soft_limit: 50 * 1024 * 1024,
        }
    }
}

// == Queue Config ==
/// Per-queue limits, fixed when the queue is created.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Maximum number of tasks executing at once
    pub max_concurrent: usize,
    /// Maximum number of pending tasks accepted
    pub max_size: usize,
    /// Default per-attempt timeout
    pub timeout: Duration,
    /// Default number of retries after the first attempt
    pub retry_attempts: u32,
}

impl QueueConfig {
    /// Loads queue defaults from the environment.
    ///
    /// # Environment Variables
    /// - `QUEUE_MAX_CONCURRENT` - Concurrent tasks per queue (default: 3)
    /// - `QUEUE_MAX_SIZE` - Pending backlog per queue (default: 100)
    /// - `QUEUE_TIMEOUT` - Attempt timeout in seconds (default: 30)
    /// - `QUEUE_RETRY_ATTEMPTS` - Retries after the first attempt (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent: env_or("QUEUE_MAX_CONCURRENT", defaults.max_concurrent),
            max_size: env_or("QUEUE_MAX_SIZE", defaults.max_size),
            timeout: Duration::from_secs(env_or("QUEUE_TIMEOUT", defaults.timeout.as_secs())),
            retry_attempts: env_or("QUEUE_RETRY_ATTEMPTS", defaults.retry_attempts),
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_size: 100,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
        }
    }
}

// == Health Thresholds ==
/// Limits above which the queue manager's health check reports an issue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueHealthThresholds {
    pub max_failure_ratio: f64,
    pub max_avg_wait_ms: f64,
    pub max_total_pending: usize,
    pub max_queue_pending: usize,
    pub max_queue_failure_ratio: f64,
}

impl Default for QueueHealthThresholds {
    fn default() -> Self {
        Self {
            max_failure_ratio: 0.10,
            max_avg_wait_ms: 5000.0,
            max_total_pending: 50,
            max_queue_pending: 20,
            max_queue_failure_ratio: 0.20,
        }
    }
}

// == Manager Config ==
/// Settings shared by every queue a manager owns.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Base of the linear retry backoff (`base * attempts`)
    pub retry_base_delay: Duration,
    pub health: QueueHealthThresholds,
}

impl ManagerConfig {
    /// Loads manager settings from the environment.
    ///
    /// # Environment Variables
    /// - `QUEUE_RETRY_DELAY_MS` - Backoff base in milliseconds (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            retry_base_delay: Duration::from_millis(env_or(
                "QUEUE_RETRY_DELAY_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )),
            health: defaults.health,
        }
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            retry_base_delay: Duration::from_millis(1000),
            health: QueueHealthThresholds::default(),
        }
    }
}

// == Config ==
/// Complete configuration for a cache plus queue manager setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub cache: CacheConfig,
    pub queue: QueueConfig,
    pub manager: ManagerConfig,
}

impl Config {
    /// Creates a new Config by loading every section from the environment.
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            queue: QueueConfig::from_env(),
            manager: ManagerConfig::from_env(),
        }
    }
}
