//! taskcache - In-process task queues and result cache
//!
//! Provides named priority queues with bounded concurrency, timeouts and
//! retries, plus a TTL cache with batch LRU eviction.

pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod queue;
pub mod tasks;

pub use cache::{CacheStats, CacheStore, SharedCache, TtlTable};
pub use config::{CacheConfig, Config, ManagerConfig, QueueConfig};
pub use error::{QueueError, Result};
pub use health::HealthReport;
pub use queue::{ManagerStats, QueueManager, QueueStats, TaskHandle, TaskId, TaskOptions};
pub use tasks::spawn_cleanup_task;
