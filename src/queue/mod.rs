//! Queue Module
//!
//! Named priority queues with bounded concurrency, per-attempt timeouts and
//! linear retry backoff.
//!
//! # Lifecycle of a task
//! 1. `QueueManager::add_task` admits it into the queue's pending list, or
//!    fails at once with `QueueFull`
//! 2. A dispatch pass moves it to running when a slot is free
//! 3. Each attempt races the work against the task's timeout
//! 4. Failed attempts are requeued after `retry_base_delay * attempts`
//! 5. The `TaskHandle` resolves once, with the value or the terminal error

mod dispatch;
mod manager;
mod stats;
mod task;

pub use manager::QueueManager;
pub use stats::{ManagerStats, QueueStats};
pub use task::{TaskHandle, TaskId, TaskOptions};
