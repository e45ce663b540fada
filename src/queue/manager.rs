//! Queue Manager Module
//!
//! Registry of named queues: creation, admission, stats, health, clearing, shutdown.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::config::{ManagerConfig, QueueConfig};
use crate::error::{QueueError, Result};
use crate::health::HealthReport;
use crate::queue::dispatch::Queue;
use crate::queue::stats::{ManagerStats, QueueStats};
use crate::queue::task::{TaskHandle, TaskOptions};

struct ManagerInner {
    queues: RwLock<HashMap<String, Arc<Queue>>>,
    config: ManagerConfig,
    shutting_down: AtomicBool,
}

// == Queue Manager ==
/// Owns named queues. Cloning yields another handle to the same queues.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<ManagerInner>,
}

impl QueueManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                queues: RwLock::new(HashMap::new()),
                config,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    // == Create Queue ==
    /// Registers a new queue. Queues are never created implicitly.
    pub fn create_queue(&self, name: impl Into<String>, config: QueueConfig) -> Result<()> {
        let name = name.into();
        if self.is_shutting_down() {
            return Err(QueueError::ShuttingDown);
        }
        if config.max_concurrent == 0 {
            return Err(QueueError::InvalidConfig(format!(
                "queue '{}' needs max_concurrent >= 1",
                name
            )));
        }

        let mut queues = self.inner.queues.write();
        // Re-checked under the lock so a concurrent shutdown sees every queue
        if self.is_shutting_down() {
            return Err(QueueError::ShuttingDown);
        }
        if queues.contains_key(&name) {
            return Err(QueueError::DuplicateQueue(name));
        }

        info!(
            "Queue '{}' created: max_concurrent={}, max_size={}, timeout={:?}, retry_attempts={}",
            name, config.max_concurrent, config.max_size, config.timeout, config.retry_attempts
        );
        let queue = Queue::new(name.clone(), config, self.inner.config.retry_base_delay);
        queues.insert(name, queue);
        Ok(())
    }

    // == Add Task ==
    /// Submits `work` to the named queue.
    ///
    /// Admission errors (`QueueNotFound`, `QueueFull`, `ShuttingDown`) are
    /// returned immediately; the handle resolves with the work's value or its
    /// terminal error. `work` is invoked once per attempt.
    ///
    /// Must be called within a Tokio runtime.
    pub fn add_task<T, F, Fut>(
        &self,
        queue_name: &str,
        work: F,
        options: TaskOptions,
    ) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if self.is_shutting_down() {
            return Err(QueueError::ShuttingDown);
        }
        self.queue(queue_name)?.admit(work, options)
    }

    // == Stats ==
    /// Per-queue and combined statistics. Pure read.
    pub fn stats(&self) -> ManagerStats {
        let queues: BTreeMap<String, QueueStats> = self
            .inner
            .queues
            .read()
            .iter()
            .map(|(name, queue)| (name.clone(), queue.stats()))
            .collect();
        let global = QueueStats::combine(queues.values());
        ManagerStats { global, queues }
    }

    pub fn queue_stats(&self, name: &str) -> Option<QueueStats> {
        self.queue(name).ok().map(|queue| queue.stats())
    }

    // == Health ==
    /// Derives advisory issues from `stats()`. Never fails, never mutates.
    pub fn check_health(&self) -> HealthReport {
        let stats = self.stats();
        let thresholds = &self.inner.config.health;
        let global = &stats.global;
        let mut issues = Vec::new();

        if global.failure_ratio() > thresholds.max_failure_ratio {
            issues.push(format!(
                "High failure rate: {:.1}% ({} of {} tasks)",
                global.failure_ratio() * 100.0,
                global.failed,
                global.total
            ));
        }
        if global.avg_wait_time > thresholds.max_avg_wait_ms {
            issues.push(format!(
                "High average wait time: {:.0}ms",
                global.avg_wait_time
            ));
        }
        if global.pending > thresholds.max_total_pending {
            issues.push(format!("Large backlog: {} pending tasks", global.pending));
        }

        for (name, queue) in &stats.queues {
            if queue.pending > thresholds.max_queue_pending {
                issues.push(format!(
                    "Queue '{}' backlog: {} pending tasks",
                    name, queue.pending
                ));
            }
            if queue.failure_ratio() > thresholds.max_queue_failure_ratio {
                issues.push(format!(
                    "Queue '{}' failure rate: {:.1}%",
                    name,
                    queue.failure_ratio() * 100.0
                ));
            }
        }

        HealthReport::from_issues(issues)
    }

    // == Clear Queue ==
    /// Rejects every pending task of the named queue. Returns whether the queue exists.
    pub fn clear_queue(&self, name: &str) -> bool {
        match self.queue(name) {
            Ok(queue) => {
                queue.clear();
                true
            }
            Err(_) => false,
        }
    }

    // == Shutdown ==
    /// Rejects all pending work and refuses further admissions.
    pub fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let queues: Vec<Arc<Queue>> = self.inner.queues.read().values().cloned().collect();
        let rejected: usize = queues.iter().map(|queue| queue.close()).sum();
        info!(
            "Queue manager shut down: {} queues closed, {} pending tasks rejected",
            queues.len(),
            rejected
        );
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.inner.queues.read().contains_key(name)
    }

    /// Names of all registered queues, sorted.
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.queues.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn queue(&self, name: &str) -> Result<Arc<Queue>> {
        self.inner
            .queues
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueManager")
            .field("queues", &self.queue_names())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
