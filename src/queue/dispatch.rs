//! Queue Dispatch Module
//!
//! One named queue: priority admission, bounded dispatch, and execution with
//! timeout and linear retry backoff.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::queue::stats::{QueueCounters, QueueStats};
use crate::queue::task::{Task, TaskHandle, TaskId, TaskOptions};

// == Queue State ==
/// Everything guarded by the queue's single lock.
#[derive(Debug, Default)]
struct QueueState {
    /// Sorted by priority descending, arrival order within a priority
    pending: VecDeque<Task>,
    running: HashSet<TaskId>,
    counters: QueueCounters,
    /// Bumped on every clear; retries from an older epoch are rejected
    epoch: u64,
    closed: bool,
}

/// Inserts after every queued task of equal or higher priority.
fn insert_by_priority(pending: &mut VecDeque<Task>, task: Task) {
    let priority = task.priority;
    let index = pending.partition_point(|queued| queued.priority >= priority);
    pending.insert(index, task);
}

// == Queue ==
/// A named admission point with its own concurrency bound and backlog.
#[derive(Debug)]
pub(crate) struct Queue {
    name: String,
    config: QueueConfig,
    retry_base_delay: Duration,
    state: Mutex<QueueState>,
}

impl Queue {
    pub(crate) fn new(name: String, config: QueueConfig, retry_base_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            config,
            retry_base_delay,
            state: Mutex::new(QueueState::default()),
        })
    }

    // == Admit ==
    /// Admits a task and schedules a dispatch pass on the current runtime.
    pub(crate) fn admit<T, F, Fut>(self: &Arc<Self>, work: F, options: TaskOptions) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let handle = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(QueueError::ShuttingDown);
            }
            if state.pending.len() >= self.config.max_size {
                warn!("Queue '{}' full, rejecting task", self.name);
                return Err(QueueError::QueueFull {
                    name: self.name.clone(),
                    capacity: self.config.max_size,
                });
            }

            let (task, handle) = Task::new(
                work,
                options.priority,
                options.timeout.unwrap_or(self.config.timeout),
                options.retry_attempts.unwrap_or(self.config.retry_attempts),
                state.epoch,
            );
            state.counters.record_admitted();
            insert_by_priority(&mut state.pending, task);
            handle
        };

        debug!(
            queue = %self.name,
            task = %handle.id(),
            priority = options.priority,
            "Task admitted"
        );

        let queue = Arc::clone(self);
        tokio::spawn(async move { queue.dispatch() });
        Ok(handle)
    }

    // == Dispatch ==
    /// Moves pending tasks to running until the concurrency bound is reached.
    pub(crate) fn dispatch(self: &Arc<Self>) {
        let ready: Vec<Task> = {
            let mut state = self.state.lock();
            let mut ready = Vec::new();
            while state.running.len() < self.config.max_concurrent {
                let Some(mut task) = state.pending.pop_front() else {
                    break;
                };
                task.started_at.get_or_insert_with(Instant::now);
                state.running.insert(task.id);
                ready.push(task);
            }
            ready
        };

        for task in ready {
            let queue = Arc::clone(self);
            tokio::spawn(queue.execute(task));
        }
    }

    // == Execute ==
    /// Runs one attempt and settles, retries, or fails the task.
    async fn execute(self: Arc<Self>, mut task: Task) {
        task.attempts += 1;
        let started = Instant::now();

        let failure = match time::timeout(task.timeout, task.run_attempt()).await {
            Ok(Ok(resolve)) => {
                let execution = started.elapsed();
                let wait = task
                    .started_at
                    .unwrap_or(started)
                    .saturating_duration_since(task.created_at);
                {
                    let mut state = self.state.lock();
                    state.running.remove(&task.id);
                    state.counters.record_completed(wait, execution);
                }
                debug!(
                    queue = %self.name,
                    task = %task.id,
                    attempts = task.attempts,
                    "Task completed in {:?}",
                    execution
                );
                resolve();
                self.dispatch();
                return;
            }
            Ok(Err(err)) => QueueError::Task(err),
            Err(_) => QueueError::TaskTimeout(task.timeout),
        };

        self.state.lock().running.remove(&task.id);

        if task.attempts <= task.max_retries {
            let delay = self.retry_base_delay * task.attempts;
            warn!(
                queue = %self.name,
                task = %task.id,
                attempt = task.attempts,
                "Task attempt failed, retrying in {:?}: {}",
                delay,
                failure
            );
            self.dispatch();
            time::sleep(delay).await;
            self.requeue(task);
            return;
        }

        self.state.lock().counters.record_failed();
        warn!(
            queue = %self.name,
            task = %task.id,
            attempts = task.attempts,
            "Task failed: {}",
            failure
        );

        let attempts = task.attempts;
        task.reject(QueueError::RetryExhausted {
            attempts,
            last: Box::new(failure),
        });
        self.dispatch();
    }

    /// Puts a task back after its backoff, unless the queue was cleared or
    /// closed in the meantime.
    fn requeue(self: &Arc<Self>, task: Task) {
        let mut state = self.state.lock();
        let rejection = if state.closed {
            Some(QueueError::ShuttingDown)
        } else if state.epoch != task.epoch {
            Some(QueueError::QueueCleared(self.name.clone()))
        } else {
            None
        };

        match rejection {
            Some(err) => {
                drop(state);
                debug!(queue = %self.name, task = %task.id, "Dropping retry: {}", err);
                task.reject(err);
            }
            None => {
                insert_by_priority(&mut state.pending, task);
                drop(state);
                self.dispatch();
            }
        }
    }

    // == Clear ==
    /// Rejects every pending task with `QueueCleared`. Running tasks continue.
    pub(crate) fn clear(&self) -> usize {
        let count = self.drain_pending(false, || QueueError::QueueCleared(self.name.clone()));
        info!("Queue '{}' cleared, rejected {} pending tasks", self.name, count);
        count
    }

    /// Rejects every pending task with `ShuttingDown` and refuses new admissions.
    pub(crate) fn close(&self) -> usize {
        self.drain_pending(true, || QueueError::ShuttingDown)
    }

    fn drain_pending(&self, close: bool, error: impl Fn() -> QueueError) -> usize {
        let drained: Vec<Task> = {
            let mut state = self.state.lock();
            state.closed |= close;
            state.epoch += 1;
            state.pending.drain(..).collect()
        };

        let count = drained.len();
        for task in drained {
            task.reject(error());
        }
        count
    }

    // == Stats ==
    pub(crate) fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        state.counters.snapshot(state.pending.len(), state.running.len())
    }
}
