//! Queue Statistics Module
//!
//! Per-queue counters and the serializable snapshots built from them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::health::ratio;

// == Queue Counters ==
/// Mutable counters kept under a queue's lock.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueueCounters {
    total: u64,
    completed: u64,
    failed: u64,
    avg_wait_ms: f64,
    avg_execution_ms: f64,
}

impl QueueCounters {
    pub(crate) fn record_admitted(&mut self) {
        self.total += 1;
    }

    /// Folds one successful task into the running means.
    pub(crate) fn record_completed(&mut self, wait: Duration, execution: Duration) {
        self.completed += 1;
        let n = self.completed as f64;
        self.avg_wait_ms += (as_millis(wait) - self.avg_wait_ms) / n;
        self.avg_execution_ms += (as_millis(execution) - self.avg_execution_ms) / n;
    }

    pub(crate) fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub(crate) fn snapshot(&self, pending: usize, running: usize) -> QueueStats {
        QueueStats {
            total: self.total,
            completed: self.completed,
            failed: self.failed,
            pending,
            running,
            avg_wait_time: self.avg_wait_ms,
            avg_execution_time: self.avg_execution_ms,
        }
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

// == Queue Stats ==
/// Point-in-time statistics for one queue, or all queues combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Tasks admitted
    pub total: u64,
    /// Tasks that resolved successfully
    pub completed: u64,
    /// Tasks that exhausted their attempts
    pub failed: u64,
    /// Tasks waiting to start
    pub pending: usize,
    /// Tasks executing now
    pub running: usize,
    /// Mean time from admission to first start of completed tasks, in ms
    pub avg_wait_time: f64,
    /// Mean duration of the successful attempt of completed tasks, in ms
    pub avg_execution_time: f64,
}

impl QueueStats {
    /// failed / total, 0.0 before any admission.
    pub fn failure_ratio(&self) -> f64 {
        ratio(self.failed, self.total)
    }

    /// Sums counts across queues; averages are weighted by `completed`.
    pub(crate) fn combine<'a>(all: impl IntoIterator<Item = &'a QueueStats>) -> QueueStats {
        let mut global = QueueStats::default();
        let mut wait_sum = 0.0;
        let mut execution_sum = 0.0;

        for stats in all {
            global.total += stats.total;
            global.completed += stats.completed;
            global.failed += stats.failed;
            global.pending += stats.pending;
            global.running += stats.running;
            wait_sum += stats.avg_wait_time * stats.completed as f64;
            execution_sum += stats.avg_execution_time * stats.completed as f64;
        }

        if global.completed > 0 {
            global.avg_wait_time = wait_sum / global.completed as f64;
            global.avg_execution_time = execution_sum / global.completed as f64;
        }
        global
    }
}

// == Manager Stats ==
/// Statistics for every queue a manager owns, plus their combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagerStats {
    pub global: QueueStats,
    pub queues: BTreeMap<String, QueueStats>,
}
