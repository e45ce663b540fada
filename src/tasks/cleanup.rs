//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Shortest sweep period; zero would stall the ticker
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(1);

// == Cleanup Handle ==
/// Owns a running cleanup task. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct CleanupHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Signals the task to stop and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The first sweep runs one `interval` after spawning. Each sweep takes the
/// write lock on the store, the same lock `get` and `set` use. Intervals
/// below `MIN_CLEANUP_INTERVAL` are raised to it.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(CacheStore::new(1000, Duration::from_secs(300))));
/// let cleanup = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup.stop().await;
/// ```
pub fn spawn_cleanup_task<V>(cache: Arc<RwLock<CacheStore<V>>>, interval: Duration) -> CleanupHandle
where
    V: Send + Sync + 'static,
{
    if interval < MIN_CLEANUP_INTERVAL {
        warn!(
            "Cleanup interval {:?} too short, using {:?}",
            interval, MIN_CLEANUP_INTERVAL
        );
    }
    let interval = interval.max(MIN_CLEANUP_INTERVAL);
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    info!("TTL cleanup task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = {
                        let mut cache_guard = cache.write().await;
                        cache_guard.cleanup_expired()
                    };

                    if removed > 0 {
                        info!("TTL cleanup: removed {} expired entries", removed);
                    } else {
                        debug!("TTL cleanup: no expired entries found");
                    }
                }
            }
        }
    });

    CleanupHandle {
        stop: Some(stop_tx),
        task,
    }
}
