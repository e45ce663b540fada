//! Shared Cache Module
//!
//! Thread-safe handle around a `CacheStore` that owns its expiry sweeper.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::{CacheStats, CacheStore};
use crate::config::CacheConfig;
use crate::health::HealthReport;
use crate::tasks::{spawn_cleanup_task, CleanupHandle};

// == Shared Cache ==
/// A cache store behind a read-write lock plus its background sweeper.
///
/// `get` takes the write lock because it refreshes recency and counters;
/// pure reads (`contains`, `stats`, `check_health`) take the read lock.
#[derive(Debug)]
pub struct SharedCache<V = Value> {
    store: Arc<RwLock<CacheStore<V>>>,
    cleanup: Mutex<Option<CleanupHandle>>,
}

impl<V: Serialize + Send + Sync + 'static> SharedCache<V> {
    /// Builds a store from `config` and starts sweeping at
    /// `config.cleanup_interval`. Must be called within a Tokio runtime.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(CacheStore::from_config(config), config.cleanup_interval)
    }
}

impl<V: Send + Sync + 'static> SharedCache<V> {
    /// Wraps `store` and starts the sweeper. Must be called within a Tokio runtime.
    pub fn new(store: CacheStore<V>, cleanup_interval: Duration) -> Self {
        let store = Arc::new(RwLock::new(store));
        let cleanup = spawn_cleanup_task(store.clone(), cleanup_interval);
        Self {
            store,
            cleanup: Mutex::new(Some(cleanup)),
        }
    }

    /// Wraps `store` without a sweeper; expired entries are only removed on lookup.
    pub fn without_cleanup(store: CacheStore<V>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            cleanup: Mutex::new(None),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.store.write().await.get(key)
    }

    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.store.write().await.set(key, value);
    }

    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.store.write().await.set_with_ttl(key, value, ttl);
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.store.read().await.contains(key)
    }

    pub async fn categorize(&self, value: &V) -> String {
        self.store.read().await.categorize(value)
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn check_health(&self) -> HealthReport {
        self.store.read().await.check_health()
    }

    /// Stops the sweeper. Entries stay readable afterwards.
    pub async fn shutdown(&self) {
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup.stop().await;
        }
    }
}
