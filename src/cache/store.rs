//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with TTL expiration and batch LRU eviction.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EVICTION_DIVISOR, LOW_HIT_RATE, NEAR_CAPACITY};
use crate::config::CacheConfig;
use crate::health::HealthReport;

/// Strategy computing the approximate size of a value in bytes.
pub type SizeEstimator<V> = Arc<dyn Fn(&V) -> usize + Send + Sync>;

/// Strategy deriving the informational category tag of a value.
pub type Categorizer<V> = Arc<dyn Fn(&V) -> String + Send + Sync>;

// == Default Strategies ==
/// Estimates size as the length of the value's JSON serialization.
pub fn json_size<V: Serialize>(value: &V) -> usize {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len())
        .unwrap_or_else(|_| std::mem::size_of_val(value))
}

/// Categorizes a value by its JSON shape.
///
/// Objects carrying a string `"type"` field are tagged with that field.
pub fn json_category<V: Serialize>(value: &V) -> String {
    let kind = match serde_json::to_value(value) {
        Ok(Value::Object(map)) => {
            if let Some(tag) = map.get("type").and_then(Value::as_str) {
                return tag.to_string();
            }
            "object"
        }
        Ok(Value::Array(_)) => "array",
        Ok(Value::String(_)) => "string",
        Ok(Value::Number(_)) => "number",
        Ok(Value::Bool(_)) => "boolean",
        Ok(Value::Null) => "null",
        Err(_) => "unknown",
    };
    kind.to_string()
}

// == Cache Store ==
/// Main cache storage with TTL support and batch LRU eviction.
pub struct CacheStore<V = Value> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL for entries stored without an explicit one
    default_ttl: Duration,
    /// Health threshold for estimated memory usage
    memory_soft_limit: usize,
    /// Running sum of entry size estimates
    memory_usage: usize,
    /// Last issued access sequence number
    access_seq: u64,
    estimator: SizeEstimator<V>,
    categorizer: Categorizer<V>,
}

impl<V: Serialize + 'static> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL,
    /// sizing and categorizing values by their JSON form.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        let config = CacheConfig {
            max_entries,
            default_ttl,
            ..CacheConfig::default()
        };
        Self::from_config(&config)
    }

    /// Creates a new CacheStore from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_strategies(config, Arc::new(json_size::<V>), Arc::new(json_category::<V>))
    }
}

impl<V> CacheStore<V> {
    /// Creates a CacheStore with caller-provided size and category strategies.
    pub fn with_strategies(
        config: &CacheConfig,
        estimator: SizeEstimator<V>,
        categorizer: Categorizer<V>,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            max_entries: config.max_entries,
            default_ttl: config.default_ttl,
            memory_soft_limit: config.memory_soft_limit,
            memory_usage: 0,
            access_seq: 0,
            estimator,
            categorizer,
        }
    }

    // == Set ==
    /// Stores a value under `key` with the default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, value, ttl);
    }

    /// Stores a value under `key`, expiring `ttl` from now.
    ///
    /// Any existing entry under the same key is replaced. Inserting a new key
    /// into a full cache evicts a batch of least recently accessed entries first.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();

        if self.max_entries == 0 {
            debug!("Cache has no capacity, not storing '{}'", key);
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_batch();
        }

        let size = (self.estimator)(&value);
        let category = (self.categorizer)(&value);
        let mut entry = CacheEntry::new(value, ttl, size, category);
        entry.access_seq = self.next_seq();

        if let Some(previous) = self.entries.insert(key, entry) {
            self.memory_usage = self.memory_usage.saturating_sub(previous.size_estimate);
        }
        self.memory_usage += size;
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed on sight and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        let seq = self.next_seq();
        let entry = self.entries.get_mut(key)?;
        entry.touch(seq);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Contains ==
    /// Returns true if a live entry exists, without touching stats or recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Clear ==
    /// Removes every entry and resets memory accounting. Hit and miss
    /// counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.memory_usage = 0;
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.remove_entry(&key);
        }

        self.stats.record_expirations(count);
        count
    }

    // == Evict ==
    /// Removes the least recently accessed tenth of the entries, at least one.
    ///
    /// Returns the number of entries removed.
    fn evict_batch(&mut self) -> usize {
        let mut by_recency: Vec<(Instant, u64, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_accessed_at, entry.access_seq, key.clone()))
            .collect();
        by_recency.sort_unstable();

        let count = (by_recency.len() / EVICTION_DIVISOR)
            .max(1)
            .min(by_recency.len());

        for (_, _, key) in by_recency.into_iter().take(count) {
            self.remove_entry(&key);
        }

        self.stats.record_evictions(count);
        debug!("Cache eviction: removed {} least recently used entries", count);
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.hit_rate = stats.compute_hit_rate();
        stats.size = self.entries.len();
        stats.memory_usage_estimate = self.memory_usage;
        for entry in self.entries.values() {
            *stats.categories.entry(entry.category.clone()).or_insert(0) += 1;
        }
        stats
    }

    // == Health ==
    /// Derives advisory issues from the current statistics.
    pub fn check_health(&self) -> HealthReport {
        let stats = self.stats();
        let mut issues = Vec::new();

        if stats.lookups() > 0 && stats.hit_rate < LOW_HIT_RATE {
            issues.push(format!(
                "Low cache hit rate: {:.1}%",
                stats.hit_rate * 100.0
            ));
        }
        if stats.memory_usage_estimate > self.memory_soft_limit {
            issues.push(format!(
                "High cache memory usage: {} bytes (soft limit {})",
                stats.memory_usage_estimate, self.memory_soft_limit
            ));
        }
        if stats.size as f64 > self.max_entries as f64 * NEAR_CAPACITY {
            issues.push(format!(
                "Cache nearly full: {} of {} entries",
                stats.size, self.max_entries
            ));
        }

        HealthReport::from_issues(issues)
    }

    /// Returns the category the store would assign to `value`.
    pub fn categorize(&self, value: &V) -> String {
        (self.categorizer)(value)
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.memory_usage = self.memory_usage.saturating_sub(entry.size_estimate);
        Some(entry)
    }

    fn next_seq(&mut self) -> u64 {
        self.access_seq += 1;
        self.access_seq
    }
}

impl<V> fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("default_ttl", &self.default_ttl)
            .field("memory_usage", &self.memory_usage)
            .finish_non_exhaustive()
    }
}
