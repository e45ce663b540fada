//! Category TTL lookup
//!
//! Callers consult a `TtlTable` before `set_with_ttl`; the store never reads it.

use std::collections::HashMap;
use std::time::Duration;

/// Maps category tags to the TTL their entries should be stored with.
#[derive(Debug, Clone)]
pub struct TtlTable {
    default_ttl: Duration,
    by_category: HashMap<String, Duration>,
}

impl TtlTable {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            by_category: HashMap::new(),
        }
    }

    /// Adds or replaces the TTL for one category.
    pub fn with_category(mut self, category: impl Into<String>, ttl: Duration) -> Self {
        self.by_category.insert(category.into(), ttl);
        self
    }

    /// TTL for `category`, or the default when it has no entry.
    pub fn ttl_for(&self, category: &str) -> Duration {
        self.by_category
            .get(category)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}
