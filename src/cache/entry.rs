//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

/// Longest TTL honoured; longer ones, up to `Duration::MAX`, are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was stored
    pub created_at: Instant,
    /// When the entry stops being served
    pub expires_at: Instant,
    /// Last time the entry was stored or read
    pub last_accessed_at: Instant,
    /// Monotonic access sequence, breaks ties between equal instants
    pub(crate) access_seq: u64,
    /// Approximate payload size in bytes
    pub size_estimate: usize,
    /// Number of successful reads
    pub access_count: u64,
    /// Informational tag for stats breakdown
    pub category: String,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now, with `ttl` capped at
    /// `MAX_TTL`.
    pub fn new(value: V, ttl: Duration, size_estimate: usize, category: String) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl.min(MAX_TTL),
            last_accessed_at: now,
            access_seq: 0,
            size_estimate,
            access_count: 0,
            category,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is strictly past `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a caller-supplied instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    // == Touch ==
    /// Records a successful read.
    pub(crate) fn touch(&mut self, seq: u64) {
        self.last_accessed_at = Instant::now();
        self.access_seq = seq;
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
