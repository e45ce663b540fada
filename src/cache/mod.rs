//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and batch LRU eviction.

mod entry;
mod shared;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use entry::CacheEntry;
pub use shared::SharedCache;
pub use stats::CacheStats;
pub use store::{json_category, json_size, CacheStore, Categorizer, SizeEstimator};
pub use ttl::TtlTable;

// == Public Constants ==
/// Eviction removes `len / EVICTION_DIVISOR` entries (at least one)
pub const EVICTION_DIVISOR: usize = 10;

/// Hit rate below which the health check reports an issue
pub const LOW_HIT_RATE: f64 = 0.30;

/// Fill ratio of `max_entries` above which the health check reports an issue
pub const NEAR_CAPACITY: f64 = 0.90;
