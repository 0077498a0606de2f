//! Cache Module
//!
//! Bounded in-memory cache with TTL expiration, LRU eviction, queue-mode
//! slots and reclaimable entries.

mod entry;
mod lru;
mod queue;
mod reclaim;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, NO_EXPIRATION};
pub use lru::LruTracker;
pub use queue::QueueEntry;
pub use reclaim::{ReclaimHandle, ReclaimNotice};
pub use stats::CacheStats;
pub use store::{CacheStore, PutOptions};
