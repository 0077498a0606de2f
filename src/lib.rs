//! certguard - expiring cache and algorithm constraint engine
//!
//! A bounded in-memory cache with TTL expiration, LRU eviction, queue-mode
//! keys and reclaimable values, alongside a rule engine that decides which
//! cryptographic algorithms, key sizes and usages are permitted. Both are
//! exposed over a small HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod constraints;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
