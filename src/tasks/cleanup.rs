//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired cache entries, so
//! memory is released even for keys nobody reads again.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// # Arguments
/// * `cache` - Shared cache to sweep
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it during shutdown.
pub fn spawn_cleanup_task<K, V>(
    cache: Arc<CacheStore<K, V>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.expunge_expired();
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PutOptions;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = Arc::new(CacheStore::new(100, 300));
        cache.put_with(
            "expire_soon".to_string(),
            "value".to_string(),
            PutOptions::with_ttl(1),
        );
        cache.put("long_lived".to_string(), "value".to_string());

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // The sweep, not a read, removed the entry
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(cache.get(&"long_lived".to_string()), Some("value".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache: Arc<CacheStore<String, String>> = Arc::new(CacheStore::new(100, 300));

        let handle = spawn_cleanup_task(cache, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
