//! Reclamation Module
//!
//! Reclaimable entries share their value cell with weak [`ReclaimHandle`]s.
//! A memory-pressure agent can call [`ReclaimHandle::reclaim`] from any
//! thread without touching the cache lock; the handle clears the cell and
//! posts a [`ReclaimNotice`] on an unbounded channel. The cache drains that
//! channel with `try_recv` at the start of every operation.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::cache::entry::{CacheEntry, SoftCell};

// == Reclaim Notice ==
/// Posted when a reclaimable value is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimNotice<K> {
    pub key: K,
    pub id: u64,
}

// == Reclaim Handle ==
/// Weak observer of one reclaimable value.
///
/// Holding a handle does not keep the value alive: once the cache drops
/// the entry, `reclaim` becomes a no-op.
#[derive(Debug)]
pub struct ReclaimHandle<K, V> {
    key: K,
    id: u64,
    cell: Weak<SoftCell<V>>,
    notify: UnboundedSender<ReclaimNotice<K>>,
}

impl<K: Clone, V> ReclaimHandle<K, V> {
    pub(crate) fn for_entry(
        entry: &CacheEntry<K, V>,
        notify: &UnboundedSender<ReclaimNotice<K>>,
    ) -> Option<Self> {
        let cell = entry.soft_cell()?;
        Some(Self {
            key: entry.key().clone(),
            id: entry.id(),
            cell: Arc::downgrade(cell),
            notify: notify.clone(),
        })
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// True while the cache still holds the value.
    pub fn is_live(&self) -> bool {
        self.cell
            .upgrade()
            .map(|cell| !cell.is_cleared())
            .unwrap_or(false)
    }

    // == Reclaim ==
    /// Drops the value and notifies the owning cache.
    ///
    /// Returns false if the value was already gone.
    pub fn reclaim(&self) -> bool {
        let Some(cell) = self.cell.upgrade() else {
            return false;
        };
        if !cell.clear() {
            return false;
        }
        trace!(id = self.id, "value reclaimed");
        // The receiver lives as long as the cache; a closed channel means
        // the cache is gone and nothing is left to notify.
        let _ = self.notify.send(ReclaimNotice {
            key: self.key.clone(),
            id: self.id,
        });
        true
    }
}

// == Reclaim Queue ==
/// Receiving side of the notification channel, owned by the cache state.
#[derive(Debug)]
pub(crate) struct ReclaimQueue<K> {
    sender: UnboundedSender<ReclaimNotice<K>>,
    receiver: UnboundedReceiver<ReclaimNotice<K>>,
}

impl<K> ReclaimQueue<K> {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    pub(crate) fn sender(&self) -> &UnboundedSender<ReclaimNotice<K>> {
        &self.sender
    }

    /// Takes the next pending notice without blocking.
    pub(crate) fn poll(&mut self) -> Option<ReclaimNotice<K>> {
        self.receiver.try_recv().ok()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::NO_EXPIRATION;

    #[test]
    fn test_reclaim_posts_notice_once() {
        let mut queue = ReclaimQueue::new();
        let entry = CacheEntry::reclaimable("k".to_string(), 1u32, NO_EXPIRATION, 9);
        let handle = ReclaimHandle::for_entry(&entry, queue.sender()).unwrap();

        assert!(handle.is_live());
        assert!(handle.reclaim());
        assert!(!handle.reclaim());
        assert!(!handle.is_live());

        assert_eq!(
            queue.poll(),
            Some(ReclaimNotice {
                key: "k".to_string(),
                id: 9
            })
        );
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_hard_entries_have_no_handle() {
        let queue: ReclaimQueue<&str> = ReclaimQueue::new();
        let entry = CacheEntry::hard("k", 1u32, NO_EXPIRATION, 1);

        assert!(ReclaimHandle::for_entry(&entry, queue.sender()).is_none());
    }

    #[test]
    fn test_handle_outliving_entry_is_inert() {
        let mut queue = ReclaimQueue::new();
        let entry = CacheEntry::reclaimable("k", 1u32, NO_EXPIRATION, 1);
        let handle = ReclaimHandle::for_entry(&entry, queue.sender()).unwrap();
        drop(entry);

        assert!(!handle.reclaim());
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_reclaim_from_another_thread() {
        let mut queue = ReclaimQueue::new();
        let entry = CacheEntry::reclaimable(1u64, "v".to_string(), NO_EXPIRATION, 3);
        let handle = ReclaimHandle::for_entry(&entry, queue.sender()).unwrap();

        std::thread::spawn(move || handle.reclaim())
            .join()
            .unwrap();

        assert!(entry.is_cleared());
        assert_eq!(queue.poll().map(|n| n.id), Some(3));
    }
}
