//! Queue Entry Module
//!
//! Queue-mode slot: one key holding a bounded FIFO of independently
//! expiring entries. Reads consume the oldest live value.

use std::collections::VecDeque;

use crate::cache::entry::{CacheEntry, NO_EXPIRATION};

// == Queue Entry ==
/// Bounded FIFO of entries sharing one key.
#[derive(Debug)]
pub struct QueueEntry<K, V> {
    key: K,
    /// Front = oldest
    items: VecDeque<CacheEntry<K, V>>,
    max_depth: usize,
}

impl<K, V> QueueEntry<K, V> {
    // == Constructor ==
    /// Creates a queue seeded with its first entry.
    ///
    /// A `max_depth` of zero is treated as one.
    pub fn new(key: K, first: CacheEntry<K, V>, max_depth: usize) -> Self {
        let mut items = VecDeque::with_capacity(max_depth.clamp(1, 16));
        items.push_back(first);
        Self {
            key,
            items,
            max_depth: max_depth.max(1),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    // == Push ==
    /// Appends an entry, dropping the oldest ones beyond `max_depth`.
    ///
    /// Returns how many entries were dropped; they are invalidated.
    pub fn push(&mut self, entry: CacheEntry<K, V>) -> usize {
        self.items.push_back(entry);
        let mut dropped = 0;
        while self.items.len() > self.max_depth {
            if let Some(mut oldest) = self.items.pop_front() {
                oldest.invalidate();
                dropped += 1;
            }
        }
        dropped
    }

    // == Expiration ==
    /// Latest deadline among live children; `NO_EXPIRATION` if any never
    /// expires, 0 if none is live.
    pub fn expiration_time(&self, now: u64) -> u64 {
        let mut latest = 0;
        for item in self.items.iter().filter(|item| item.is_valid(now)) {
            if item.expiration_time() == NO_EXPIRATION {
                return NO_EXPIRATION;
            }
            latest = latest.max(item.expiration_time());
        }
        latest
    }

    /// Earliest non-sentinel deadline among children.
    pub fn earliest_deadline(&self) -> u64 {
        self.items
            .iter()
            .map(CacheEntry::expiration_time)
            .filter(|&t| t != NO_EXPIRATION)
            .min()
            .unwrap_or(NO_EXPIRATION)
    }

    pub fn is_valid(&self, now: u64) -> bool {
        self.items.iter().any(|item| item.is_valid(now))
    }

    // == Prune ==
    /// Drops expired or reclaimed children. Returns how many were removed.
    pub fn prune(&mut self, now: u64) -> usize {
        let before = self.items.len();
        self.items.retain_mut(|item| {
            if item.is_valid(now) {
                true
            } else {
                item.invalidate();
                false
            }
        });
        before - self.items.len()
    }

    /// Removes the child with the given id, if still queued.
    pub fn remove_id(&mut self, id: u64) -> bool {
        match self.items.iter().position(|item| item.id() == id) {
            Some(index) => {
                if let Some(mut item) = self.items.remove(index) {
                    item.invalidate();
                }
                true
            }
            None => false,
        }
    }

    pub fn invalidate_all(&mut self) {
        for item in self.items.iter_mut() {
            item.invalidate();
        }
        self.items.clear();
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &CacheEntry<K, V>> {
        self.items.iter()
    }
}

impl<K, V: Clone> QueueEntry<K, V> {
    // == Pop Valid ==
    /// Removes and returns the oldest live value.
    ///
    /// Dead children met on the way are discarded; the second element of
    /// the result counts them.
    pub fn pop_valid(&mut self, now: u64) -> (Option<V>, usize) {
        let mut discarded = 0;
        while let Some(mut item) = self.items.pop_front() {
            if let Some(value) = item.take_live_value(now) {
                return (Some(value), discarded);
            }
            discarded += 1;
        }
        (None, discarded)
    }

    /// Oldest live value without consuming it.
    pub fn peek_valid(&self, now: u64) -> Option<V> {
        self.items.iter().find_map(|item| item.live_value(now))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn hard(value: u32, expiration: u64, id: u64) -> CacheEntry<&'static str, u32> {
        CacheEntry::hard("ticket", value, expiration, id)
    }

    #[test]
    fn test_queue_fifo_order() {
        let mut queue = QueueEntry::new("ticket", hard(1, NO_EXPIRATION, 1), 4);
        queue.push(hard(2, NO_EXPIRATION, 2));
        queue.push(hard(3, NO_EXPIRATION, 3));

        assert_eq!(queue.pop_valid(0), (Some(1), 0));
        assert_eq!(queue.pop_valid(0), (Some(2), 0));
        assert_eq!(queue.pop_valid(0), (Some(3), 0));
        assert_eq!(queue.pop_valid(0), (None, 0));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_overflow_drops_oldest() {
        let mut queue = QueueEntry::new("ticket", hard(1, NO_EXPIRATION, 1), 2);
        assert_eq!(queue.push(hard(2, NO_EXPIRATION, 2)), 0);
        assert_eq!(queue.push(hard(3, NO_EXPIRATION, 3)), 1);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_valid(0).0, Some(2));
    }

    #[test]
    fn test_pop_skips_expired_children() {
        let mut queue = QueueEntry::new("ticket", hard(1, 100, 1), 4);
        queue.push(hard(2, 100, 2));
        queue.push(hard(3, 500, 3));

        assert_eq!(queue.pop_valid(200), (Some(3), 2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_expiration_is_latest_live_child() {
        let mut queue = QueueEntry::new("ticket", hard(1, 100, 1), 4);
        queue.push(hard(2, 300, 2));

        assert_eq!(queue.expiration_time(0), 300);
        assert_eq!(queue.earliest_deadline(), 100);

        queue.push(hard(3, NO_EXPIRATION, 3));
        assert_eq!(queue.expiration_time(0), NO_EXPIRATION);
    }

    #[test]
    fn test_expiration_ignores_dead_children() {
        let mut queue = QueueEntry::new("ticket", hard(1, 500, 1), 4);
        queue.push(hard(2, 300, 2));
        queue.push(hard(3, NO_EXPIRATION, 3));
        queue.remove_id(3);

        assert_eq!(queue.expiration_time(200), 500);
        assert_eq!(queue.expiration_time(600), 0);
    }

    #[test]
    fn test_prune_and_remove_id() {
        let mut queue = QueueEntry::new("ticket", hard(1, 100, 1), 4);
        queue.push(hard(2, 900, 2));
        queue.push(hard(3, 900, 3));

        assert_eq!(queue.prune(150), 1);
        assert!(queue.remove_id(3));
        assert!(!queue.remove_id(3));
        assert_eq!(queue.peek_valid(150), Some(2));
    }

    #[test]
    fn test_zero_depth_treated_as_one() {
        let mut queue = QueueEntry::new("ticket", hard(1, NO_EXPIRATION, 1), 0);
        queue.push(hard(2, NO_EXPIRATION, 2));

        assert_eq!(queue.max_depth(), 1);
        assert_eq!(queue.pop_valid(0).0, Some(2));
    }
}
