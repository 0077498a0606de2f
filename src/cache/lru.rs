//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with a strictly increasing tick:
/// - Smallest stamp = Least recently used
/// - Largest stamp = Most recently used
#[derive(Debug)]
pub struct LruTracker<K> {
    /// Next access tick
    tick: u64,
    /// Key -> last access tick
    stamps: HashMap<K, u64>,
    /// Access tick -> key, oldest first
    order: BTreeMap<u64, K>,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self {
            tick: 0,
            stamps: HashMap::new(),
            order: BTreeMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &K) {
        self.tick += 1;
        if let Some(previous) = self.stamps.insert(key.clone(), self.tick) {
            self.order.remove(&previous);
        }
        self.order.insert(self.tick, key.clone());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.values().next()
    }

    /// Keys from least to most recently used.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.stamps.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
        self.order.clear();
    }
}
