//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration, queue-mode slots and reclaim draining. All state sits behind
//! one `parking_lot::Mutex` held for the whole of each operation.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::entry::{
    current_timestamp_ms, deadline_from_ttl, CacheEntry, Slot, NO_EXPIRATION,
};
use crate::cache::queue::QueueEntry;
use crate::cache::reclaim::{ReclaimHandle, ReclaimQueue};
use crate::cache::{CacheStats, LruTracker};
use crate::config::CacheConfig;

// == Put Options ==
/// Per-call overrides for [`CacheStore::put_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// TTL in seconds for this entry; `Some(0)` means never expires
    pub ttl: Option<u64>,
    /// Append to the key's queue instead of replacing (queue mode only)
    pub queueable: bool,
}

impl PutOptions {
    pub fn with_ttl(ttl_seconds: u64) -> Self {
        Self {
            ttl: Some(ttl_seconds),
            queueable: false,
        }
    }

    pub fn queued() -> Self {
        Self {
            ttl: None,
            queueable: true,
        }
    }
}

// == Cache State ==
#[derive(Debug)]
struct CacheState<K, V> {
    entries: HashMap<K, Slot<K, V>>,
    lru: LruTracker<K>,
    stats: CacheStats,
    /// 0 = unbounded
    max_size: usize,
    /// Default TTL in seconds, 0 = never expires
    ttl_seconds: u64,
    /// 0 = queue mode disabled
    max_queue_depth: usize,
    reclaimable: bool,
    /// Lower bound on the earliest deadline, `NO_EXPIRATION` if none
    next_expiration: u64,
    next_id: u64,
    reclaim: ReclaimQueue<K>,
}

impl<K, V> CacheState<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn new_entry(&mut self, key: K, value: V, expiration_time: u64) -> CacheEntry<K, V> {
        self.next_id += 1;
        if self.reclaimable {
            CacheEntry::reclaimable(key, value, expiration_time, self.next_id)
        } else {
            CacheEntry::hard(key, value, expiration_time, self.next_id)
        }
    }

    fn note_deadline(&mut self, deadline: u64) {
        if deadline != NO_EXPIRATION
            && (self.next_expiration == NO_EXPIRATION || deadline < self.next_expiration)
        {
            self.next_expiration = deadline;
        }
    }

    fn drop_key(&mut self, key: &K) -> Option<Slot<K, V>> {
        let slot = self.entries.remove(key);
        self.lru.remove(key);
        slot
    }

    // == Drain Reclaimed ==
    /// Removes entries whose values were dropped by a reclaim handle.
    fn drain_reclaimed(&mut self) {
        let mut purged = 0;
        while let Some(notice) = self.reclaim.poll() {
            let emptied = match self.entries.get_mut(&notice.key) {
                Some(Slot::Single(entry)) if entry.id() == notice.id => {
                    purged += 1;
                    true
                }
                Some(Slot::Queue(queue)) => {
                    if queue.remove_id(notice.id) {
                        purged += 1;
                    }
                    queue.is_empty()
                }
                _ => false,
            };
            if emptied {
                self.drop_key(&notice.key);
            }
        }
        if purged > 0 {
            debug!(purged, "dropped reclaimed entries");
            self.stats.record_reclaimed(purged);
        }
    }

    // == Expunge Expired ==
    /// Removes dead entries and dead queue children.
    ///
    /// Skips the scan entirely while `now` is below the deadline hint.
    fn expunge_expired(&mut self, now: u64) -> usize {
        if self.next_expiration == NO_EXPIRATION || now < self.next_expiration {
            return 0;
        }

        let mut removed = 0;
        let mut dead_keys = Vec::new();
        let mut next = NO_EXPIRATION;
        for (key, slot) in self.entries.iter_mut() {
            if let Slot::Queue(queue) = slot {
                removed += queue.prune(now);
            }
            if slot.is_valid(now) {
                let deadline = slot.earliest_deadline();
                if deadline != NO_EXPIRATION && (next == NO_EXPIRATION || deadline < next) {
                    next = deadline;
                }
            } else {
                dead_keys.push(key.clone());
            }
        }
        for key in dead_keys {
            if let Some(mut slot) = self.drop_key(&key) {
                if matches!(slot, Slot::Single(_)) {
                    removed += 1;
                }
                slot.invalidate();
            }
        }
        self.next_expiration = next;

        if removed > 0 {
            debug!(removed, "expunged expired entries");
            self.stats.record_expirations(removed);
        }
        removed
    }

    // == Evict Oldest ==
    fn evict_oldest(&mut self) -> bool {
        match self.lru.evict_oldest() {
            Some(key) => {
                if let Some(mut slot) = self.entries.remove(&key) {
                    slot.invalidate();
                }
                self.stats.record_eviction();
                true
            }
            None => false,
        }
    }

    fn over_capacity(&self) -> bool {
        self.max_size > 0 && self.entries.len() > self.max_size
    }

    fn sync_total(&mut self) {
        let count = self.entries.len();
        self.stats.set_total_entries(count);
    }
}

// == Cache Store ==
/// Bounded, expiring, concurrency-safe key-value cache.
///
/// # Behavior
/// - Exceeding `max_size` first sweeps expired entries, then evicts exactly
///   one least recently used key.
/// - Reads and writes both refresh LRU recency.
/// - With `max_queue_depth > 0`, queueable puts append to a per-key FIFO
///   and reads consume the oldest live value.
/// - With `reclaimable`, values can be dropped through [`ReclaimHandle`]s;
///   a reclaimed entry reads as absent, exactly like an expired one.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> CacheStore<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    // == Constructor ==
    /// Creates a non-reclaimable cache without queue mode.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of keys, 0 = unbounded
    /// * `ttl_seconds` - Default TTL in seconds, 0 = never expires
    pub fn new(max_size: usize, ttl_seconds: u64) -> Self {
        Self::from_config(&CacheConfig {
            max_size,
            ttl_seconds,
            ..CacheConfig::default()
        })
    }

    /// Creates a cache from construction parameters.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                stats: CacheStats::new(),
                max_size: config.max_size,
                ttl_seconds: config.ttl_seconds,
                max_queue_depth: config.max_queue_depth,
                reclaimable: config.reclaimable,
                next_expiration: NO_EXPIRATION,
                next_id: 0,
                reclaim: ReclaimQueue::new(),
            }),
        }
    }

    // == Put ==
    /// Stores a value with the default TTL, replacing any existing entry.
    pub fn put(&self, key: K, value: V) {
        self.put_with(key, value, PutOptions::default());
    }

    /// Stores a value with per-call options.
    ///
    /// Queueable puts on a queue-mode cache append to the key's queue,
    /// dropping the oldest value past `max_queue_depth`. Every other put
    /// replaces and invalidates the previous entry.
    pub fn put_with(&self, key: K, value: V, options: PutOptions) {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();

        let ttl = options.ttl.unwrap_or(state.ttl_seconds);
        let deadline = deadline_from_ttl(now, ttl);
        let entry = state.new_entry(key.clone(), value, deadline);
        let depth = state.max_queue_depth;

        if options.queueable && depth > 0 {
            match state.entries.get_mut(&key) {
                Some(Slot::Queue(queue)) => {
                    let dropped = queue.push(entry);
                    if dropped > 0 {
                        debug!(dropped, "queue over depth, dropped oldest values");
                    }
                }
                _ => {
                    let queue = QueueEntry::new(key.clone(), entry, depth);
                    if let Some(mut old) = state.entries.insert(key.clone(), Slot::Queue(queue)) {
                        old.invalidate();
                    }
                }
            }
        } else if let Some(mut old) = state.entries.insert(key.clone(), Slot::Single(entry)) {
            old.invalidate();
        }

        state.lru.touch(&key);
        state.note_deadline(deadline);

        if state.over_capacity() {
            state.expunge_expired(now);
            if state.over_capacity() && state.evict_oldest() {
                debug!(max_size = state.max_size, "evicted least recently used entry");
            }
        }
        state.sync_total();
    }

    // == Get ==
    /// Retrieves a live value.
    ///
    /// Expired or reclaimed entries are removed and reported as absent.
    /// On a queue slot this consumes the oldest live value.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();

        let (value, dead, discarded) = match state.entries.get_mut(key) {
            None => (None, false, 0),
            Some(Slot::Single(entry)) => match entry.live_value(now) {
                Some(value) => (Some(value), false, 0),
                None => (None, true, 0),
            },
            Some(Slot::Queue(queue)) => {
                let (value, discarded) = queue.pop_valid(now);
                (value, queue.is_empty(), discarded)
            }
        };

        if discarded > 0 {
            state.stats.record_expirations(discarded);
        }
        if dead {
            if let Some(mut slot) = state.drop_key(key) {
                if matches!(slot, Slot::Single(_)) {
                    state.stats.record_expirations(1);
                }
                slot.invalidate();
            }
        } else if value.is_some() {
            state.lru.touch(key);
        }

        match value {
            Some(_) => state.stats.record_hit(),
            None => state.stats.record_miss(),
        }
        state.sync_total();
        value
    }

    // == Remove ==
    /// Removes and invalidates an entry. Returns true if the key existed.
    pub fn remove(&self, key: &K) -> bool {
        let mut state = self.state.lock();
        state.drain_reclaimed();

        let existed = match state.drop_key(key) {
            Some(mut slot) => {
                slot.invalidate();
                true
            }
            None => false,
        };
        state.sync_total();
        existed
    }

    // == Pull ==
    /// Removes an entry and returns its value if it was still live.
    ///
    /// A queue slot is removed whole and yields its oldest live value.
    pub fn pull(&self, key: &K) -> Option<V> {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();

        let value = match state.drop_key(key) {
            None => None,
            Some(Slot::Single(mut entry)) => entry.take_live_value(now),
            Some(Slot::Queue(mut queue)) => {
                let (value, _) = queue.pop_valid(now);
                queue.invalidate_all();
                value
            }
        };
        state.sync_total();
        value
    }

    // == Set Capacity ==
    /// Changes `max_size`, shrinking immediately if needed. 0 = unbounded.
    pub fn set_capacity(&self, max_size: usize) {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();

        state.max_size = max_size;
        state.expunge_expired(now);
        let mut evicted = 0;
        while state.over_capacity() && state.evict_oldest() {
            evicted += 1;
        }
        if evicted > 0 {
            info!(max_size, evicted, "cache capacity reduced");
        }
        state.sync_total();
    }

    // == Set Timeout ==
    /// Changes the default TTL applied to later puts. 0 = never expires.
    pub fn set_timeout(&self, ttl_seconds: u64) {
        let mut state = self.state.lock();
        state.drain_reclaimed();
        state.ttl_seconds = ttl_seconds;
    }

    // == Size ==
    /// Sweeps expired entries and returns the number of live keys.
    pub fn size(&self) -> usize {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();
        state.expunge_expired(now);
        state.sync_total();
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // == Expunge Expired ==
    /// Sweeps expired entries now. Returns the number removed.
    pub fn expunge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();
        let removed = state.expunge_expired(now);
        state.sync_total();
        removed
    }

    // == Clear ==
    /// Invalidates and drops every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.drain_reclaimed();
        for slot in state.entries.values_mut() {
            slot.invalidate();
        }
        state.entries.clear();
        state.lru.clear();
        state.next_expiration = NO_EXPIRATION;
        state.sync_total();
    }

    // == Snapshot ==
    /// Live key/value pairs, least recently used first.
    ///
    /// Does not refresh recency or consume queued values.
    pub fn snapshot(&self) -> Vec<(K, V)> {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();
        state
            .lru
            .iter_oldest_first()
            .filter_map(|key| {
                let value = state.entries.get(key)?.peek(now)?;
                Some((key.clone(), value))
            })
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut state = self.state.lock();
        state.drain_reclaimed();
        state.sync_total();
        state.stats.clone()
    }

    // == Reclaim Handles ==
    /// Weak handles to every live reclaimable value.
    ///
    /// Empty unless the cache was built with `reclaimable`.
    pub fn reclaim_handles(&self) -> Vec<ReclaimHandle<K, V>> {
        let now = current_timestamp_ms();
        let mut state = self.state.lock();
        state.drain_reclaimed();

        let sender = state.reclaim.sender();
        let mut handles = Vec::new();
        for slot in state.entries.values() {
            let entries: Vec<&CacheEntry<K, V>> = match slot {
                Slot::Single(entry) => vec![entry],
                Slot::Queue(queue) => queue.iter().collect(),
            };
            handles.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.is_valid(now))
                    .filter_map(|entry| ReclaimHandle::for_entry(entry, sender)),
            );
        }
        handles
    }

    pub fn max_size(&self) -> usize {
        self.state.lock().max_size
    }

    pub fn timeout(&self) -> u64 {
        self.state.lock().ttl_seconds
    }
}

impl<K, V> Default for CacheStore<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
