//! Cache Entry Module
//!
//! Defines individual cache entries and the slot type stored per key.
//!
//! An entry owns its value either outright (`Hard`) or through a cell that
//! an external reclaimer may clear at any time (`Reclaimable`). A key maps
//! to a [`Slot`], which is either a single entry or a FIFO queue of them.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::cache::queue::QueueEntry;

/// Expiration sentinel meaning "never expires".
pub const NO_EXPIRATION: u64 = 0;

// == Soft Cell ==
/// Value cell shared between a reclaimable entry and its reclaim handles.
#[derive(Debug)]
pub(crate) struct SoftCell<V> {
    value: Mutex<Option<V>>,
}

impl<V> SoftCell<V> {
    pub(crate) fn new(value: V) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }

    /// Drops the value. Returns false if it was already gone.
    pub(crate) fn clear(&self) -> bool {
        self.value.lock().take().is_some()
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.value.lock().is_none()
    }
}

impl<V: Clone> SoftCell<V> {
    pub(crate) fn get(&self) -> Option<V> {
        self.value.lock().clone()
    }

    pub(crate) fn take(&self) -> Option<V> {
        self.value.lock().take()
    }
}

// == Payload ==
/// How an entry holds its value.
#[derive(Debug)]
pub(crate) enum Payload<V> {
    /// Owned until invalidated.
    Hard(Option<V>),
    /// Shared with the reclaimer, may vanish asynchronously.
    Reclaimable(Arc<SoftCell<V>>),
}

// == Cache Entry ==
/// A single cached value with its key and expiration deadline.
#[derive(Debug)]
pub struct CacheEntry<K, V> {
    key: K,
    payload: Payload<V>,
    /// Deadline in Unix milliseconds, `NO_EXPIRATION` = never
    expiration_time: u64,
    /// Identity used to match reclaim notifications to this entry
    id: u64,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructors ==
    /// Creates an entry that owns its value.
    pub fn hard(key: K, value: V, expiration_time: u64, id: u64) -> Self {
        Self {
            key,
            payload: Payload::Hard(Some(value)),
            expiration_time,
            id,
        }
    }

    /// Creates an entry whose value can be dropped by a reclaimer.
    pub fn reclaimable(key: K, value: V, expiration_time: u64, id: u64) -> Self {
        Self {
            key,
            payload: Payload::Reclaimable(Arc::new(SoftCell::new(value))),
            expiration_time,
            id,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn expiration_time(&self) -> u64 {
        self.expiration_time
    }

    pub fn is_reclaimable(&self) -> bool {
        matches!(self.payload, Payload::Reclaimable(_))
    }

    pub(crate) fn soft_cell(&self) -> Option<&Arc<SoftCell<V>>> {
        match &self.payload {
            Payload::Reclaimable(cell) => Some(cell),
            Payload::Hard(_) => None,
        }
    }

    // == Is Expired ==
    /// Checks the deadline against `now` (Unix milliseconds).
    ///
    /// An entry is expired once `now >= expiration_time`; the sentinel
    /// `NO_EXPIRATION` never expires.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiration_time != NO_EXPIRATION && now >= self.expiration_time
    }

    /// Returns true if the value was dropped by invalidation or reclamation.
    pub fn is_cleared(&self) -> bool {
        match &self.payload {
            Payload::Hard(value) => value.is_none(),
            Payload::Reclaimable(cell) => cell.is_cleared(),
        }
    }

    // == Is Valid ==
    pub fn is_valid(&self, now: u64) -> bool {
        !self.is_expired(now) && !self.is_cleared()
    }

    // == Invalidate ==
    /// Drops the value. Outstanding reclaim handles observe an empty cell.
    pub fn invalidate(&mut self) {
        match &mut self.payload {
            Payload::Hard(value) => {
                value.take();
            }
            Payload::Reclaimable(cell) => {
                cell.clear();
            }
        }
    }
}

impl<K, V: Clone> CacheEntry<K, V> {
    /// Returns a copy of the value if the entry is still live at `now`.
    pub fn live_value(&self, now: u64) -> Option<V> {
        if self.is_expired(now) {
            return None;
        }
        match &self.payload {
            Payload::Hard(value) => value.clone(),
            Payload::Reclaimable(cell) => cell.get(),
        }
    }

    /// Moves the value out if live, leaving the entry invalidated.
    pub fn take_live_value(&mut self, now: u64) -> Option<V> {
        let expired = self.is_expired(now);
        let value = match &mut self.payload {
            Payload::Hard(value) => value.take(),
            Payload::Reclaimable(cell) => cell.take(),
        };
        if expired {
            None
        } else {
            value
        }
    }
}

// == Slot ==
/// What a key maps to: one entry, or a queue of entries in queue mode.
#[derive(Debug)]
pub(crate) enum Slot<K, V> {
    Single(CacheEntry<K, V>),
    Queue(QueueEntry<K, V>),
}

impl<K, V> Slot<K, V> {
    pub(crate) fn is_valid(&self, now: u64) -> bool {
        match self {
            Slot::Single(entry) => entry.is_valid(now),
            Slot::Queue(queue) => queue.is_valid(now),
        }
    }

    /// Earliest deadline of any child, used to maintain the sweep hint.
    pub(crate) fn earliest_deadline(&self) -> u64 {
        match self {
            Slot::Single(entry) => entry.expiration_time(),
            Slot::Queue(queue) => queue.earliest_deadline(),
        }
    }

    pub(crate) fn invalidate(&mut self) {
        match self {
            Slot::Single(entry) => entry.invalidate(),
            Slot::Queue(queue) => queue.invalidate_all(),
        }
    }
}

impl<K, V: Clone> Slot<K, V> {
    /// Reads the value visible at `now` without consuming anything.
    pub(crate) fn peek(&self, now: u64) -> Option<V> {
        match self {
            Slot::Single(entry) => entry.live_value(now),
            Slot::Queue(queue) => queue.peek_valid(now),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts a TTL in seconds into an absolute deadline.
///
/// A zero TTL yields `NO_EXPIRATION`.
pub fn deadline_from_ttl(now: u64, ttl_seconds: u64) -> u64 {
    if ttl_seconds == 0 {
        NO_EXPIRATION
    } else {
        now.saturating_add(ttl_seconds.saturating_mul(1000))
    }
}
