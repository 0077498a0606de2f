//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check capacity, recency and queue behavior over
//! generated operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::cache::{CacheStore, PutOptions};
use crate::config::CacheConfig;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL: u64 = 300;

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Remove { key: String },
    Pull { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Pull { key }),
    ]
}

/// Reference LRU model: front = least recently used
#[derive(Default)]
struct Model {
    order: VecDeque<String>,
    values: HashMap<String, String>,
    capacity: usize,
}

impl Model {
    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }

    fn forget(&mut self, key: &str) -> Option<String> {
        self.order.retain(|k| k != key);
        self.values.remove(key)
    }

    fn put(&mut self, key: String, value: String) {
        self.values.insert(key.clone(), value);
        self.touch(&key);
        if self.values.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.values.remove(&oldest);
            }
        }
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let value = self.values.get(key).cloned();
        if value.is_some() {
            self.touch(key);
        }
        value
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a pair and reading it back before expiration returns the
    // exact value.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let store = CacheStore::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);

        store.put(key.clone(), value.clone());

        prop_assert_eq!(store.get(&key), Some(value));
    }

    // The number of keys never exceeds max_size after any operation.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..8,
        ops in prop::collection::vec(cache_op_strategy(), 1..200)
    ) {
        let store = CacheStore::new(capacity, TEST_DEFAULT_TTL);

        for op in ops {
            match op {
                CacheOp::Put { key, value } => store.put(key, value),
                CacheOp::Get { key } => { store.get(&key); }
                CacheOp::Remove { key } => { store.remove(&key); }
                CacheOp::Pull { key } => { store.pull(&key); }
            }
            prop_assert!(
                store.size() <= capacity,
                "Cache size {} exceeds max {}",
                store.size(),
                capacity
            );
        }
    }

    // The cache agrees with a reference LRU model on every read, so the
    // evicted key is always the least recently accessed one.
    #[test]
    fn prop_matches_lru_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..150)
    ) {
        let store = CacheStore::new(capacity, TEST_DEFAULT_TTL);
        let mut model = Model { capacity, ..Model::default() };

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    store.put(key.clone(), value.clone());
                    model.put(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(&key), model.get(&key));
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(store.remove(&key), model.forget(&key).is_some());
                }
                CacheOp::Pull { key } => {
                    prop_assert_eq!(store.pull(&key), model.forget(&key));
                }
            }
        }

        let expected: Vec<(String, String)> = model
            .order
            .iter()
            .map(|k| (k.clone(), model.values[k].clone()))
            .collect();
        prop_assert_eq!(store.snapshot(), expected);
    }

    // Queue mode returns values in insertion order, keeping only the
    // newest max_queue_depth of them.
    #[test]
    fn prop_queue_mode_fifo(
        depth in 1usize..6,
        values in prop::collection::vec(value_strategy(), 1..12)
    ) {
        let store = CacheStore::from_config(&CacheConfig {
            max_size: TEST_MAX_ENTRIES,
            ttl_seconds: TEST_DEFAULT_TTL,
            max_queue_depth: depth,
            reclaimable: false,
        });

        for value in &values {
            store.put_with("ticket".to_string(), value.clone(), PutOptions::queued());
        }

        let kept = &values[values.len().saturating_sub(depth)..];
        for value in kept {
            let got = store.get(&"ticket".to_string());
            prop_assert_eq!(got.as_ref(), Some(value));
        }
        prop_assert_eq!(store.get(&"ticket".to_string()), None);
        prop_assert_eq!(store.size(), 0);
    }

    // Reclaiming any subset of values removes exactly those keys.
    #[test]
    fn prop_reclaimed_keys_disappear(
        keys in prop::collection::hash_set(key_strategy(), 1..20),
        mask in prop::collection::vec(any::<bool>(), 20)
    ) {
        let store = CacheStore::from_config(&CacheConfig {
            max_size: TEST_MAX_ENTRIES,
            ttl_seconds: TEST_DEFAULT_TTL,
            max_queue_depth: 0,
            reclaimable: true,
        });
        for key in &keys {
            store.put(key.clone(), format!("value_{}", key));
        }

        let mut reclaimed = HashSet::new();
        for (handle, chosen) in store.reclaim_handles().iter().zip(mask) {
            if chosen && handle.reclaim() {
                reclaimed.insert(handle.key().clone());
            }
        }

        prop_assert_eq!(store.size(), keys.len() - reclaimed.len());
        for key in &keys {
            prop_assert_eq!(store.get(key).is_none(), reclaimed.contains(key));
        }
    }
}

// Concurrent puts and reads through a shared store keep the capacity
// invariant and never observe a foreign value.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_concurrent_operation_correctness(
        ops in prop::collection::vec(cache_op_strategy(), 10..80)
    ) {
        let store = Arc::new(CacheStore::new(8, TEST_DEFAULT_TTL));

        let result: Result<(), String> = tokio_test::block_on(async {
            let mut handles = vec![];
            for op in ops {
                let store = Arc::clone(&store);
                handles.push(tokio::spawn(async move {
                    match op {
                        CacheOp::Put { key, value } => {
                            store.put(key.clone(), format!("{}={}", key, value));
                            Ok(())
                        }
                        CacheOp::Get { key } => match store.get(&key) {
                            Some(value) if !value.starts_with(&format!("{}=", key)) => {
                                Err(format!("key '{}' returned foreign value '{}'", key, value))
                            }
                            _ => Ok(()),
                        },
                        CacheOp::Remove { key } => {
                            store.remove(&key);
                            Ok(())
                        }
                        CacheOp::Pull { key } => {
                            store.pull(&key);
                            Ok(())
                        }
                    }
                }));
            }
            for handle in handles {
                handle.await.map_err(|e| e.to_string())??;
            }
            Ok::<(), String>(())
        });

        prop_assert!(result.is_ok(), "Concurrent operation failed: {:?}", result);
        prop_assert!(store.size() <= 8);
        let stats = store.stats();
        prop_assert!(stats.hit_rate() >= 0.0 && stats.hit_rate() <= 1.0);
    }
}
