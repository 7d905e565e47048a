//! Property-Based Tests for Cache Module

use proptest::prelude::*;
use std::time::Duration;

use crate::cache::{CacheStore, EntryOptions};

const TEST_MAX_ENTRIES: usize = 100;
const TEST_MAX_KEY: usize = 64;
const TEST_MAX_PAYLOAD: usize = 512;

fn options() -> EntryOptions {
    EntryOptions::absolute(Duration::from_secs(300))
}

fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9:_]{1,64}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit and miss counters match the observed results of every read.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_KEY, TEST_MAX_PAYLOAD);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.set(&key, value, options());
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => {
                    store.remove(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.total_entries, store.len());
    }

    // A removed key is never served again until it is written again.
    #[test]
    fn prop_remove_is_immediate(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_KEY, TEST_MAX_PAYLOAD);
        store.set(&key, value, options()).unwrap();
        prop_assert!(store.get(&key).is_some());

        store.remove(&key);
        prop_assert!(store.get(&key).is_none());
    }

    // The entry count never exceeds the configured bound.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let max_entries = 50;
        let mut store = CacheStore::new(max_entries, TEST_MAX_KEY, TEST_MAX_PAYLOAD);

        for (key, value) in entries {
            let _ = store.set(&key, value, options());
            prop_assert!(store.len() <= max_entries);
        }
    }

    // Oversized payloads are refused and never become visible.
    #[test]
    fn prop_oversized_payload_never_stored(key in valid_key_strategy(), extra in 1usize..256) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_KEY, TEST_MAX_PAYLOAD);
        let value = "x".repeat(TEST_MAX_PAYLOAD + extra);

        prop_assert!(store.set(&key, value, options()).is_err());
        prop_assert!(store.get(&key).is_none());
    }
}
