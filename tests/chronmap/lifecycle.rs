//! Lifecycle Tests
//!
//! Behavior of a store after close, and the entry-count invariant.

use crate::common::*;
use chronmap::prelude::*;
use proptest::prelude::*;
use std::collections::HashMap;

#[test]
fn operations_after_close_fail() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);
    store.put("a".into(), "1".into()).unwrap();
    store.close().unwrap();

    assert!(store.is_closed());
    assert!(store.put("b".into(), "2".into()).unwrap_err().is_closed());
    assert!(store.get(&"a".into()).unwrap_err().is_closed());
    assert!(store.remove(&"a".into()).unwrap_err().is_closed());
    assert!(store.contains_key(&"a".into()).unwrap_err().is_closed());
    assert!(store.clear().unwrap_err().is_closed());
    assert!(store.snapshot().unwrap_err().is_closed());
    assert!(store.force_snapshot().unwrap_err().is_closed());
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
}

#[test]
fn close_is_idempotent() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);
    store.put("a".into(), "1".into()).unwrap();
    store.close().unwrap();
    store.close().unwrap();
    assert_eq!(backend.commit_count(), 1);
}

#[test]
fn put_returns_previous_value() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);
    assert_eq!(store.put("a".into(), "1".into()).unwrap(), None);
    assert_eq!(store.put("a".into(), "2".into()).unwrap(), Some("1".into()));
    assert_eq!(store.remove(&"a".into()).unwrap(), Some("2".into()));
    store.close().unwrap();
}

#[test]
fn stats_reflect_activity() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);
    store.put("a".into(), "1".into()).unwrap();
    store.put("b".into(), "2".into()).unwrap();

    let stats = store.stats();
    assert_eq!(stats.entries, 2);
    assert!(stats.dirty);
    assert_eq!(stats.flushes, 0);

    store.snapshot().unwrap();
    let stats = store.stats();
    assert!(!stats.dirty);
    assert_eq!(stats.flushes, 1);
    assert_eq!(stats.last_flush_entries, 2);
    store.close().unwrap();
}

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u8),
    Remove(u8),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..32, any::<u8>()).prop_map(|(k, v)| Op::Put(k, v)),
        3 => (0u8..32).prop_map(Op::Remove),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn len_matches_model(ops in proptest::collection::vec(op(), 0..64)) {
        let backend = MemoryBackend::new();
        let store = memory_store(&backend);
        let mut model = HashMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    let expected = model.insert(k.to_string(), v.to_string());
                    prop_assert_eq!(store.put(k.to_string(), v.to_string()).unwrap(), expected);
                }
                Op::Remove(k) => {
                    let expected = model.remove(&k.to_string());
                    prop_assert_eq!(store.remove(&k.to_string()).unwrap(), expected);
                }
                Op::Clear => {
                    model.clear();
                    store.clear().unwrap();
                }
            }
            prop_assert_eq!(store.len(), model.len());
        }

        store.close().unwrap();
        prop_assert_eq!(backend.committed_len("chronmap"), model.len());
    }
}
