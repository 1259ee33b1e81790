//! Registry Tests
//!
//! One live store per name, shared across threads.

use crate::common::*;
use chronmap::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

fn named(
    registry: &InstanceRegistry,
    backend: &MemoryBackend,
    name: &str,
) -> chronmap::Result<Arc<Store<String, String>>> {
    init_tracing();
    StoreBuilder::new()
        .name(name)
        .registry(registry)
        .memory_backend(backend.clone())
        .map_name(format!("map-{}", name.trim()))
        .key_codec(StringCodec)
        .value_codec(StringCodec)
        .snapshot_interval(IDLE_INTERVAL)
        .build()
}

#[test]
fn same_name_returns_same_instance() {
    let registry = InstanceRegistry::new();
    let backend = MemoryBackend::new();
    let a = named(&registry, &backend, "users").unwrap();
    let b = named(&registry, &backend, "users").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    a.put("k".into(), "v".into()).unwrap();
    assert_eq!(b.get(&"k".into()).unwrap(), Some("v".into()));
    assert_eq!(backend.open_count(), 1);
    registry.close_all();
}

#[test]
fn distinct_names_are_independent() {
    let registry = InstanceRegistry::new();
    let backend = MemoryBackend::new();
    let a = named(&registry, &backend, "a").unwrap();
    let b = named(&registry, &backend, "b").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    a.put("k".into(), "1".into()).unwrap();
    assert!(!b.contains_key(&"k".into()).unwrap());
    assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(registry.close_all(), 2);
}

#[test]
fn blank_names_are_never_shared() {
    let registry = InstanceRegistry::new();
    let backend = MemoryBackend::new();
    let a = named(&registry, &backend, "").unwrap();
    let b = named(&registry, &backend, "   ").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(registry.is_empty());
    a.close().unwrap();
    b.close().unwrap();
}

#[test]
fn concurrent_builds_create_one_instance() {
    let registry = InstanceRegistry::new();
    let backend = MemoryBackend::new();
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let backend = backend.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                named(&registry, &backend, "shared").unwrap()
            })
        })
        .collect();

    let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for store in &stores[1..] {
        assert!(Arc::ptr_eq(&stores[0], store));
    }
    assert_eq!(backend.open_count(), 1);
    assert_eq!(registry.len(), 1);
    registry.close_all();
}

#[test]
fn closed_store_is_replaced_and_reloads() {
    let registry = InstanceRegistry::new();
    let backend = MemoryBackend::new();

    let first = named(&registry, &backend, "cache").unwrap();
    first.put("k".into(), "v".into()).unwrap();
    first.close().unwrap();
    assert!(!registry.contains("cache"));

    let second = named(&registry, &backend, "cache").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.get(&"k".into()).unwrap(), Some("v".into()));
    assert_eq!(backend.open_count(), 2);
    second.close().unwrap();
}

#[test]
fn lookup_with_other_types_is_rejected() {
    let registry = InstanceRegistry::new();
    let backend = MemoryBackend::new();
    let store = named(&registry, &backend, "typed").unwrap();

    let err = StoreBuilder::<u64, String>::new()
        .name("typed")
        .registry(&registry)
        .memory_backend(backend.clone())
        .key_codec(BincodeCodec::new())
        .value_codec(StringCodec)
        .build()
        .unwrap_err();
    assert!(err.is_type_mismatch());
    assert!(registry.get::<u64, String>("typed").unwrap_err().is_type_mismatch());

    let found = registry.get::<String, String>("typed").unwrap().unwrap();
    assert!(Arc::ptr_eq(&store, &found));
    assert!(registry.get::<String, String>("missing").unwrap().is_none());
    registry.close_all();
}

#[test]
fn snapshot_all_and_statistics() {
    let registry = InstanceRegistry::new();
    let backend = MemoryBackend::new();
    let a = named(&registry, &backend, "alpha").unwrap();
    let b = named(&registry, &backend, "beta").unwrap();
    a.put("1".into(), "x".into()).unwrap();
    b.put("1".into(), "x".into()).unwrap();
    b.put("2".into(), "y".into()).unwrap();

    assert_eq!(registry.snapshot_all(), 2);
    assert_eq!(backend.committed_len("map-alpha"), 1);
    assert_eq!(backend.committed_len("map-beta"), 2);
    assert_eq!(registry.total_entries(), 3);

    let report = registry.statistics().to_string();
    assert!(report.starts_with("ChronMap registry statistics:"));
    assert!(report.contains("  instances: 2"));
    assert!(report.contains("  total entries: 3"));
    assert!(report.contains("  - alpha: 1 entries"));
    assert!(report.contains("  - beta: 2 entries"));

    assert_eq!(registry.close_all(), 2);
    assert!(registry.is_empty());
    assert!(a.is_closed() && b.is_closed());
}
