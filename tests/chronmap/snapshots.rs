//! Snapshot Tests
//!
//! Debounced background flushes and manual snapshot semantics.

use crate::common::*;
use chronmap::prelude::*;
use std::time::Duration;

fn scheduled_store(backend: &MemoryBackend, interval: Duration) -> std::sync::Arc<Store<String, String>> {
    init_tracing();
    StoreBuilder::new()
        .memory_backend(backend.clone())
        .key_codec(StringCodec)
        .value_codec(StringCodec)
        .snapshot_interval(interval)
        .build()
        .unwrap()
}

#[test]
fn burst_of_mutations_commits_once() {
    let backend = MemoryBackend::new();
    let store = scheduled_store(&backend, Duration::from_millis(400));

    for i in 0..100 {
        store.put(format!("k{}", i), "v".into()).unwrap();
    }

    assert!(wait_for(Duration::from_secs(5), || backend.commit_count() >= 1));
    assert_eq!(backend.commit_count(), 1);
    assert_eq!(backend.upsert_count(), 100);
    assert_eq!(backend.committed_len("chronmap"), 100);

    // Idle store: further ticks find nothing to do
    std::thread::sleep(Duration::from_millis(900));
    assert_eq!(backend.commit_count(), 1);
    assert!(!store.stats().dirty);

    store.close().unwrap();
    assert_eq!(backend.commit_count(), 1);
    assert_eq!(backend.upsert_count(), 100);
}

#[test]
fn idle_store_never_commits() {
    let backend = MemoryBackend::new();
    let store = scheduled_store(&backend, Duration::from_millis(50));
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(backend.commit_count(), 0);
    store.close().unwrap();
    assert_eq!(backend.commit_count(), 0);
}

#[test]
fn later_mutation_triggers_another_commit() {
    let backend = MemoryBackend::new();
    let store = scheduled_store(&backend, Duration::from_millis(100));

    store.put("a".into(), "1".into()).unwrap();
    assert!(wait_for(Duration::from_secs(5), || backend.commit_count() == 1));

    store.put("b".into(), "2".into()).unwrap();
    assert!(wait_for(Duration::from_secs(5), || backend.commit_count() == 2));
    assert_eq!(backend.committed_len("chronmap"), 2);
    store.close().unwrap();
}

#[test]
fn manual_snapshot_is_idempotent() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    store.put("a".into(), "1".into()).unwrap();
    assert_eq!(store.snapshot().unwrap(), FlushOutcome::Flushed { entries: 1 });
    assert_eq!(store.snapshot().unwrap(), FlushOutcome::Clean);
    assert_eq!(backend.commit_count(), 1);

    assert_eq!(
        store.force_snapshot().unwrap(),
        FlushOutcome::Flushed { entries: 1 }
    );
    assert_eq!(backend.commit_count(), 2);

    store.close().unwrap();
    assert_eq!(backend.commit_count(), 2);
}

#[test]
fn removing_absent_key_keeps_store_clean() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    assert_eq!(store.remove(&"missing".into()).unwrap(), None);
    assert_eq!(store.snapshot().unwrap(), FlushOutcome::Clean);
    store.close().unwrap();
    assert_eq!(backend.commit_count(), 0);
}

#[test]
fn failed_manual_snapshot_is_retried() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);
    store.put("a".into(), "1".into()).unwrap();

    backend.set_fail_commits(true);
    let err = store.snapshot().unwrap_err();
    assert!(err.is_snapshot());
    assert!(store.stats().dirty);
    assert_eq!(store.stats().failed_flushes, 1);

    backend.set_fail_commits(false);
    assert_eq!(store.snapshot().unwrap(), FlushOutcome::Flushed { entries: 1 });
    assert_eq!(backend.committed_len("chronmap"), 1);
    store.close().unwrap();
}

#[test]
fn failed_final_snapshot_is_reported_by_close() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);
    store.put("a".into(), "1".into()).unwrap();

    backend.set_fail_commits(true);
    assert!(store.close().unwrap_err().is_snapshot());
    assert!(store.is_closed());
    assert!(store.close().is_ok());
    assert_eq!(backend.committed_len("chronmap"), 0);
}

#[test]
fn failed_scheduled_snapshot_keeps_store_usable() {
    let backend = MemoryBackend::new();
    let store = scheduled_store(&backend, Duration::from_millis(50));

    backend.set_fail_commits(true);
    store.put("a".into(), "1".into()).unwrap();
    assert!(wait_for(Duration::from_secs(5), || store.stats().failed_flushes >= 1));
    assert_eq!(store.get(&"a".into()).unwrap(), Some("1".into()));

    backend.set_fail_commits(false);
    store.put("b".into(), "2".into()).unwrap();
    assert!(wait_for(Duration::from_secs(5), || backend.committed_len("chronmap") == 2));
    store.close().unwrap();
}
