//! Persistence Tests
//!
//! Data written before close is visible after reopening the same file.

use crate::common::*;
use chronmap::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn open_file_store(path: &Path) -> Arc<Store<String, String>> {
    init_tracing();
    StoreBuilder::new()
        .path(path)
        .key_codec(StringCodec)
        .value_codec(StringCodec)
        .snapshot_interval(IDLE_INTERVAL)
        .build()
        .unwrap()
}

#[test]
fn restart_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.db");

    let store = open_file_store(&path);
    store.put("a".into(), "1".into()).unwrap();
    store.put("b".into(), "2".into()).unwrap();
    store.close().unwrap();

    let reopened = open_file_store(&path);
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get(&"a".into()).unwrap(), Some("1".into()));
    assert_eq!(reopened.get(&"b".into()).unwrap(), Some("2".into()));
    assert_eq!(reopened.stats().loaded_entries, 2);
    reopened.close().unwrap();
}

#[test]
fn close_flushes_pending_changes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pending.db");

    let store = open_file_store(&path);
    store.put("k".into(), "v".into()).unwrap();
    assert!(!path.exists());
    store.close().unwrap();
    assert!(path.exists());

    let reopened = open_file_store(&path);
    assert_eq!(reopened.get(&"k".into()).unwrap(), Some("v".into()));
    reopened.close().unwrap();
}

#[test]
fn drop_flushes_pending_changes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dropped.db");

    {
        let store = open_file_store(&path);
        store.put("k".into(), "v".into()).unwrap();
    }

    let reopened = open_file_store(&path);
    assert_eq!(reopened.get(&"k".into()).unwrap(), Some("v".into()));
    reopened.close().unwrap();
}

#[test]
fn removals_and_clear_persist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("removals.db");

    let store = open_file_store(&path);
    for i in 0..10 {
        store.put(format!("k{}", i), i.to_string()).unwrap();
    }
    store.remove(&"k3".into()).unwrap();
    store.close().unwrap();

    let reopened = open_file_store(&path);
    assert_eq!(reopened.len(), 9);
    assert!(!reopened.contains_key(&"k3".into()).unwrap());
    reopened.clear().unwrap();
    reopened.close().unwrap();

    let emptied = open_file_store(&path);
    assert!(emptied.is_empty());
    emptied.close().unwrap();
}

#[test]
fn maps_in_one_file_are_independent() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.db");
    let open = |map: &str| {
        StoreBuilder::<String, String>::new()
            .path(&path)
            .map_name(map)
            .key_codec(StringCodec)
            .value_codec(StringCodec)
            .build()
            .unwrap()
    };

    let first = open("first");
    first.put("a".into(), "1".into()).unwrap();
    first.close().unwrap();

    let second = open("second");
    assert!(second.is_empty());
    second.put("b".into(), "2".into()).unwrap();
    second.close().unwrap();

    let first = open("first");
    assert_eq!(first.get(&"a".into()).unwrap(), Some("1".into()));
    assert!(!first.contains_key(&"b".into()).unwrap());
    first.close().unwrap();
}

#[test]
fn live_stores_cannot_share_a_file() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.db");
    let open = |map: &str| {
        StoreBuilder::<String, String>::new()
            .path(&path)
            .map_name(map)
            .key_codec(StringCodec)
            .value_codec(StringCodec)
            .snapshot_interval(IDLE_INTERVAL)
            .build()
    };

    let first = open("first").unwrap();
    first.put("a".into(), "1".into()).unwrap();
    first.snapshot().unwrap();

    let err = open("second").unwrap_err();
    assert!(err.is_locked());
    assert_eq!(first.get(&"a".into()).unwrap(), Some("1".into()));
    first.close().unwrap();

    let second = open("second").unwrap();
    second.put("b".into(), "2".into()).unwrap();
    second.close().unwrap();

    let first = open("first").unwrap();
    assert_eq!(first.get(&"a".into()).unwrap(), Some("1".into()));
    assert!(!first.contains_key(&"b".into()).unwrap());
    first.close().unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    hits: u32,
}

#[test]
fn typed_values_survive_restart() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions.db");
    let open = || {
        StoreBuilder::<u64, Session>::new()
            .path(&path)
            .key_codec(BincodeCodec::new())
            .value_codec(JsonCodec::new())
            .build()
            .unwrap()
    };

    let store = open();
    let session = Session {
        user: "alice".into(),
        hits: 3,
    };
    store.put(42, session.clone()).unwrap();
    store.close().unwrap();

    let reopened = open();
    assert_eq!(reopened.get(&42).unwrap(), Some(session));
    reopened.close().unwrap();
}

#[test]
fn corrupt_file_fails_to_open() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.db");
    std::fs::write(&path, b"definitely not a snapshot").unwrap();

    let result = StoreBuilder::<String, String>::new()
        .path(&path)
        .key_codec(StringCodec)
        .value_codec(StringCodec)
        .build();
    assert!(matches!(result, Err(Error::Corruption(_))));
}
