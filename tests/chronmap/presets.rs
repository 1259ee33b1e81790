//! Preset Tests
//!
//! Factory shortcuts through a shared registry and real files.

use crate::common::*;
use chronmap::presets;
use chronmap::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn simple_string_store_persists_by_name() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::new();

    let store = presets::simple_string_store(&registry, dir.path(), "greetings").unwrap();
    store.put("hello".into(), "world".into()).unwrap();
    let again = presets::simple_string_store(&registry, dir.path(), "greetings").unwrap();
    assert!(Arc::ptr_eq(&store, &again));
    assert_eq!(registry.close_all(), 1);
    assert!(dir.path().join("greetings.db").exists());

    let reopened = presets::simple_string_store(&registry, dir.path(), "greetings").unwrap();
    assert_eq!(reopened.get(&"hello".into()).unwrap(), Some("world".into()));
    registry.close_all();
}

#[test]
fn presets_share_one_registry() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::new();

    presets::fast_snapshot_store::<String, i64>(
        &registry,
        dir.path(),
        "counters",
        StringCodec,
        BincodeCodec::new(),
    )
    .unwrap();
    presets::simple_string_store(&registry, dir.path(), "labels").unwrap();

    assert_eq!(registry.names(), vec!["counters".to_string(), "labels".to_string()]);
    let err = presets::simple_string_store(&registry, dir.path(), "counters").unwrap_err();
    assert!(err.is_type_mismatch());
    assert_eq!(registry.close_all(), 2);
}

#[test]
fn temporary_store_round_trip() {
    init_tracing();
    let store = presets::temporary_store::<String, String>(StringCodec, StringCodec).unwrap();
    let location = store.durable_location().to_string();
    assert!(location.contains("chronmap-"));

    store.put("k".into(), "v".into()).unwrap();
    store.close().unwrap();
    assert!(std::path::Path::new(&location).exists());
    std::fs::remove_file(&location).unwrap();
    let _ = std::fs::remove_file(format!("{}.lock", location));
}
