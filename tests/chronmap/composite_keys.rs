//! Composite Key Tests
//!
//! Keys derived from lists and rows, through the store facade.

use crate::common::*;
use chronmap::prelude::*;
use std::sync::Arc;

fn store_with_default(backend: &MemoryBackend) -> Arc<Store<String, String>> {
    init_tracing();
    StoreBuilder::new()
        .memory_backend(backend.clone())
        .key_codec(StringCodec)
        .value_codec(StringCodec)
        .snapshot_interval(IDLE_INTERVAL)
        .default_extractor(ColumnsByName::new(["tenant", "id"]).unwrap())
        .build()
        .unwrap()
}

#[test]
fn array_key_joins_with_nul() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    let source = Field::list(["user", "123", "profile"]);
    store.put_with(&source, "data".into(), &ArrayKey).unwrap();

    assert_eq!(
        store.get(&"user\u{0}123\u{0}profile".to_string()).unwrap(),
        Some("data".into())
    );
    assert_eq!(store.get_with(&source, &ArrayKey).unwrap(), Some("data".into()));
    assert!(store.contains_key_with(&source, &ArrayKey).unwrap());
    assert_eq!(
        store.get(&composite_key(["user", "123", "profile"])).unwrap(),
        Some("data".into())
    );
    store.close().unwrap();
}

#[test]
fn mixed_component_types() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    let source = Field::List(vec![Field::from("order"), Field::from(42i64)]);
    store.put_with(&source, "shipped".into(), &ArrayKey).unwrap();
    assert_eq!(
        store.get(&"order\u{0}42".to_string()).unwrap(),
        Some("shipped".into())
    );
    store.close().unwrap();
}

#[test]
fn single_element_array_equals_plain_key() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    store.put("solo".into(), "1".into()).unwrap();
    let source = Field::list(["solo"]);
    assert_eq!(store.get_with(&source, &ArrayKey).unwrap(), Some("1".into()));
    assert_eq!(store.remove_with(&source, &ArrayKey).unwrap(), Some("1".into()));
    assert!(store.is_empty());
    store.close().unwrap();
}

#[test]
fn invalid_sources_are_extraction_errors() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    let empty = Field::List(Vec::new());
    assert!(store
        .put_with(&empty, "x".into(), &ArrayKey)
        .unwrap_err()
        .is_extraction());
    assert!(store
        .get_with(KeySource::Null, &ArrayKey)
        .unwrap_err()
        .is_extraction());
    assert!(store
        .get_with(&Field::from("scalar"), &ArrayKey)
        .unwrap_err()
        .is_extraction());

    // Failed extraction leaves the store untouched
    assert!(store.is_empty());
    assert_eq!(store.snapshot().unwrap(), FlushOutcome::Clean);
    store.close().unwrap();
}

#[test]
fn row_columns_by_name_and_index_agree() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    let row = Record::new()
        .with("tenant", "acme")
        .with("region", "eu")
        .with("id", 7i64);
    let by_name = ColumnsByName::new(["tenant", "id"]).unwrap();
    let by_index = ColumnsByIndex::new(&[1, 3]).unwrap();

    store.put_with(&row, "row".into(), &by_name).unwrap();
    assert_eq!(store.get_with(&row, &by_index).unwrap(), Some("row".into()));
    assert_eq!(
        store.get(&"acme\u{0}7".to_string()).unwrap(),
        Some("row".into())
    );
    store.close().unwrap();
}

#[test]
fn missing_column_is_reported() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);

    let row = Record::new().with("tenant", "acme");
    let by_name = ColumnsByName::new(["tenant", "id"]).unwrap();
    let err = store.get_with(&row, &by_name).unwrap_err();
    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::Retrieval { ref column, .. }) if column == "id"
    ));

    let by_index = ColumnsByIndex::new(&[5]).unwrap();
    assert!(store.get_with(&row, &by_index).unwrap_err().is_extraction());
    store.close().unwrap();
}

#[test]
fn default_extractor_operations() {
    let backend = MemoryBackend::new();
    let store = store_with_default(&backend);
    assert!(store.has_default_extractor());

    let row = Record::new().with("tenant", "acme").with("id", 1i64);
    store.put_extracted(&row, "first".into()).unwrap();
    assert!(store.contains_key_extracted(&row).unwrap());
    assert_eq!(store.get_extracted(&row).unwrap(), Some("first".into()));
    assert_eq!(store.remove_extracted(&row).unwrap(), Some("first".into()));
    store.close().unwrap();
}

#[test]
fn missing_default_extractor_is_configuration_error() {
    let backend = MemoryBackend::new();
    let store = memory_store(&backend);
    let row = Record::new().with("tenant", "acme");
    assert!(store.get_extracted(&row).unwrap_err().is_configuration());
    store.close().unwrap();
}

#[test]
fn identity_extractor_for_typed_keys() {
    init_tracing();
    let store = StoreBuilder::<i64, String>::new()
        .memory_backend(MemoryBackend::new())
        .key_codec(BincodeCodec::new())
        .value_codec(StringCodec)
        .build()
        .unwrap();

    store.put_with(&Field::Int(9), "nine".into(), &Identity).unwrap();
    assert_eq!(store.get(&9).unwrap(), Some("nine".into()));
    assert!(store
        .get_with(&Field::from("nine"), &Identity)
        .unwrap_err()
        .is_extraction());
    store.close().unwrap();
}
