//! Factory shortcuts for common store shapes
//!
//! | Preset | Interval | Notes |
//! |--------|----------|-------|
//! | [`simple_string_store`] | 30 s | `String` keys and values |
//! | [`simple_store`] | 30 s | any types with codecs |
//! | [`large_store`] | 60 s | caller-supplied capacity hints |
//! | [`fast_snapshot_store`] | 5 s | small loss window |
//! | [`temporary_store`] | 30 s | unnamed, file in the system temp dir |
//!
//! Named presets register in the given registry, so calling one twice with
//! the same name returns the same store.

use chronmap_core::{Codec, Error, Result, StringCodec};
use chronmap_engine::{InstanceRegistry, Store, StoreBuilder};
use chronmap_storage::CapacityHints;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Interval used by [`large_store`]
pub const LARGE_STORE_INTERVAL: Duration = Duration::from_secs(60);

/// Interval used by [`fast_snapshot_store`]
pub const FAST_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5);

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::configuration("store name cannot be blank"));
    }
    Ok(())
}

fn named<K, V>(
    registry: &InstanceRegistry,
    data_dir: &Path,
    name: &str,
    key_codec: impl Codec<K> + 'static,
    value_codec: impl Codec<V> + 'static,
) -> Result<StoreBuilder<K, V>> {
    require_name(name)?;
    Ok(StoreBuilder::new()
        .name(name)
        .data_dir(data_dir)
        .registry(registry)
        .key_codec(key_codec)
        .value_codec(value_codec))
}

/// Store with `String` keys and values, file `<data_dir>/<name>.db`.
pub fn simple_string_store(
    registry: &InstanceRegistry,
    data_dir: impl AsRef<Path>,
    name: &str,
) -> Result<Arc<Store<String, String>>> {
    let builder = named(registry, data_dir.as_ref(), name, StringCodec, StringCodec)?;
    info!(store = %name, "Creating simple string store");
    builder.build()
}

/// Store with default settings for any key/value types.
pub fn simple_store<K, V>(
    registry: &InstanceRegistry,
    data_dir: impl AsRef<Path>,
    name: &str,
    key_codec: impl Codec<K> + 'static,
    value_codec: impl Codec<V> + 'static,
) -> Result<Arc<Store<K, V>>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let builder = named(registry, data_dir.as_ref(), name, key_codec, value_codec)?;
    info!(store = %name, "Creating simple store");
    builder.build()
}

/// Store sized for many entries, snapshotting every 60 seconds.
pub fn large_store<K, V>(
    registry: &InstanceRegistry,
    data_dir: impl AsRef<Path>,
    name: &str,
    key_codec: impl Codec<K> + 'static,
    value_codec: impl Codec<V> + 'static,
    hints: CapacityHints,
) -> Result<Arc<Store<K, V>>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let builder = named(registry, data_dir.as_ref(), name, key_codec, value_codec)?;
    info!(store = %name, entries = hints.entries, "Creating large store");
    builder
        .entries(hints.entries)
        .average_key_size(hints.average_key_size)
        .average_value_size(hints.average_value_size)
        .snapshot_interval(LARGE_STORE_INTERVAL)
        .build()
}

/// Store snapshotting every 5 seconds.
pub fn fast_snapshot_store<K, V>(
    registry: &InstanceRegistry,
    data_dir: impl AsRef<Path>,
    name: &str,
    key_codec: impl Codec<K> + 'static,
    value_codec: impl Codec<V> + 'static,
) -> Result<Arc<Store<K, V>>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let builder = named(registry, data_dir.as_ref(), name, key_codec, value_codec)?;
    info!(store = %name, "Creating fast-snapshot store");
    builder.snapshot_interval(FAST_SNAPSHOT_INTERVAL).build()
}

/// Path for a fresh temporary snapshot file
pub fn temporary_path() -> PathBuf {
    std::env::temp_dir().join(format!("chronmap-{}.db", Uuid::new_v4()))
}

/// Unnamed, unregistered store backed by a fresh file in the system temp
/// directory. The file and its `.lock` sibling are left in place after close.
pub fn temporary_store<K, V>(
    key_codec: impl Codec<K> + 'static,
    value_codec: impl Codec<V> + 'static,
) -> Result<Arc<Store<K, V>>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let path = temporary_path();
    info!(path = %path.display(), "Creating temporary store");
    StoreBuilder::new()
        .path(path)
        .key_codec(key_codec)
        .value_codec(value_codec)
        .build()
}
