//! Store configuration
//!
//! [`StoreBuilder`] collects settings and validates them in [`build`]:
//!
//! | Setting | Default | Constraint |
//! |---------|---------|------------|
//! | `snapshot_interval` | 30 s | > 0 |
//! | `entries` | 10 000 | > 0 |
//! | `average_key_size` | 20 | > 0 |
//! | `average_value_size` | 100 | > 0 |
//! | `map_name` | `"chronmap"` | not blank |
//! | `shutdown_grace` | 10 s | |
//! | `data_dir` | `.` | |
//!
//! The durable store is resolved in this order: an explicit `durable_store`,
//! a `memory_backend`, an explicit `path`, or `<data_dir>/<name>.db` when a
//! non-blank name is set. A name that derives the file may not contain path
//! separators or NUL, and may not be `.` or `..`. Codecs are required for
//! every option except an explicit `durable_store`.
//!
//! With a registry attached and a non-blank name, `build` returns the live
//! instance registered under that name (or creates and registers it).
//!
//! [`build`]: StoreBuilder::build

use crate::registry::InstanceRegistry;
use crate::scheduler::DEFAULT_SHUTDOWN_GRACE;
use crate::store::{Store, StoreParts};
use chronmap_core::{Codec, DurableStore, Error, KeyExtractor, Result, VolatileStore};
use chronmap_durability::{FileDurableStore, MemoryBackend};
use chronmap_storage::{CapacityHints, ShardedMap};
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between scheduled snapshots
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

/// Default name of the map inside the durable file
pub const DEFAULT_MAP_NAME: &str = "chronmap";

enum Location {
    Memory(MemoryBackend),
    File(PathBuf),
}

/// Builder for [`Store`]
pub struct StoreBuilder<K, V> {
    name: Option<String>,
    data_dir: PathBuf,
    path: Option<PathBuf>,
    durable_store: Option<Box<dyn DurableStore<K, V>>>,
    memory_backend: Option<MemoryBackend>,
    volatile_store: Option<Arc<dyn VolatileStore<K, V>>>,
    hints: CapacityHints,
    map_name: String,
    snapshot_interval: Duration,
    shutdown_grace: Duration,
    key_codec: Option<Arc<dyn Codec<K>>>,
    value_codec: Option<Arc<dyn Codec<V>>>,
    default_extractor: Option<Arc<dyn KeyExtractor<K>>>,
    registry: Option<InstanceRegistry>,
}

impl<K, V> Default for StoreBuilder<K, V> {
    fn default() -> Self {
        Self {
            name: None,
            data_dir: PathBuf::from("."),
            path: None,
            durable_store: None,
            memory_backend: None,
            volatile_store: None,
            hints: CapacityHints::default(),
            map_name: DEFAULT_MAP_NAME.to_string(),
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            key_codec: None,
            value_codec: None,
            default_extractor: None,
            registry: None,
        }
    }
}

impl<K, V> StoreBuilder<K, V> {
    /// Create a builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical name (registry key and file-name stem)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Directory for name-derived snapshot files
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Explicit snapshot file
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use a caller-provided durable store
    pub fn durable_store(mut self, store: impl DurableStore<K, V> + 'static) -> Self {
        self.durable_store = Some(Box::new(store));
        self
    }

    /// Commit snapshots to an in-process backend instead of a file
    pub fn memory_backend(mut self, backend: MemoryBackend) -> Self {
        self.memory_backend = Some(backend);
        self
    }

    /// Use a caller-provided volatile store (capacity hints are then ignored)
    pub fn volatile_store(mut self, store: Arc<dyn VolatileStore<K, V>>) -> Self {
        self.volatile_store = Some(store);
        self
    }

    /// Expected number of entries
    pub fn entries(mut self, entries: usize) -> Self {
        self.hints.entries = entries;
        self
    }

    /// Expected average key size in bytes
    pub fn average_key_size(mut self, bytes: usize) -> Self {
        self.hints.average_key_size = bytes;
        self
    }

    /// Expected average value size in bytes
    pub fn average_value_size(mut self, bytes: usize) -> Self {
        self.hints.average_value_size = bytes;
        self
    }

    /// Name of the map inside the snapshot file
    pub fn map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = map_name.into();
        self
    }

    /// Interval between scheduled snapshots
    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Interval between scheduled snapshots, in seconds
    pub fn snapshot_interval_secs(self, secs: u64) -> Self {
        self.snapshot_interval(Duration::from_secs(secs))
    }

    /// How long `close` waits for an in-flight scheduled snapshot
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Key codec for the durable store
    pub fn key_codec(mut self, codec: impl Codec<K> + 'static) -> Self {
        self.key_codec = Some(Arc::new(codec));
        self
    }

    /// Value codec for the durable store
    pub fn value_codec(mut self, codec: impl Codec<V> + 'static) -> Self {
        self.value_codec = Some(Arc::new(codec));
        self
    }

    /// Extractor used by the `*_extracted` operations
    pub fn default_extractor(mut self, extractor: impl KeyExtractor<K> + 'static) -> Self {
        self.default_extractor = Some(Arc::new(extractor));
        self
    }

    /// Register the store under its name in `registry`
    pub fn registry(mut self, registry: &InstanceRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    /// Name if present and not blank
    fn registered_name(&self) -> Option<String> {
        self.name
            .as_ref()
            .filter(|n| !n.trim().is_empty())
            .cloned()
    }

    fn validate(&self) -> Result<()> {
        if self.snapshot_interval.is_zero() {
            return Err(Error::configuration("snapshot interval must be > 0"));
        }
        if self.hints.entries == 0 {
            return Err(Error::configuration("entries must be > 0"));
        }
        if self.hints.average_key_size == 0 {
            return Err(Error::configuration("average key size must be > 0"));
        }
        if self.hints.average_value_size == 0 {
            return Err(Error::configuration("average value size must be > 0"));
        }
        if self.map_name.trim().is_empty() {
            return Err(Error::configuration("map name cannot be blank"));
        }
        if self.derives_file() {
            if let Some(name) = self.registered_name() {
                check_file_stem(&name)?;
            }
        }
        Ok(())
    }

    /// Check if the durable file will be `<data_dir>/<name>.db`
    fn derives_file(&self) -> bool {
        self.durable_store.is_none() && self.memory_backend.is_none() && self.path.is_none()
    }
}

/// Names that derive a file must stay inside `data_dir`.
fn check_file_stem(name: &str) -> Result<()> {
    if name.contains(['/', '\\', '\0']) || matches!(name.trim(), "." | "..") {
        return Err(Error::configuration(format!(
            "store name '{}' cannot be used as a file name; set an explicit path",
            name.escape_default()
        )));
    }
    Ok(())
}

impl<K, V> StoreBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Validate and open the store (or return the registered instance).
    pub fn build(mut self) -> Result<Arc<Store<K, V>>> {
        self.validate()?;
        match (self.registry.take(), self.registered_name()) {
            (Some(registry), Some(name)) => registry.get_or_create(&name, move || self.open_store()),
            _ => self.open_store(),
        }
    }

    fn open_store(self) -> Result<Arc<Store<K, V>>> {
        let name = self.registered_name();

        let durable: Box<dyn DurableStore<K, V>> = match self.durable_store {
            Some(store) => store,
            None => {
                let location = if let Some(backend) = self.memory_backend {
                    Location::Memory(backend)
                } else if let Some(path) = self.path {
                    Location::File(path)
                } else if let Some(name) = &name {
                    Location::File(self.data_dir.join(format!("{}.db", name)))
                } else {
                    return Err(Error::configuration(
                        "durable location required: set a path, a memory backend, \
                         a durable store, or a non-blank name",
                    ));
                };
                let key_codec = self.key_codec.ok_or_else(|| {
                    Error::configuration("key codec required to open the durable store")
                })?;
                let value_codec = self.value_codec.ok_or_else(|| {
                    Error::configuration("value codec required to open the durable store")
                })?;
                match location {
                    Location::Memory(backend) => {
                        Box::new(backend.open(self.map_name, key_codec, value_codec))
                    }
                    Location::File(path) => Box::new(FileDurableStore::open(
                        path,
                        self.map_name,
                        key_codec,
                        value_codec,
                    )?),
                }
            }
        };

        let volatile = self
            .volatile_store
            .unwrap_or_else(|| Arc::new(ShardedMap::with_hints(self.hints)));

        Store::open(StoreParts {
            name,
            volatile,
            durable,
            snapshot_interval: self.snapshot_interval,
            shutdown_grace: self.shutdown_grace,
            default_extractor: self.default_extractor,
        })
    }
}
