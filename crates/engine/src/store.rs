//! Store facade
//!
//! A [`Store`] composes one volatile store, one durable store, the snapshot
//! engine and the scheduler. Reads and writes go straight to the volatile
//! store; every successful mutation marks the store dirty and the scheduler
//! writes it back on its next tick.
//!
//! # Example
//!
//! ```ignore
//! let store = StoreBuilder::<String, String>::new()
//!     .name("sessions")
//!     .data_dir(&dir)
//!     .key_codec(StringCodec)
//!     .value_codec(StringCodec)
//!     .build()?;
//!
//! store.put("user\0123".into(), "data".into())?;
//! store.close()?;
//! ```

use crate::builder::StoreBuilder;
use crate::registry::Registration;
use crate::scheduler::Scheduler;
use crate::snapshot::{EngineState, FlushOutcome, SnapshotEngine};
use chronmap_core::{DurableStore, Error, KeyExtractor, KeySource, Result, VolatileStore};
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Snapshot of a store's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Logical name, if any
    pub name: Option<String>,
    /// Live entries
    pub entries: usize,
    /// Entries loaded at open
    pub loaded_entries: u64,
    /// Successful flushes
    pub flushes: u64,
    /// Failed flushes
    pub failed_flushes: u64,
    /// Entries written by the last successful flush
    pub last_flush_entries: u64,
    /// Unflushed mutations pending
    pub dirty: bool,
    /// Engine state
    pub state: EngineState,
}

/// Everything needed to open a store, resolved by the builder
pub(crate) struct StoreParts<K, V> {
    pub(crate) name: Option<String>,
    pub(crate) volatile: Arc<dyn VolatileStore<K, V>>,
    pub(crate) durable: Box<dyn DurableStore<K, V>>,
    pub(crate) snapshot_interval: Duration,
    pub(crate) shutdown_grace: Duration,
    pub(crate) default_extractor: Option<Arc<dyn KeyExtractor<K>>>,
}

/// Write-back key-value store
pub struct Store<K, V> {
    name: Option<String>,
    engine: Arc<SnapshotEngine<K, V>>,
    scheduler: Mutex<Option<Scheduler>>,
    snapshot_interval: Duration,
    shutdown_grace: Duration,
    default_extractor: Option<Arc<dyn KeyExtractor<K>>>,
    registration: Mutex<Option<Registration>>,
    closed: AtomicBool,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Start configuring a store
    pub fn builder() -> StoreBuilder<K, V> {
        StoreBuilder::new()
    }

    /// Load, start the scheduler, return the running store.
    pub(crate) fn open(parts: StoreParts<K, V>) -> Result<Arc<Self>> {
        let StoreParts {
            name,
            volatile,
            durable,
            snapshot_interval,
            shutdown_grace,
            default_extractor,
        } = parts;

        let label = name.clone().unwrap_or_else(|| durable.location());
        let engine = Arc::new(SnapshotEngine::new(label.clone(), volatile, durable));

        let loaded = match engine.load() {
            Ok(n) => n,
            Err(e) => {
                Self::abandon(&engine, &label);
                return Err(e);
            }
        };

        let ticker = Arc::clone(&engine);
        let scheduler = match Scheduler::start(&label, snapshot_interval, move || {
            ticker.run_scheduled_cycle()
        }) {
            Ok(s) => s,
            Err(e) => {
                Self::abandon(&engine, &label);
                return Err(e);
            }
        };

        info!(
            store = %label,
            location = %engine.location(),
            interval_ms = snapshot_interval.as_millis() as u64,
            loaded,
            "Store opened"
        );

        Ok(Arc::new(Self {
            name,
            engine,
            scheduler: Mutex::new(Some(scheduler)),
            snapshot_interval,
            shutdown_grace,
            default_extractor,
            registration: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }

    /// Release an engine whose store failed to open.
    fn abandon(engine: &SnapshotEngine<K, V>, label: &str) {
        if let Err(e) = engine.close() {
            error!(store = %label, error = %e, "Releasing store after failed open failed");
        }
    }

    // ========================================================================
    // Key-value operations
    // ========================================================================

    /// Insert or overwrite, returning the previous value.
    pub fn put(&self, key: K, value: V) -> Result<Option<V>> {
        self.ensure_open()?;
        let previous = self.engine.volatile().insert(key, value);
        self.engine.dirty().mark_dirty();
        Ok(previous)
    }

    /// Value for `key`
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        self.ensure_open()?;
        Ok(self.engine.volatile().get(key))
    }

    /// Remove `key`, returning the previous value.
    ///
    /// Only marks the store dirty when something was removed.
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        self.ensure_open()?;
        let previous = self.engine.volatile().remove(key);
        if previous.is_some() {
            self.engine.dirty().mark_dirty();
        }
        Ok(previous)
    }

    /// Check if `key` is present
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.engine.volatile().contains_key(key))
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<()> {
        self.ensure_open()?;
        self.engine.volatile().clear();
        self.engine.dirty().mark_dirty();
        Ok(())
    }

    /// Number of live entries (0 once closed)
    pub fn len(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.engine.volatile().len()
    }

    /// Check if there are no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Composite-key operations
    // ========================================================================

    /// [`put`](Self::put) with a key derived by `extractor`
    pub fn put_with<'a, E>(&self, source: impl Into<KeySource<'a>>, value: V, extractor: &E) -> Result<Option<V>>
    where
        E: KeyExtractor<K> + ?Sized,
    {
        let key = extractor.extract(source.into())?;
        self.put(key, value)
    }

    /// [`get`](Self::get) with a key derived by `extractor`
    pub fn get_with<'a, E>(&self, source: impl Into<KeySource<'a>>, extractor: &E) -> Result<Option<V>>
    where
        E: KeyExtractor<K> + ?Sized,
    {
        let key = extractor.extract(source.into())?;
        self.get(&key)
    }

    /// [`remove`](Self::remove) with a key derived by `extractor`
    pub fn remove_with<'a, E>(&self, source: impl Into<KeySource<'a>>, extractor: &E) -> Result<Option<V>>
    where
        E: KeyExtractor<K> + ?Sized,
    {
        let key = extractor.extract(source.into())?;
        self.remove(&key)
    }

    /// [`contains_key`](Self::contains_key) with a key derived by `extractor`
    pub fn contains_key_with<'a, E>(&self, source: impl Into<KeySource<'a>>, extractor: &E) -> Result<bool>
    where
        E: KeyExtractor<K> + ?Sized,
    {
        let key = extractor.extract(source.into())?;
        self.contains_key(&key)
    }

    fn default_extractor(&self) -> Result<&dyn KeyExtractor<K>> {
        self.default_extractor.as_deref().ok_or_else(|| {
            Error::configuration(format!(
                "store '{}' has no default key extractor",
                self.display_name()
            ))
        })
    }

    /// [`put`](Self::put) with a key derived by the default extractor
    pub fn put_extracted<'a>(&self, source: impl Into<KeySource<'a>>, value: V) -> Result<Option<V>> {
        self.put_with(source, value, self.default_extractor()?)
    }

    /// [`get`](Self::get) with a key derived by the default extractor
    pub fn get_extracted<'a>(&self, source: impl Into<KeySource<'a>>) -> Result<Option<V>> {
        self.get_with(source, self.default_extractor()?)
    }

    /// [`remove`](Self::remove) with a key derived by the default extractor
    pub fn remove_extracted<'a>(&self, source: impl Into<KeySource<'a>>) -> Result<Option<V>> {
        self.remove_with(source, self.default_extractor()?)
    }

    /// [`contains_key`](Self::contains_key) with a key derived by the default extractor
    pub fn contains_key_extracted<'a>(&self, source: impl Into<KeySource<'a>>) -> Result<bool> {
        self.contains_key_with(source, self.default_extractor()?)
    }

    // ========================================================================
    // Snapshots and lifecycle
    // ========================================================================

    /// Flush now if anything changed since the last flush.
    ///
    /// Returns [`FlushOutcome::Clean`] without touching the durable store
    /// when nothing changed. Errors propagate to the caller.
    pub fn snapshot(&self) -> Result<FlushOutcome> {
        self.ensure_open()?;
        self.engine.flush_if_dirty()
    }

    /// Flush now, even if nothing changed.
    pub fn force_snapshot(&self) -> Result<FlushOutcome> {
        self.ensure_open()?;
        self.engine.force_flush()
    }

    /// Stop the scheduler, flush pending changes, release both stores and
    /// leave the registry. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(mut scheduler) = self.scheduler.lock().take() {
            scheduler.stop(self.shutdown_grace);
        }
        let result = self.engine.close();

        if let Some(registration) = self.registration.lock().take() {
            registration.release(self as *const Self as *const ());
        }

        match &result {
            Ok(()) => info!(store = %self.display_name(), "Store closed"),
            Err(e) => error!(store = %self.display_name(), error = %e, "Store closed with failed final snapshot"),
        }
        result
    }

    /// Check if `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed(self.display_name()));
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Logical name, `None` for unnamed stores
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.engine.location().to_string())
    }

    /// Underlying volatile store
    pub fn volatile_store(&self) -> Arc<dyn VolatileStore<K, V>> {
        Arc::clone(self.engine.volatile())
    }

    /// Location of the durable store
    pub fn durable_location(&self) -> &str {
        self.engine.location()
    }

    /// Interval between scheduled snapshots
    pub fn snapshot_interval(&self) -> Duration {
        self.snapshot_interval
    }

    /// Check if a default key extractor is configured
    pub fn has_default_extractor(&self) -> bool {
        self.default_extractor.is_some()
    }

    /// Counters and state
    pub fn stats(&self) -> StoreStats {
        let s = self.engine.stats();
        StoreStats {
            name: self.name.clone(),
            entries: self.len(),
            loaded_entries: s.loaded_entries,
            flushes: s.flushes,
            failed_flushes: s.failed_flushes,
            last_flush_entries: s.last_flush_entries,
            dirty: s.dirty,
            state: s.state,
        }
    }

    pub(crate) fn attach_registration(&self, registration: Registration) {
        *self.registration.lock() = Some(registration);
    }
}

impl<K, V> Drop for Store<K, V> {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut scheduler) = self.scheduler.lock().take() {
            scheduler.stop(self.shutdown_grace);
        }
        if let Err(e) = self.engine.close() {
            error!(
                location = %self.engine.location(),
                error = %e,
                "Final snapshot on drop failed"
            );
        }
    }
}

impl<K, V> fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("location", &self.engine.location())
            .field("snapshot_interval", &self.snapshot_interval)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
