//! Named instance registry
//!
//! Maps logical names to live stores so every caller asking for the same name
//! shares one instance. Construction is serialized per name by a gate; lookups
//! of other names never wait on it.
//!
//! The registry is an ordinary value: create one per process (or per test)
//! and hand clones to whoever builds stores. Clones share state.
//!
//! # Type safety
//!
//! Entries are type-erased. A lookup with other key/value types than the
//! registered instance fails with [`Error::TypeMismatch`] instead of handing
//! out a wrong-typed store.

use crate::snapshot::FlushOutcome;
use crate::store::Store;
use chronmap_core::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::{type_name, Any};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use tracing::{error, info};

/// Type-erased view of a registered store
pub(crate) trait ManagedStore: Send + Sync {
    fn entry_count(&self) -> usize;
    fn force_snapshot(&self) -> Result<FlushOutcome>;
    fn close(&self) -> Result<()>;
    fn type_label(&self) -> String;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

fn type_label<K, V>() -> String {
    format!("{}, {}", type_name::<K>(), type_name::<V>())
}

impl<K, V> ManagedStore for Store<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn entry_count(&self) -> usize {
        self.len()
    }

    fn force_snapshot(&self) -> Result<FlushOutcome> {
        Store::force_snapshot(self)
    }

    fn close(&self) -> Result<()> {
        Store::close(self)
    }

    fn type_label(&self) -> String {
        type_label::<K, V>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

type Gate = Arc<Mutex<()>>;

#[derive(Default)]
pub(crate) struct RegistryInner {
    instances: DashMap<String, Arc<dyn ManagedStore>>,
    gates: DashMap<String, Gate>,
}

impl RegistryInner {
    fn gate(&self, name: &str) -> Gate {
        Arc::clone(
            self.gates
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drop the gate unless another caller holds a handle to it.
    ///
    /// Handles are only cloned under the map's shard lock, which `remove_if`
    /// also holds, so a count of one cannot grow concurrently.
    fn retire_gate(&self, name: &str) {
        self.gates.remove_if(name, |_, gate| Arc::strong_count(gate) == 1);
    }

    fn release(&self, name: &str, store: *const ()) {
        {
            let gate = self.gate(name);
            let _held = gate.lock();
            self.instances
                .remove_if(name, |_, entry| Arc::as_ptr(entry) as *const () == store);
        }
        self.retire_gate(name);
    }
}

/// Handle a registered store keeps to remove itself on close
pub(crate) struct Registration {
    name: String,
    registry: Weak<RegistryInner>,
}

impl Registration {
    pub(crate) fn release(self, store: *const ()) {
        if let Some(inner) = self.registry.upgrade() {
            inner.release(&self.name, store);
        }
    }
}

/// Per-instance line of [`RegistryStats`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStats {
    /// Registered name
    pub name: String,
    /// Live entries
    pub entries: usize,
}

/// Summary of every registered store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Registered stores, sorted by name
    pub instances: Vec<InstanceStats>,
    /// Sum of live entries
    pub total_entries: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ChronMap registry statistics:")?;
        writeln!(f, "  instances: {}", self.instances.len())?;
        writeln!(f, "  total entries: {}", self.total_entries)?;
        for instance in &self.instances {
            writeln!(f, "  - {}: {} entries", instance.name, instance.entries)?;
        }
        Ok(())
    }
}

/// Registry of named stores
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    inner: Arc<RegistryInner>,
}

impl InstanceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the store registered as `name`, or build and register one.
    ///
    /// `create` runs at most once per name among concurrent callers, while
    /// the name's gate is held. Its configuration is discarded when an
    /// instance already exists.
    pub(crate) fn get_or_create<K, V, F>(&self, name: &str, create: F) -> Result<Arc<Store<K, V>>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<Arc<Store<K, V>>>,
    {
        let gate = self.inner.gate(name);
        let result = {
            let _held = gate.lock();
            match self.lookup::<K, V>(name) {
                Ok(Some(existing)) => {
                    info!(store = %name, "Returning existing store instance");
                    Ok(existing)
                }
                Err(e) => Err(e),
                Ok(None) => create().map(|store| {
                    store.attach_registration(Registration {
                        name: name.to_string(),
                        registry: Arc::downgrade(&self.inner),
                    });
                    let erased: Arc<dyn ManagedStore> = store.clone();
                    self.inner.instances.insert(name.to_string(), erased);
                    info!(store = %name, "Registered new store instance");
                    store
                }),
            }
        };
        drop(gate);
        if result.is_err() {
            self.inner.retire_gate(name);
        }
        result
    }

    fn lookup<K, V>(&self, name: &str) -> Result<Option<Arc<Store<K, V>>>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let existing = match self.inner.instances.get(name) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Ok(None),
        };
        let actual = existing.type_label();
        existing
            .into_any()
            .downcast::<Store<K, V>>()
            .map(Some)
            .map_err(|_| Error::TypeMismatch {
                name: name.to_string(),
                expected: type_label::<K, V>(),
                actual,
            })
    }

    /// Registered store named `name`, if any
    pub fn get<K, V>(&self, name: &str) -> Result<Option<Arc<Store<K, V>>>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.lookup(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .instances
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Check if a store is registered as `name`
    pub fn contains(&self, name: &str) -> bool {
        self.inner.instances.contains_key(name)
    }

    /// Number of registered stores
    pub fn len(&self) -> usize {
        self.inner.instances.len()
    }

    /// Check if no store is registered
    pub fn is_empty(&self) -> bool {
        self.inner.instances.is_empty()
    }

    fn handles(&self) -> Vec<(String, Arc<dyn ManagedStore>)> {
        let mut handles: Vec<_> = self
            .inner
            .instances
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        handles
    }

    /// Force a snapshot of every registered store.
    ///
    /// Returns how many succeeded; failures are logged.
    pub fn snapshot_all(&self) -> usize {
        let mut ok = 0;
        for (name, store) in self.handles() {
            match store.force_snapshot() {
                Ok(_) => ok += 1,
                Err(e) => error!(store = %name, error = %e, "Snapshot failed"),
            }
        }
        info!(snapshotted = ok, "Snapshot of all stores complete");
        ok
    }

    /// Close every registered store.
    ///
    /// Returns how many closed cleanly; failures are logged. Every store
    /// leaves the registry either way.
    pub fn close_all(&self) -> usize {
        let mut ok = 0;
        for (name, store) in self.handles() {
            match store.close() {
                Ok(()) => ok += 1,
                Err(e) => error!(store = %name, error = %e, "Close failed"),
            }
        }
        info!(closed = ok, "Closed all stores");
        ok
    }

    /// Sum of live entries across registered stores
    pub fn total_entries(&self) -> usize {
        self.handles()
            .iter()
            .map(|(_, store)| store.entry_count())
            .sum()
    }

    /// Per-store entry counts and totals
    pub fn statistics(&self) -> RegistryStats {
        let instances: Vec<InstanceStats> = self
            .handles()
            .into_iter()
            .map(|(name, store)| InstanceStats {
                name,
                entries: store.entry_count(),
            })
            .collect();
        let total_entries = instances.iter().map(|i| i.entries).sum();
        RegistryStats {
            instances,
            total_entries,
        }
    }

    #[cfg(test)]
    fn gate_count(&self) -> usize {
        self.inner.gates.len()
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("names", &self.names())
            .finish()
    }
}
