//! Sharded volatile store
//!
//! DashMap sharded by key hash, FxHash within each shard.
//! Lock-free reads, sharded writes, O(1) lookups.
//!
//! # Design
//!
//! - DashMap: shard count chosen by DashMap from available parallelism
//! - FxHash: fast non-crypto hash, keys are trusted local data
//! - Capacity hints: pre-size the table so bulk loads avoid rehashing
//!
//! # Thread Safety
//!
//! All operations are thread-safe:
//! - get(): only takes the target shard's read lock
//! - insert()/remove(): only lock the target shard
//! - for_each(): visits shards one at a time, concurrent writers to other
//!   shards proceed

use chronmap_core::{Result, VolatileStore};
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash};
use tracing::debug;

/// FxHash builder for DashMap
type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Advisory sizing for a volatile store
///
/// Only `entries` affects allocation; the average sizes feed the footprint
/// estimate logged at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityHints {
    /// Expected number of entries
    pub entries: usize,
    /// Expected average key size in bytes
    pub average_key_size: usize,
    /// Expected average value size in bytes
    pub average_value_size: usize,
}

impl CapacityHints {
    /// Default expected entry count
    pub const DEFAULT_ENTRIES: usize = 10_000;
    /// Default average key size in bytes
    pub const DEFAULT_AVERAGE_KEY_SIZE: usize = 20;
    /// Default average value size in bytes
    pub const DEFAULT_AVERAGE_VALUE_SIZE: usize = 100;

    /// Create hints
    pub fn new(entries: usize, average_key_size: usize, average_value_size: usize) -> Self {
        Self {
            entries,
            average_key_size,
            average_value_size,
        }
    }

    /// Estimated payload footprint in bytes
    pub fn estimated_bytes(&self) -> usize {
        self.entries
            .saturating_mul(self.average_key_size.saturating_add(self.average_value_size))
    }
}

impl Default for CapacityHints {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_ENTRIES,
            Self::DEFAULT_AVERAGE_KEY_SIZE,
            Self::DEFAULT_AVERAGE_VALUE_SIZE,
        )
    }
}

/// Sharded in-memory map implementing [`VolatileStore`]
///
/// # Example
///
/// ```ignore
/// use chronmap_storage::{CapacityHints, ShardedMap};
///
/// let map: ShardedMap<String, String> = ShardedMap::with_hints(CapacityHints::default());
/// map.insert("k".into(), "v".into());
/// ```
pub struct ShardedMap<K, V> {
    data: DashMap<K, V, FxBuildHasher>,
    hints: CapacityHints,
}

impl<K, V> ShardedMap<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty map with default hints
    pub fn new() -> Self {
        Self::with_hints(CapacityHints::default())
    }

    /// Create a map pre-sized for `hints.entries`
    pub fn with_hints(hints: CapacityHints) -> Self {
        debug!(
            entries = hints.entries,
            estimated_bytes = hints.estimated_bytes(),
            "Allocating sharded volatile store"
        );
        Self {
            data: DashMap::with_capacity_and_hasher(hints.entries, FxBuildHasher::default()),
            hints,
        }
    }

    /// Hints this map was created with
    pub fn hints(&self) -> CapacityHints {
        self.hints
    }
}

impl<K, V> Default for ShardedMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> VolatileStore<K, V> for ShardedMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    #[inline]
    fn get(&self, key: &K) -> Option<V> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    #[inline]
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.data.insert(key, value)
    }

    #[inline]
    fn remove(&self, key: &K) -> Option<V> {
        self.data.remove(key).map(|(_, v)| v)
    }

    #[inline]
    fn contains_key(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    fn clear(&self) {
        self.data.clear();
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn for_each(&self, f: &mut dyn FnMut(&K, &V) -> Result<()>) -> Result<()> {
        for entry in self.data.iter() {
            f(entry.key(), entry.value())?;
        }
        Ok(())
    }

    fn close(&self) {
        self.data.clear();
        self.data.shrink_to_fit();
    }
}

impl<K, V> fmt::Debug for ShardedMap<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedMap")
            .field("len", &self.data.len())
            .field("hints", &self.hints)
            .finish()
    }
}
