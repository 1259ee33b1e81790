//! Store capabilities
//!
//! A Store sits between two capabilities:
//!
//! | Capability | Role | Shared? |
//! |------------|------|---------|
//! | [`VolatileStore`] | live entries, every read and write | `&self`, any thread |
//! | [`DurableStore`] | last committed snapshot | `&mut self`, behind the flush lock |
//!
//! The snapshot engine only needs these operations, so both sides can be
//! swapped (sharded map, file, in-memory backend, or a caller's own type).

use crate::error::Result;

/// In-memory capability holding the live entries.
///
/// Implementations must be safe to call from any thread.
pub trait VolatileStore<K, V>: Send + Sync {
    /// Value for `key`, if present
    fn get(&self, key: &K) -> Option<V>;

    /// Insert, returning the previous value
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Remove, returning the previous value
    fn remove(&self, key: &K) -> Option<V>;

    /// Check if `key` is present
    fn contains_key(&self, key: &K) -> bool;

    /// Remove every entry
    fn clear(&self);

    /// Number of entries
    fn len(&self) -> usize;

    /// Check if there are no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every entry, stopping at the first error.
    ///
    /// Entries inserted or removed concurrently may or may not be visited.
    fn for_each(&self, f: &mut dyn FnMut(&K, &V) -> Result<()>) -> Result<()>;

    /// Release resources. Called once, after the final flush.
    fn close(&self) {}
}

/// Durable capability holding the last committed snapshot.
///
/// Changes made through [`upsert`](Self::upsert) and [`clear`](Self::clear)
/// become visible to a later open only after [`commit`](Self::commit).
pub trait DurableStore<K, V>: Send {
    /// Visit every committed entry, stopping at the first error.
    fn for_each(&mut self, f: &mut dyn FnMut(K, V) -> Result<()>) -> Result<()>;

    /// Stage an insert or overwrite
    fn upsert(&mut self, key: &K, value: &V) -> Result<()>;

    /// Stage removal of every entry
    fn clear(&mut self) -> Result<()>;

    /// Make staged changes durable
    fn commit(&mut self) -> Result<()>;

    /// Number of entries (staged view)
    fn len(&self) -> usize;

    /// Check if there are no entries (staged view)
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release the store. Staged, uncommitted changes are discarded.
    fn close(&mut self) -> Result<()>;

    /// Human-readable location (file path, backend name)
    fn location(&self) -> String;
}
