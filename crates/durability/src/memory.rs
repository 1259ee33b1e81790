//! In-memory durable store
//!
//! [`MemoryBackend`] plays the role of the snapshot file: it outlives the
//! stores opened on it, so a store can be closed and reopened inside one
//! process and find its last commit. Handles are cheap clones sharing one
//! backend.
//!
//! The backend counts opens, upserts and commits, and can be told to fail
//! commits. Tests use both to observe flush behavior.

use crate::format::RawMap;
use chronmap_core::{Codec, DurableStore, Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct BackendShared {
    maps: Mutex<BTreeMap<String, RawMap>>,
    open_count: AtomicU64,
    upsert_count: AtomicU64,
    commit_count: AtomicU64,
    fail_commits: AtomicBool,
}

/// Shared committed state for [`MemoryDurableStore`]s
#[derive(Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<BackendShared>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store on `map_name`
    pub fn open<K, V>(
        &self,
        map_name: impl Into<String>,
        key_codec: Arc<dyn Codec<K>>,
        value_codec: Arc<dyn Codec<V>>,
    ) -> MemoryDurableStore<K, V> {
        let map_name = map_name.into();
        let working = self
            .shared
            .maps
            .lock()
            .get(&map_name)
            .cloned()
            .unwrap_or_default();
        self.shared.open_count.fetch_add(1, Ordering::Relaxed);
        debug!(map = %map_name, entries = working.len(), "Opened memory durable store");
        MemoryDurableStore {
            backend: self.clone(),
            map_name,
            working,
            key_codec,
            value_codec,
            closed: false,
        }
    }

    /// Number of stores opened so far
    pub fn open_count(&self) -> u64 {
        self.shared.open_count.load(Ordering::Relaxed)
    }

    /// Number of entries staged through `upsert` so far
    pub fn upsert_count(&self) -> u64 {
        self.shared.upsert_count.load(Ordering::Relaxed)
    }

    /// Number of successful commits so far
    pub fn commit_count(&self) -> u64 {
        self.shared.commit_count.load(Ordering::Relaxed)
    }

    /// Make every following commit fail with an I/O error (or succeed again)
    pub fn set_fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Committed entry count of `map_name`
    pub fn committed_len(&self, map_name: &str) -> usize {
        self.shared.maps.lock().get(map_name).map_or(0, |m| m.len())
    }

    /// Names of maps with at least one commit
    pub fn map_names(&self) -> Vec<String> {
        self.shared.maps.lock().keys().cloned().collect()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("maps", &self.shared.maps.lock().len())
            .field("open_count", &self.open_count())
            .field("commit_count", &self.commit_count())
            .finish()
    }
}

/// Durable store over a [`MemoryBackend`]
///
/// Keys and values go through the codecs exactly as for the file store.
pub struct MemoryDurableStore<K, V> {
    backend: MemoryBackend,
    map_name: String,
    working: RawMap,
    key_codec: Arc<dyn Codec<K>>,
    value_codec: Arc<dyn Codec<V>>,
    closed: bool,
}

impl<K, V> MemoryDurableStore<K, V> {
    /// Backend this store commits to
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed(format!("memory:{}", self.map_name)));
        }
        Ok(())
    }
}

impl<K, V> DurableStore<K, V> for MemoryDurableStore<K, V>
where
    K: Send,
    V: Send,
{
    fn for_each(&mut self, f: &mut dyn FnMut(K, V) -> Result<()>) -> Result<()> {
        self.ensure_open()?;
        for (key, value) in &self.working {
            f(self.key_codec.decode(key)?, self.value_codec.decode(value)?)?;
        }
        Ok(())
    }

    fn upsert(&mut self, key: &K, value: &V) -> Result<()> {
        self.ensure_open()?;
        let mut k = Vec::new();
        self.key_codec.encode(key, &mut k)?;
        let mut v = Vec::new();
        self.value_codec.encode(value, &mut v)?;
        self.working.insert(k, v);
        self.backend
            .shared
            .upsert_count
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.working.clear();
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.backend.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "commit rejected by memory backend",
            )));
        }
        self.backend
            .shared
            .maps
            .lock()
            .insert(self.map_name.clone(), self.working.clone());
        self.backend
            .shared
            .commit_count
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn len(&self) -> usize {
        self.working.len()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.working.clear();
        Ok(())
    }

    fn location(&self) -> String {
        format!("memory:{}", self.map_name)
    }
}

impl<K, V> fmt::Debug for MemoryDurableStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDurableStore")
            .field("map_name", &self.map_name)
            .field("entries", &self.working.len())
            .field("closed", &self.closed)
            .finish()
    }
}
