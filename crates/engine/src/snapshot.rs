//! Snapshot engine
//!
//! Moves entries between the volatile and durable capabilities:
//!
//! ```text
//! Loading --load()--> Ready <--flush--> Snapshotting
//!                       |
//!                    close()
//!                       v
//!                    Closed
//! ```
//!
//! A flush is a full replace: clear the durable map, copy every volatile
//! entry, commit. Flush bodies are serialized by the durable-store mutex,
//! which also guards against flushing after close (the slot is emptied).

use crate::dirty::DirtyTracker;
use chronmap_core::{DurableStore, Error, FlushPhase, Result, VolatileStore};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Lifecycle state of a snapshot engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// Copying durable entries into the volatile store
    Loading = 0,
    /// Serving reads and writes
    Ready = 1,
    /// A flush is running
    Snapshotting = 2,
    /// Capabilities released
    Closed = 3,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => EngineState::Loading,
            1 => EngineState::Ready,
            2 => EngineState::Snapshotting,
            _ => EngineState::Closed,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Snapshotting => "snapshotting",
            EngineState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Result of a flush request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing changed since the last flush; durable store untouched
    Clean,
    /// Durable store replaced with this many entries
    Flushed {
        /// Entries written
        entries: usize,
    },
}

impl FlushOutcome {
    /// Check if a flush actually ran
    pub fn is_flushed(&self) -> bool {
        matches!(self, FlushOutcome::Flushed { .. })
    }
}

/// Counters exposed by a snapshot engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Entries copied in during load
    pub loaded_entries: u64,
    /// Successful flushes
    pub flushes: u64,
    /// Failed flushes (any path)
    pub failed_flushes: u64,
    /// Entries written by the last successful flush
    pub last_flush_entries: u64,
    /// Unflushed mutations pending
    pub dirty: bool,
    /// Current state
    pub state: EngineState,
}

/// Load, flush and close logic for one store
pub struct SnapshotEngine<K, V> {
    label: String,
    location: String,
    volatile: Arc<dyn VolatileStore<K, V>>,
    /// `None` once closed
    durable: Mutex<Option<Box<dyn DurableStore<K, V>>>>,
    dirty: DirtyTracker,
    state: AtomicU8,
    loaded_entries: AtomicU64,
    flushes: AtomicU64,
    failed_flushes: AtomicU64,
    last_flush_entries: AtomicU64,
}

impl<K, V> SnapshotEngine<K, V> {
    /// Create an engine in the `Loading` state
    pub fn new(
        label: impl Into<String>,
        volatile: Arc<dyn VolatileStore<K, V>>,
        durable: Box<dyn DurableStore<K, V>>,
    ) -> Self {
        let location = durable.location();
        Self {
            label: label.into(),
            location,
            volatile,
            durable: Mutex::new(Some(durable)),
            dirty: DirtyTracker::new(),
            state: AtomicU8::new(EngineState::Loading as u8),
            loaded_entries: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            failed_flushes: AtomicU64::new(0),
            last_flush_entries: AtomicU64::new(0),
        }
    }

    /// Volatile capability
    pub fn volatile(&self) -> &Arc<dyn VolatileStore<K, V>> {
        &self.volatile
    }

    /// Dirty flag
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Location reported by the durable capability
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Current state
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn closed_error(&self) -> Error {
        Error::Closed(self.label.clone())
    }

    /// Copy every durable entry into the volatile store.
    ///
    /// Returns the number of entries loaded.
    pub fn load(&self) -> Result<usize> {
        let mut guard = self.durable.lock();
        let durable = guard.as_mut().ok_or_else(|| self.closed_error())?;

        let start = Instant::now();
        let mut loaded = 0usize;
        let volatile = &self.volatile;
        durable.for_each(&mut |key, value| {
            volatile.insert(key, value);
            loaded += 1;
            Ok(())
        })?;

        self.loaded_entries.store(loaded as u64, Ordering::Relaxed);
        self.set_state(EngineState::Ready);
        info!(
            store = %self.label,
            location = %self.location,
            entries = loaded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded snapshot"
        );
        Ok(loaded)
    }

    /// Flush if anything changed since the last flush.
    ///
    /// On failure the dirty flag is restored so a later flush retries.
    pub fn flush_if_dirty(&self) -> Result<FlushOutcome> {
        let mut guard = self.durable.lock();
        let durable = guard.as_mut().ok_or_else(|| self.closed_error())?;

        if !self.dirty.test_and_clear() {
            debug!(store = %self.label, "Snapshot skipped, no changes");
            return Ok(FlushOutcome::Clean);
        }
        match self.flush_locked(durable.as_mut()) {
            Ok(entries) => Ok(FlushOutcome::Flushed { entries }),
            Err(e) => {
                self.dirty.mark_dirty();
                Err(e)
            }
        }
    }

    /// Flush unconditionally.
    pub fn force_flush(&self) -> Result<FlushOutcome> {
        let mut guard = self.durable.lock();
        let durable = guard.as_mut().ok_or_else(|| self.closed_error())?;

        let was_dirty = self.dirty.test_and_clear();
        match self.flush_locked(durable.as_mut()) {
            Ok(entries) => Ok(FlushOutcome::Flushed { entries }),
            Err(e) => {
                if was_dirty {
                    self.dirty.mark_dirty();
                }
                Err(e)
            }
        }
    }

    /// One scheduler tick: flush if dirty, log and swallow failures.
    ///
    /// A failed scheduled flush leaves the flag cleared; the next mutation
    /// re-arms it.
    pub fn run_scheduled_cycle(&self) {
        let mut guard = self.durable.lock();
        let durable = match guard.as_mut() {
            Some(d) => d,
            None => return,
        };
        if !self.dirty.test_and_clear() {
            return;
        }
        if let Err(e) = self.flush_locked(durable.as_mut()) {
            error!(store = %self.label, error = %e, "Scheduled snapshot failed");
        }
    }

    /// Final flush (if dirty) and release of both capabilities.
    ///
    /// Idempotent. Waits for an in-flight flush to finish first. Capabilities
    /// are released even when the final flush fails; the flush error is
    /// returned.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.durable.lock();
        let mut durable = match guard.take() {
            Some(d) => d,
            None => return Ok(()),
        };

        let mut result = Ok(());
        if self.dirty.test_and_clear() {
            if let Err(e) = self.flush_locked(durable.as_mut()) {
                self.dirty.mark_dirty();
                result = Err(e);
            }
        }
        if let Err(e) = durable.close() {
            if result.is_ok() {
                result = Err(e);
            } else {
                error!(store = %self.label, error = %e, "Closing durable store failed");
            }
        }
        self.set_state(EngineState::Closed);
        drop(guard);

        self.volatile.close();
        result
    }

    /// Clear, copy, commit. Caller holds the durable lock.
    fn flush_locked(&self, durable: &mut dyn DurableStore<K, V>) -> Result<usize> {
        self.set_state(EngineState::Snapshotting);
        let start = Instant::now();
        debug!(store = %self.label, "Snapshot started");

        let result = Self::replace_contents(self.volatile.as_ref(), durable);
        self.set_state(EngineState::Ready);

        match result {
            Ok(entries) => {
                self.flushes.fetch_add(1, Ordering::Relaxed);
                self.last_flush_entries
                    .store(entries as u64, Ordering::Relaxed);
                info!(
                    store = %self.label,
                    entries,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Snapshot completed"
                );
                Ok(entries)
            }
            Err(e) => {
                self.failed_flushes.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn replace_contents(
        volatile: &dyn VolatileStore<K, V>,
        durable: &mut dyn DurableStore<K, V>,
    ) -> Result<usize> {
        durable
            .clear()
            .map_err(|e| Error::snapshot(FlushPhase::Clear, e))?;

        let mut entries = 0usize;
        volatile
            .for_each(&mut |key, value| {
                entries += 1;
                durable.upsert(key, value)
            })
            .map_err(|e| Error::snapshot(FlushPhase::Copy, e))?;

        durable
            .commit()
            .map_err(|e| Error::snapshot(FlushPhase::Commit, e))?;
        Ok(entries)
    }

    /// Counters and state
    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            loaded_entries: self.loaded_entries.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            last_flush_entries: self.last_flush_entries.load(Ordering::Relaxed),
            dirty: self.dirty.is_dirty(),
            state: self.state(),
        }
    }
}

impl<K, V> fmt::Debug for SnapshotEngine<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotEngine")
            .field("label", &self.label)
            .field("location", &self.location)
            .field("stats", &self.stats())
            .finish()
    }
}
