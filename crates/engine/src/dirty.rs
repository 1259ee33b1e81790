//! Dirty flag
//!
//! Set by every successful mutation, consumed by the flush path. The flush
//! clears the flag *before* reading entries: a write that lands mid-flush
//! sets it again and forces another cycle.

use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether the volatile store changed since the last flush
#[derive(Debug, Default)]
pub struct DirtyTracker {
    dirty: AtomicBool,
}

impl DirtyTracker {
    /// Create a clean tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation. Never blocks.
    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Atomically read and reset the flag, returning the previous value.
    #[inline]
    pub fn test_and_clear(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Current value without resetting
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}
