//! Durable storage for ChronMap
//!
//! This crate implements the stable-storage side of a store:
//! - format: checksummed multi-map snapshot file layout
//! - FileDurableStore: snapshot file with atomic-rename commits
//! - MemoryDurableStore: in-process backend that survives store restarts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod format;
pub mod memory;

pub use file::FileDurableStore;
pub use format::{RawMap, FORMAT_VERSION};
pub use memory::{MemoryBackend, MemoryDurableStore};
