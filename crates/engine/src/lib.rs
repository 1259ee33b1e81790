//! Store engine for ChronMap
//!
//! This crate wires the volatile and durable capabilities into a store:
//! - DirtyTracker: atomic "changed since last flush" flag
//! - SnapshotEngine: load, flush, close against the two capabilities
//! - Scheduler: per-store background thread driving debounced flushes
//! - Store / StoreBuilder: the public facade and its configuration
//! - InstanceRegistry: one live store per logical name

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod dirty;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod store;

pub use builder::{StoreBuilder, DEFAULT_MAP_NAME, DEFAULT_SNAPSHOT_INTERVAL};
pub use dirty::DirtyTracker;
pub use registry::{InstanceRegistry, InstanceStats, RegistryStats};
pub use scheduler::{Scheduler, DEFAULT_SHUTDOWN_GRACE};
pub use snapshot::{EngineState, FlushOutcome, SnapshotEngine, SnapshotStats};
pub use store::{Store, StoreStats};
