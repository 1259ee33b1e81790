//! Volatile storage for ChronMap
//!
//! This crate implements the in-memory side of a store:
//! - ShardedMap: DashMap + FxHash map implementing `VolatileStore`
//! - CapacityHints: advisory sizing (entries, average key/value size)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod sharded;

pub use sharded::{CapacityHints, ShardedMap};
