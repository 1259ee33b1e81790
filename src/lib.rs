//! # ChronMap
//!
//! Write-back key-value store: a fast in-memory map in front of a durable
//! snapshot, kept in sync by debounced background flushes.
//!
//! Reads and writes only touch memory. Every mutation marks the store dirty;
//! a per-store background thread copies the map to stable storage at a fixed
//! interval, but only when something changed. Closing a store flushes any
//! pending changes first.
//!
//! ## Quick Start
//!
//! ```ignore
//! use chronmap::prelude::*;
//!
//! let registry = InstanceRegistry::new();
//! let sessions = StoreBuilder::<String, String>::new()
//!     .name("sessions")
//!     .data_dir("./data")
//!     .key_codec(StringCodec)
//!     .value_codec(StringCodec)
//!     .registry(&registry)
//!     .build()?;
//!
//! sessions.put("abc".into(), "alice".into())?;
//!
//! // Composite keys: "user\0123\0profile"
//! let source = Field::list(["user", "123", "profile"]);
//! sessions.put_with(&source, "data".into(), &ArrayKey)?;
//!
//! registry.close_all();
//! ```
//!
//! ## Crates
//!
//! - [`chronmap_core`]: errors, key sources, key extractors, codecs, capability traits
//! - [`chronmap_storage`]: sharded volatile store
//! - [`chronmap_durability`]: snapshot file and in-memory durable stores
//! - [`chronmap_engine`]: snapshot engine, scheduler, store, builder, registry

#![warn(missing_docs)]

pub mod prelude;
pub mod presets;

pub use chronmap_core::{
    composite_key, ArrayKey, BincodeCodec, BytesCodec, Codec, ColumnsByIndex, ColumnsByName,
    DurableStore, Error, ExtractionError, Field, FlushPhase, FromField, Identity, JsonCodec,
    KeyExtractor, KeySource, Record, Result, Row, RowError, StringCodec, VolatileStore,
    KEY_SEPARATOR,
};
pub use chronmap_durability::{FileDurableStore, MemoryBackend, MemoryDurableStore};
pub use chronmap_engine::{
    EngineState, FlushOutcome, InstanceRegistry, InstanceStats, RegistryStats, Store,
    StoreBuilder, StoreStats, DEFAULT_MAP_NAME, DEFAULT_SHUTDOWN_GRACE,
    DEFAULT_SNAPSHOT_INTERVAL,
};
pub use chronmap_storage::{CapacityHints, ShardedMap};

pub use chronmap_core;
pub use chronmap_durability;
pub use chronmap_engine;
pub use chronmap_storage;
