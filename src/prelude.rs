//! Convenient imports for ChronMap.
//!
//! ```ignore
//! use chronmap::prelude::*;
//!
//! let store = StoreBuilder::<String, String>::new()
//!     .path("./data/cache.db")
//!     .key_codec(StringCodec)
//!     .value_codec(StringCodec)
//!     .build()?;
//! ```

// Store and configuration
pub use chronmap_engine::{FlushOutcome, InstanceRegistry, Store, StoreBuilder};

// Error handling
pub use chronmap_core::{Error, ExtractionError, Result};

// Keys
pub use chronmap_core::{
    composite_key, ArrayKey, ColumnsByIndex, ColumnsByName, Field, Identity, KeyExtractor,
    KeySource, Record, Row,
};

// Codecs
pub use chronmap_core::{BincodeCodec, BytesCodec, Codec, JsonCodec, StringCodec};

// Durable backends
pub use chronmap_durability::MemoryBackend;
