//! Core types for ChronMap
//!
//! This crate defines the shared vocabulary of the workspace:
//! - Error taxonomy (`Error`, `ExtractionError`, `Result`)
//! - Key sources (`Field`, `Row`, `Record`)
//! - Key extractors (`Identity`, `ArrayKey`, `ColumnsByIndex`, `ColumnsByName`)
//! - Codecs for the durable boundary
//! - Store capability traits (`VolatileStore`, `DurableStore`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod field;
pub mod key;
pub mod row;
pub mod traits;

pub use codec::{BincodeCodec, BytesCodec, Codec, JsonCodec, StringCodec};
pub use error::{Error, ExtractionError, FlushPhase, Result};
pub use field::{Field, KEY_SEPARATOR};
pub use key::{
    composite_key, ArrayKey, ColumnsByIndex, ColumnsByName, FromField, Identity, KeyExtractor,
    KeySource,
};
pub use row::{Record, Row, RowError};
pub use traits::{DurableStore, VolatileStore};
