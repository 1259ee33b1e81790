//! Error types for ChronMap
//!
//! One error enum is shared by every crate in the workspace. Variants map onto
//! the four failure classes of the store:
//!
//! | Class | Variant | Raised |
//! |-------|---------|--------|
//! | Configuration | [`Error::Configuration`] | `StoreBuilder::build()` |
//! | Extraction | [`Error::Extraction`] | composite-key call sites |
//! | Snapshot I/O | [`Error::Snapshot`] | manual snapshot, close |
//! | Type mismatch | [`Error::TypeMismatch`] | named lookup with other key/value types |
//!
//! Opening a snapshot file that another live store holds fails with
//! [`Error::Locked`].
//!
//! Lower-level failures of the durable capability (`Io`, `Serialization`,
//! `Corruption`) are wrapped into [`Error::Snapshot`] by the snapshot engine
//! when they happen during a flush.

use std::fmt;
use thiserror::Error;

/// Result type for ChronMap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Step of the flush sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPhase {
    /// Clearing the durable map before repopulating it
    Clear,
    /// Copying volatile entries into the durable map
    Copy,
    /// Committing the durable transaction
    Commit,
}

impl fmt::Display for FlushPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushPhase::Clear => f.write_str("clear"),
            FlushPhase::Copy => f.write_str("copy"),
            FlushPhase::Commit => f.write_str("commit"),
        }
    }
}

/// All ChronMap errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Builder field missing or out of bounds
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Key source could not be turned into a key
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Flush against the durable store failed
    #[error("snapshot failed during {phase}: {source}")]
    Snapshot {
        /// Step that failed
        phase: FlushPhase,
        /// Underlying durable-store error
        source: Box<Error>,
    },

    /// Named instance exists with other key/value types
    #[error("store '{name}' is registered as Store<{actual}>, requested Store<{expected}>")]
    TypeMismatch {
        /// Logical name of the store
        name: String,
        /// Key/value types requested by the caller
        expected: String,
        /// Key/value types of the registered instance
        actual: String,
    },

    /// Store was closed
    #[error("store closed: {0}")]
    Closed(String),

    /// I/O error from the durable capability
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key or value encoding failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Durable data failed validation
    #[error("corruption: {0}")]
    Corruption(String),

    /// Durable file is held by another open store
    #[error("snapshot file locked by another store: {0}")]
    Locked(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Error::Serialization(msg.into())
    }

    /// Create a corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Wrap a durable-store error as a snapshot failure
    pub fn snapshot(phase: FlushPhase, source: Error) -> Self {
        Error::Snapshot {
            phase,
            source: Box::new(source),
        }
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is an extraction error
    pub fn is_extraction(&self) -> bool {
        matches!(self, Error::Extraction(_))
    }

    /// Check if this is a snapshot error
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Error::Snapshot { .. })
    }

    /// Check if this is a type mismatch error
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }

    /// Check if the store was closed
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed(_))
    }

    /// Check if the durable file is locked by another store
    pub fn is_locked(&self) -> bool {
        matches!(self, Error::Locked(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Failure to derive a key from a source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Source was null
    #[error("key source cannot be null")]
    NullSource,

    /// Array extraction on something that is not a sequence
    #[error("expected a sequence but got {found}")]
    NotASequence {
        /// Type name of the source
        found: &'static str,
    },

    /// Array extraction on an empty sequence
    #[error("key sequence cannot be empty")]
    EmptySequence,

    /// Column extraction on something that is not a row
    #[error("expected a row but got {found}")]
    NotARow {
        /// Type name of the source
        found: &'static str,
    },

    /// Column list rejected when building the extractor
    #[error("invalid column selection: {0}")]
    InvalidColumns(String),

    /// Row could not produce a column value
    #[error("failed to read column {column}: {message}")]
    Retrieval {
        /// Column position or name
        column: String,
        /// Row error message
        message: String,
    },

    /// Identity extraction into an incompatible key type
    #[error("expected {expected} source but got {found}")]
    UnexpectedType {
        /// Key type requested
        expected: &'static str,
        /// Type name of the source
        found: &'static str,
    },
}
