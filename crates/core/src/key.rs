//! Key extraction
//!
//! A [`KeyExtractor`] turns a structured [`KeySource`] into a store key. The
//! composite extractors build NUL-separated string keys:
//!
//! ```text
//! ["a"]            -> "a"
//! ["a", "b", "c"]  -> "a\0b\0c"
//! ["a", null, "c"] -> "a\0\0c"
//! ```
//!
//! A one-component key carries no separator, so it is identical to the plain
//! string key. Values stored through an extractor can be read back with the
//! bare string and vice versa.
//!
//! Extraction runs on ingestion hot paths: components are written straight
//! into one pre-sized `String`, never collected into an intermediate list.

use crate::error::ExtractionError;
use crate::field::{Field, KEY_SEPARATOR};
use crate::row::{Record, Row, RowError};
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

/// Input to a key extractor
#[derive(Clone, Copy)]
pub enum KeySource<'a> {
    /// Absent source
    Null,
    /// A single field (scalar or list)
    Field(&'a Field),
    /// A row-like source
    Row(&'a dyn Row),
}

impl<'a> KeySource<'a> {
    /// Type name of the source (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            KeySource::Null => "Null",
            KeySource::Field(f) => f.type_name(),
            KeySource::Row(_) => "Row",
        }
    }
}

impl fmt::Debug for KeySource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Null => f.write_str("Null"),
            KeySource::Field(field) => f.debug_tuple("Field").field(field).finish(),
            KeySource::Row(row) => f
                .debug_struct("Row")
                .field("columns", &row.column_count())
                .finish(),
        }
    }
}

impl<'a> From<&'a Field> for KeySource<'a> {
    fn from(field: &'a Field) -> Self {
        KeySource::Field(field)
    }
}

impl<'a> From<&'a Record> for KeySource<'a> {
    fn from(record: &'a Record) -> Self {
        KeySource::Row(record)
    }
}

impl<'a> From<&'a dyn Row> for KeySource<'a> {
    fn from(row: &'a dyn Row) -> Self {
        KeySource::Row(row)
    }
}

impl<'a> From<Option<&'a Field>> for KeySource<'a> {
    fn from(field: Option<&'a Field>) -> Self {
        field.map_or(KeySource::Null, KeySource::Field)
    }
}

/// Derives a key of type `K` from a source.
pub trait KeyExtractor<K>: Send + Sync {
    /// Extract the key, failing on malformed or incompatible sources.
    fn extract(&self, source: KeySource<'_>) -> Result<K, ExtractionError>;
}

impl<K, F> KeyExtractor<K> for F
where
    F: Fn(KeySource<'_>) -> Result<K, ExtractionError> + Send + Sync,
{
    fn extract(&self, source: KeySource<'_>) -> Result<K, ExtractionError> {
        self(source)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Key types that can be taken directly from a field.
pub trait FromField: Sized {
    /// Name used in mismatch errors
    const TYPE_NAME: &'static str;

    /// Convert, or `None` if the field has another type
    fn from_field(field: &Field) -> Option<Self>;
}

impl FromField for String {
    const TYPE_NAME: &'static str = "Text";

    fn from_field(field: &Field) -> Option<Self> {
        field.as_str().map(str::to_string)
    }
}

impl FromField for i64 {
    const TYPE_NAME: &'static str = "Int";

    fn from_field(field: &Field) -> Option<Self> {
        match field {
            Field::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromField for bool {
    const TYPE_NAME: &'static str = "Bool";

    fn from_field(field: &Field) -> Option<Self> {
        match field {
            Field::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromField for Vec<u8> {
    const TYPE_NAME: &'static str = "Bytes";

    fn from_field(field: &Field) -> Option<Self> {
        match field {
            Field::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FromField for Uuid {
    const TYPE_NAME: &'static str = "Uuid";

    fn from_field(field: &Field) -> Option<Self> {
        match field {
            Field::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl FromField for DateTime<Utc> {
    const TYPE_NAME: &'static str = "Timestamp";

    fn from_field(field: &Field) -> Option<Self> {
        match field {
            Field::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl FromField for Field {
    const TYPE_NAME: &'static str = "Field";

    fn from_field(field: &Field) -> Option<Self> {
        Some(field.clone())
    }
}

/// Returns the source unchanged, for sources that already are keys
/// (strings, timestamps, UUIDs).
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<K: FromField> KeyExtractor<K> for Identity {
    fn extract(&self, source: KeySource<'_>) -> Result<K, ExtractionError> {
        match source {
            KeySource::Null => Err(ExtractionError::NullSource),
            KeySource::Field(field) => {
                K::from_field(field).ok_or(ExtractionError::UnexpectedType {
                    expected: K::TYPE_NAME,
                    found: field.type_name(),
                })
            }
            KeySource::Row(_) => Err(ExtractionError::UnexpectedType {
                expected: K::TYPE_NAME,
                found: "Row",
            }),
        }
    }
}

// ============================================================================
// Array
// ============================================================================

/// NUL-joins the elements of a list field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayKey;

impl KeyExtractor<String> for ArrayKey {
    fn extract(&self, source: KeySource<'_>) -> Result<String, ExtractionError> {
        let items = match source {
            KeySource::Null => return Err(ExtractionError::NullSource),
            KeySource::Field(Field::Null) => return Err(ExtractionError::NullSource),
            KeySource::Field(Field::List(items)) => items,
            other => {
                return Err(ExtractionError::NotASequence {
                    found: other.type_name(),
                })
            }
        };

        match items.as_slice() {
            [] => Err(ExtractionError::EmptySequence),
            [single] => Ok(single.to_component()),
            many => {
                let hint: usize = many.iter().map(|f| f.size_hint() + 1).sum();
                let mut key = String::with_capacity(hint);
                for (i, item) in many.iter().enumerate() {
                    if i > 0 {
                        key.push(KEY_SEPARATOR);
                    }
                    item.write_component(&mut key);
                }
                Ok(key)
            }
        }
    }
}

// ============================================================================
// Tabular
// ============================================================================

fn retrieval_error(column: impl fmt::Display, err: RowError) -> ExtractionError {
    ExtractionError::Retrieval {
        column: column.to_string(),
        message: err.0,
    }
}

/// Joins the columns at the given 1-based positions of a row.
#[derive(Debug, Clone)]
pub struct ColumnsByIndex {
    columns: SmallVec<[usize; 4]>,
}

impl ColumnsByIndex {
    /// Create the extractor, rejecting empty or zero positions.
    pub fn new(columns: &[usize]) -> Result<Self, ExtractionError> {
        if columns.is_empty() {
            return Err(ExtractionError::InvalidColumns(
                "at least one column index must be provided".to_string(),
            ));
        }
        if columns.iter().any(|&c| c < 1) {
            return Err(ExtractionError::InvalidColumns(
                "column indices must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            columns: SmallVec::from_slice(columns),
        })
    }

    /// Selected positions
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }
}

impl KeyExtractor<String> for ColumnsByIndex {
    fn extract(&self, source: KeySource<'_>) -> Result<String, ExtractionError> {
        let row = expect_row(source)?;
        join_columns(self.columns.iter().copied(), |idx| {
            row.get_by_index(idx).map_err(|e| retrieval_error(idx, e))
        })
    }
}

/// Joins the named columns of a row.
#[derive(Debug, Clone)]
pub struct ColumnsByName {
    columns: SmallVec<[String; 4]>,
}

impl ColumnsByName {
    /// Create the extractor, rejecting empty lists and blank names.
    pub fn new<I, S>(columns: I) -> Result<Self, ExtractionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: SmallVec<[String; 4]> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(ExtractionError::InvalidColumns(
                "at least one column name must be provided".to_string(),
            ));
        }
        if columns.iter().any(|c| c.trim().is_empty()) {
            return Err(ExtractionError::InvalidColumns(
                "column names cannot be blank".to_string(),
            ));
        }
        Ok(Self { columns })
    }

    /// Selected names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl KeyExtractor<String> for ColumnsByName {
    fn extract(&self, source: KeySource<'_>) -> Result<String, ExtractionError> {
        let row = expect_row(source)?;
        join_columns(self.columns.iter().map(String::as_str), |name| {
            row.get_by_name(name).map_err(|e| retrieval_error(name, e))
        })
    }
}

fn expect_row<'a>(source: KeySource<'a>) -> Result<&'a dyn Row, ExtractionError> {
    match source {
        KeySource::Row(row) => Ok(row),
        KeySource::Null => Err(ExtractionError::NullSource),
        other => Err(ExtractionError::NotARow {
            found: other.type_name(),
        }),
    }
}

fn join_columns<'r, C, F>(mut columns: C, mut read: F) -> Result<String, ExtractionError>
where
    C: ExactSizeIterator,
    F: FnMut(C::Item) -> Result<Cow<'r, Field>, ExtractionError>,
{
    let count = columns.len();
    let mut key = String::with_capacity(count * 16);
    if let Some(first) = columns.next() {
        read(first)?.write_component(&mut key);
    }
    for column in columns {
        key.push(KEY_SEPARATOR);
        read(column)?.write_component(&mut key);
    }
    Ok(key)
}

/// Build a composite key from displayable parts.
///
/// ```ignore
/// assert_eq!(composite_key(["user", "123"]), "user\0123");
/// ```
pub fn composite_key<I, T>(parts: I) -> String
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    use fmt::Write as _;

    let mut key = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        let _ = write!(key, "{}", part);
    }
    key
}
