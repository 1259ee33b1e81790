//! Row-like key sources
//!
//! Tabular extractors read columns from anything implementing [`Row`]: a
//! result-set cursor, a parsed CSV line, or the in-memory [`Record`].
//! Positions are 1-based (SQL convention).

use crate::field::Field;
use std::borrow::Cow;
use thiserror::Error;

/// Failure to read a column from a row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RowError(pub String);

impl RowError {
    /// Create a row error with a message
    pub fn new(msg: impl Into<String>) -> Self {
        RowError(msg.into())
    }
}

/// A row of named, positioned columns.
pub trait Row {
    /// Read the column at a 1-based position.
    fn get_by_index(&self, index: usize) -> Result<Cow<'_, Field>, RowError>;

    /// Read the column with the given name.
    fn get_by_name(&self, name: &str) -> Result<Cow<'_, Field>, RowError>;

    /// Number of columns in the row.
    fn column_count(&self) -> usize;
}

/// In-memory row of named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Field)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Field>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a column
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Field>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Column names in position order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

impl Row for Record {
    fn get_by_index(&self, index: usize) -> Result<Cow<'_, Field>, RowError> {
        if index == 0 || index > self.columns.len() {
            return Err(RowError(format!(
                "column index {} out of range (1..={})",
                index,
                self.columns.len()
            )));
        }
        Ok(Cow::Borrowed(&self.columns[index - 1].1))
    }

    fn get_by_name(&self, name: &str) -> Result<Cow<'_, Field>, RowError> {
        // Column labels compare case-insensitively, as result sets do.
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| Cow::Borrowed(v))
            .ok_or_else(|| RowError(format!("no column named '{}'", name)))
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }
}
