//! Field values used as key sources
//!
//! A [`Field`] is the dynamically typed unit a key is derived from: a scalar
//! (string, number, UUID, timestamp), null, or an ordered list of fields.
//! Row-like sources expose their columns as fields too (see [`crate::row`]).
//!
//! ## Stringification
//!
//! Composite keys are built from the *component text* of each field:
//!
//! | Variant | Component text |
//! |---------|----------------|
//! | `Null` | empty |
//! | `Bool` | `true` / `false` |
//! | `Int`, `Float` | decimal `Display` |
//! | `Text` | the string itself |
//! | `Bytes` | lowercase hex |
//! | `Uuid` | hyphenated lowercase |
//! | `Timestamp` | RFC 3339 with `Z` suffix |
//! | `List` | elements NUL-joined |

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Separator between composite key components.
pub const KEY_SEPARATOR: char = '\0';

/// Dynamically typed key source value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    /// Absent value
    Null,

    /// Boolean
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit IEEE-754 float
    Float(f64),

    /// UTF-8 string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// UUID
    Uuid(Uuid),

    /// UTC timestamp
    Timestamp(DateTime<Utc>),

    /// Ordered sequence of fields
    List(Vec<Field>),
}

impl Field {
    /// Build a list field from anything convertible into fields.
    ///
    /// ```ignore
    /// let source = Field::list(["user", "123", "profile"]);
    /// ```
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        Field::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Field::Null => "Null",
            Field::Bool(_) => "Bool",
            Field::Int(_) => "Int",
            Field::Float(_) => "Float",
            Field::Text(_) => "Text",
            Field::Bytes(_) => "Bytes",
            Field::Uuid(_) => "Uuid",
            Field::Timestamp(_) => "Timestamp",
            Field::List(_) => "List",
        }
    }

    /// Check if this field is null
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as list slice
    pub fn as_list(&self) -> Option<&[Field]> {
        match self {
            Field::List(items) => Some(items),
            _ => None,
        }
    }

    /// Rough byte length of the component text, used to pre-size key buffers.
    pub(crate) fn size_hint(&self) -> usize {
        match self {
            Field::Null => 0,
            Field::Bool(_) => 5,
            Field::Int(_) | Field::Float(_) => 20,
            Field::Text(s) => s.len(),
            Field::Bytes(b) => b.len() * 2,
            Field::Uuid(_) => 36,
            Field::Timestamp(_) => 32,
            Field::List(items) => items.iter().map(|f| f.size_hint() + 1).sum(),
        }
    }

    /// Append the component text of this field to `out`.
    pub fn write_component(&self, out: &mut String) {
        match self {
            Field::Null => {}
            Field::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Field::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            Field::Float(f) => {
                let _ = write!(out, "{}", f);
            }
            Field::Text(s) => out.push_str(s),
            Field::Bytes(bytes) => {
                for b in bytes {
                    let _ = write!(out, "{:02x}", b);
                }
            }
            Field::Uuid(u) => {
                let _ = write!(out, "{}", u.hyphenated());
            }
            Field::Timestamp(ts) => {
                out.push_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true));
            }
            Field::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(KEY_SEPARATOR);
                    }
                    item.write_component(out);
                }
            }
        }
    }

    /// Component text as an owned string.
    pub fn to_component(&self) -> String {
        let mut out = String::with_capacity(self.size_hint());
        self.write_component(&mut out);
        out
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

impl From<bool> for Field {
    fn from(b: bool) -> Self {
        Field::Bool(b)
    }
}

impl From<i64> for Field {
    fn from(i: i64) -> Self {
        Field::Int(i)
    }
}

impl From<i32> for Field {
    fn from(i: i32) -> Self {
        Field::Int(i as i64)
    }
}

impl From<u32> for Field {
    fn from(i: u32) -> Self {
        Field::Int(i as i64)
    }
}

impl From<f64> for Field {
    fn from(f: f64) -> Self {
        Field::Float(f)
    }
}

impl From<Vec<u8>> for Field {
    fn from(b: Vec<u8>) -> Self {
        Field::Bytes(b)
    }
}

impl From<Uuid> for Field {
    fn from(u: Uuid) -> Self {
        Field::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Field {
    fn from(ts: DateTime<Utc>) -> Self {
        Field::Timestamp(ts)
    }
}

impl From<Vec<Field>> for Field {
    fn from(items: Vec<Field>) -> Self {
        Field::List(items)
    }
}

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Field::Null,
        }
    }
}
