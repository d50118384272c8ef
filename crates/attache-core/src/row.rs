//! Untyped record values, as handed over by a row source.

use std::collections::HashMap;

/// A generic field-name-to-value record, e.g. one database row.
pub type Row = HashMap<String, RowValue>;

/// A single untyped column value.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl RowValue {
    /// Short name of the underlying type, used in decoding errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<String> for RowValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for RowValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for RowValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for RowValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<i64> for RowValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for RowValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for RowValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<T: Into<RowValue>> From<Option<T>> for RowValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}
