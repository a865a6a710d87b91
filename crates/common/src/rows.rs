//! Normalization of store results into row lists.
//!
//! ClickHouse answers `FORMAT JSON` queries with an envelope
//! (`{"meta": [...], "data": [...], "rows": N, ...}`), but other formats and
//! fakes hand back a bare array. Every consumer goes through [`StoreRows`]
//! instead of probing the shape itself.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Key under which the envelope exposes its rows.
pub const ROWS_KEY: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreRows {
    /// The result already was an array of rows.
    Bare(Vec<Value>),
    /// The rows were unwrapped from an envelope object.
    Wrapped(Vec<Value>),
    /// Null, a scalar, or an object without a rows array.
    Missing,
}

impl StoreRows {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(rows) => Self::Bare(rows),
            Value::Object(mut envelope) => match envelope.remove(ROWS_KEY) {
                Some(Value::Array(rows)) => Self::Wrapped(rows),
                _ => Self::Missing,
            },
            _ => Self::Missing,
        }
    }

    pub fn into_rows(self) -> Vec<Value> {
        match self {
            Self::Bare(rows) | Self::Wrapped(rows) => rows,
            Self::Missing => Vec::new(),
        }
    }
}

/// Rows of a store result, empty when it has none.
pub fn normalize_rows(value: Value) -> Vec<Value> {
    StoreRows::classify(value).into_rows()
}

/// Normalize, then deserialize every row into `T`.
pub fn decode_rows<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, serde_json::Error> {
    normalize_rows(value)
        .into_iter()
        .map(serde_json::from_value)
        .collect()
}
