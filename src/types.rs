//! Type definitions shared by both backends.
//!
//! Contains the database record, query result and scalar value types. Field
//! names follow the D1 REST API so that the same structs serve as wire types
//! for the remote service and as the emulator's output.

use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Read replication setting of a database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationMode {
    Auto,
    /// Also used for any mode string this crate does not know.
    #[default]
    #[serde(other)]
    Disabled,
}

impl ReplicationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReplication {
    pub mode: ReplicationMode,
}

/// Settings accepted by `update_database`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub replication: ReplicationMode,
}

/// Metadata describing one logical database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseRecord {
    /// Creation time, RFC 3339 on the wire.
    pub created_at: DateTime<Utc>,
    pub file_size: i64,
    pub name: String,
    pub num_tables: i64,
    pub read_replication: ReadReplication,
    pub uuid: Uuid,
    pub version: String,
}

/// Empty payload returned by `delete_database`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub sql_duration_ms: f64,
}

/// Execution metadata attached to every query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryMeta {
    pub changed_db: bool,
    pub changes: u64,
    /// Wall time in milliseconds.
    pub duration: f64,
    pub last_row_id: i64,
    pub rows_read: u64,
    pub rows_written: u64,
    pub served_by_primary: bool,
    pub served_by_region: String,
    pub size_after: i64,
    pub timings: Option<Timings>,
}

/// One row as a JSON object, columns in select order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Outcome of one executed statement.
///
/// `results` is kept as raw JSON because its shape depends on the endpoint:
/// a sequence of row objects for `query`, a columnar object for the remote
/// `raw` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResult {
    pub meta: QueryMeta,
    pub results: serde_json::Value,
    pub success: bool,
}

impl QueryResult {
    /// Row objects of a row-shaped result. `null` yields no rows and
    /// non-object entries are skipped.
    pub fn rows(&self) -> Vec<Row> {
        match &self.results {
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Decodes a row-shaped result into typed records.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<Vec<T>> {
        match &self.results {
            serde_json::Value::Null => Ok(Vec::new()),
            other => serde_json::from_value(other.clone()),
        }
    }
}

/// SQL scalar used for statement parameters and column values.
///
/// Mirrors SQLite's type system. Serializes as a bare JSON scalar; blobs are
/// coerced to text because the wire format carries no binary type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Value {
    fn from(value_ref: ValueRef<'_>) -> Self {
        match value_ref {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

impl Value {
    /// Converts to a rusqlite Value for parameter binding.
    pub fn to_rusqlite(&self) -> rusqlite::types::Value {
        match self {
            Self::Null => rusqlite::types::Value::Null,
            Self::Integer(i) => rusqlite::types::Value::Integer(*i),
            Self::Real(r) => rusqlite::types::Value::Real(*r),
            Self::Text(s) => rusqlite::types::Value::Text(s.clone()),
            Self::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
        }
    }

    /// Converts to a JSON scalar. Blobs become (lossy) UTF-8 text and
    /// non-finite reals become `null`.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(i),
            Self::Real(r) => serde_json::Number::from_f64(r)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s),
            Self::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(&b).into_owned()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Real(r) if r.is_finite() => serializer.serialize_f64(*r),
            Self::Real(_) => serializer.serialize_unit(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Blob(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
