//! Untyped source records with fail-closed field access.

use crate::error::{MigrateError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One record as returned by the source system: a string-keyed JSON document
/// with a stable source-assigned `_id`. Read-only to this engine.
///
/// Transform functions narrow the fields they need through the typed
/// accessors below, which fail closed on missing or malformed values rather
/// than propagating nulls into the destination row.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord(Map<String, Value>);

impl SourceRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The source-assigned unique identifier.
    pub fn source_id(&self) -> Result<&str> {
        self.str_field("_id")
    }

    /// Required string field.
    pub fn str_field(&self, field: &str) -> Result<&str> {
        match self.0.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s),
            Some(Value::String(_)) => Err(MigrateError::field(field, "empty string")),
            Some(other) => Err(MigrateError::field(
                field,
                format!("expected string, got {}", type_name(other)),
            )),
            None => Err(MigrateError::field(field, "missing")),
        }
    }

    /// Optional string field. Absent, null, and empty all read as None;
    /// a present non-string value is still an error.
    pub fn opt_str(&self, field: &str) -> Result<Option<&str>> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(MigrateError::field(
                field,
                format!("expected string, got {}", type_name(other)),
            )),
        }
    }

    /// Optional numeric field.
    pub fn opt_f64(&self, field: &str) -> Result<Option<f64>> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(MigrateError::field(
                field,
                format!("expected number, got {}", type_name(other)),
            )),
        }
    }

    /// Optional integer field. The source system serializes numbers loosely,
    /// so whole-valued floats (`3.0`) are accepted; fractional values are
    /// rejected.
    pub fn opt_i64(&self, field: &str) -> Result<Option<i64>> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .map(Some)
                .ok_or_else(|| MigrateError::field(field, "expected integer")),
            Some(other) => Err(MigrateError::field(
                field,
                format!("expected integer, got {}", type_name(other)),
            )),
        }
    }

    /// Optional boolean field.
    pub fn opt_bool(&self, field: &str) -> Result<Option<bool>> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(MigrateError::field(
                field,
                format!("expected boolean, got {}", type_name(other)),
            )),
        }
    }

    /// Optional RFC 3339 timestamp field (the source system's date format).
    pub fn opt_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>> {
        match self.opt_str(field)? {
            None => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| MigrateError::field(field, format!("bad timestamp '{}': {}", raw, e))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
