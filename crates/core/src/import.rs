//! Catalog import normalization and canonical serialization.
//!
//! Import accepts either a bare array of records or an object wrapping the
//! array under one of [`ENVELOPE_FIELDS`]. Individual records are not
//! validated. Output is always a bare, 2-space indented array.

use serde_json::Value;

use crate::model::PlantRecord;

/// Wrapper fields recognised around the record array, in priority order.
pub const ENVELOPE_FIELDS: &[&str] = &["plantes", "data"];

/// The payload does not have a shape this editor can import.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog must be an array of plants or an object with a `plantes` or `data` array (found {found})")]
    UnrecognizedEnvelope { found: &'static str },
}

/// Turn parsed JSON into the ordered record list.
pub fn normalize(value: Value) -> Result<Vec<PlantRecord>, FormatError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let field = ENVELOPE_FIELDS
                .iter()
                .find(|field| map.get(**field).is_some_and(Value::is_array));
            match field.and_then(|field| map.get_mut(*field)).map(Value::take) {
                Some(Value::Array(items)) => items,
                _ => return Err(FormatError::UnrecognizedEnvelope { found: "object" }),
            }
        }
        other => {
            return Err(FormatError::UnrecognizedEnvelope {
                found: json_type_name(&other),
            })
        }
    };

    Ok(items.into_iter().enumerate().map(decode_record).collect())
}

/// Parse raw bytes (file contents, HTTP body, dropped file) and normalize.
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<PlantRecord>, FormatError> {
    let value: Value = serde_json::from_slice(bytes)?;
    normalize(value)
}

/// Canonical on-disk form: bare array, 2-space indentation, stable key
/// order. Identical input always yields identical bytes.
pub fn serialize_catalog(records: &[PlantRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

fn decode_record((index, item): (usize, Value)) -> PlantRecord {
    if !item.is_object() {
        tracing::warn!(index, found = json_type_name(&item), "Catalog entry is not an object");
        return PlantRecord::default();
    }
    serde_json::from_value(item).unwrap_or_else(|e| {
        tracing::warn!(index, error = %e, "Catalog entry could not be decoded");
        PlantRecord::default()
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
