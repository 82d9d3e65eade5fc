// crates/mobility-lake-core/src/codec/json.rs
// ============================================================================
// Module: JSON Record Codec
// Description: JSON record decoding and JSON row rendering for tables.
// Purpose: Read citizen-report exports and render tables for operators.
// Dependencies: serde_json, time
// ============================================================================

//! ## Overview
//! Raw JSON is either one array of flat objects or JSON lines. Columns are
//! the union of object keys in first-seen order; scalar values are kept as
//! their text form and nested values as compact JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Number;
use serde_json::Value as JsonValue;

use crate::codec::CodecError;
use crate::core::table::Column;
use crate::core::table::Table;
use crate::core::table::Value;
use crate::core::time::format_datetime;

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a JSON array of objects, or JSON lines, into a text table.
///
/// # Errors
///
/// Returns [`CodecError::Json`] when the input is not a list of objects.
pub fn decode_json_records(bytes: &[u8]) -> Result<Table, CodecError> {
    let records = parse_records(bytes)?;
    let mut names: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }
    let columns = names
        .into_iter()
        .map(|name| {
            let cells =
                records.iter().map(|record| record.get(&name).and_then(cell_text)).collect();
            Column::utf8(name, cells)
        })
        .collect();
    Table::new(columns).map_err(|err| CodecError::Json(err.to_string()))
}

/// Parses the record objects from either supported layout.
fn parse_records(bytes: &[u8]) -> Result<Vec<Map<String, JsonValue>>, CodecError> {
    match serde_json::from_slice::<JsonValue>(bytes) {
        Ok(JsonValue::Array(items)) => items.into_iter().map(into_object).collect(),
        Ok(JsonValue::Object(object)) => Ok(vec![object]),
        Ok(_) => Err(CodecError::Json("expected an array of objects".to_string())),
        Err(whole_err) => {
            let text = std::str::from_utf8(bytes).map_err(|err| CodecError::Json(err.to_string()))?;
            let mut records = Vec::new();
            for line in text.lines().filter(|line| !line.trim().is_empty()) {
                let value: JsonValue = serde_json::from_str(line)
                    .map_err(|_| CodecError::Json(whole_err.to_string()))?;
                records.push(into_object(value)?);
            }
            Ok(records)
        }
    }
}

/// Requires a JSON object.
fn into_object(value: JsonValue) -> Result<Map<String, JsonValue>, CodecError> {
    match value {
        JsonValue::Object(object) => Ok(object),
        other => Err(CodecError::Json(format!("expected an object record, found {other}"))),
    }
}

/// Converts a JSON value to its cell text.
fn cell_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(text) if text.trim().is_empty() => None,
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        JsonValue::Number(number) => Some(number.to_string()),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => Some(nested.to_string()),
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a table as JSON objects, one per row.
#[must_use]
pub fn table_to_json_rows(table: &Table) -> Vec<JsonValue> {
    (0 .. table.row_count())
        .map(|row| {
            let mut object = Map::new();
            for column in table.columns() {
                object.insert(column.name.clone(), value_to_json(column.data.value(row)));
            }
            JsonValue::Object(object)
        })
        .collect()
}

/// Converts a cell to JSON; non-finite floats become null.
fn value_to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Utf8(text) => JsonValue::String(text),
        Value::Int64(number) => JsonValue::Number(number.into()),
        Value::Float64(number) => {
            Number::from_f64(number).map_or(JsonValue::Null, JsonValue::Number)
        }
        Value::Boolean(flag) => JsonValue::Bool(flag),
        Value::Timestamp(moment) => JsonValue::String(format_datetime(moment)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::table::ColumnData;

    #[test]
    fn unions_keys_across_records() {
        let table =
            decode_json_records(br#"[{"id": 1, "tipo": "ruido"}, {"id": 2, "barrio": null}]"#)
                .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("id").unwrap().data,
            ColumnData::Utf8(vec![Some("1".to_string()), Some("2".to_string())])
        );
        assert_eq!(
            table.column("tipo").unwrap().data,
            ColumnData::Utf8(vec![Some("ruido".to_string()), None])
        );
        assert!(table.has_column("barrio"));
    }

    #[test]
    fn accepts_json_lines() {
        let table = decode_json_records(b"{\"id\": 1}\n{\"id\": 2}\n").unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn rejects_scalar_documents() {
        assert!(decode_json_records(b"42").is_err());
        assert!(decode_json_records(b"[1, 2]").is_err());
    }

    #[test]
    fn renders_rows_with_typed_values() {
        let table = Table::new(vec![
            Column::int64("id", vec![Some(7), None]),
            Column::float64("pct", vec![Some(0.5), Some(f64::NAN)]),
        ])
        .unwrap();
        let rows = table_to_json_rows(&table);
        assert_eq!(rows[0]["id"], JsonValue::from(7));
        assert_eq!(rows[1]["id"], JsonValue::Null);
        assert_eq!(rows[1]["pct"], JsonValue::Null);
    }
}
