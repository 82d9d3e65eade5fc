// crates/mobility-lake-core/src/codec/csv.rs
// ============================================================================
// Module: CSV Decoder
// Description: Header-driven CSV decoding into text columns.
// Purpose: Read raw delimited files without guessing column types.
// Dependencies: arrow
// ============================================================================

//! ## Overview
//! Column names come from the header row. Every column is read as text so
//! that integer-looking identifiers with gaps never become floats; empty
//! cells become nulls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::Array;
use arrow::array::StringArray;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;

use crate::codec::CodecError;
use crate::core::table::Column;
use crate::core::table::Table;

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes CSV bytes with a header row into a text table.
///
/// # Errors
///
/// Returns [`CodecError::Csv`] on malformed input or duplicate headers.
pub fn decode_csv(bytes: &[u8]) -> Result<Table, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Table::default());
    }
    let format = Format::default().with_header(true);
    let (inferred, _) = format
        .infer_schema(Cursor::new(bytes), None)
        .map_err(|err| CodecError::Csv(err.to_string()))?;
    let names: Vec<String> = inferred.fields().iter().map(|field| field.name().clone()).collect();
    let schema = Arc::new(Schema::new(
        names.iter().map(|name| Field::new(name, DataType::Utf8, true)).collect::<Vec<_>>(),
    ));
    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(Cursor::new(bytes))
        .map_err(|err| CodecError::Csv(err.to_string()))?;

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for batch in reader {
        let batch = batch.map_err(|err| CodecError::Csv(err.to_string()))?;
        for (index, column) in values.iter_mut().enumerate() {
            let array = batch
                .column(index)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| CodecError::Csv(format!("column {index} is not text")))?;
            column.reserve(array.len());
            column.extend(array.iter().map(clean_cell));
        }
    }

    let columns = names.into_iter().zip(values).map(|(name, cells)| Column::utf8(name, cells));
    Table::new(columns.collect()).map_err(|err| CodecError::Csv(err.to_string()))
}

/// Maps blank cells to null.
fn clean_cell(cell: Option<&str>) -> Option<String> {
    cell.filter(|value| !value.trim().is_empty()).map(str::to_string)
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
    fn reads_every_column_as_text() {
        let table = decode_csv(b"id,distancia_km\n1,2.5\n2,\n").unwrap();
        assert_eq!(table.column_names(), vec!["id", "distancia_km"]);
        assert_eq!(
            table.column("distancia_km").unwrap().data,
            ColumnData::Utf8(vec![Some("2.5".to_string()), None])
        );
    }

    #[test]
    fn blank_input_is_an_empty_table() {
        let table = decode_csv(b"  \n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn quoted_commas_stay_in_one_cell() {
        let table = decode_csv(b"nombre,direccion\nPlaza,\"Calle Mayor, 1\"\n").unwrap();
        assert_eq!(
            table.column("direccion").unwrap().data,
            ColumnData::Utf8(vec![Some("Calle Mayor, 1".to_string())])
        );
    }
}
