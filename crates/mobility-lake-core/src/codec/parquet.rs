// crates/mobility-lake-core/src/codec/parquet.rs
// ============================================================================
// Module: Parquet Codec
// Description: Table to Parquet encoding and Parquet to table decoding.
// Purpose: Store typed, nullable tables in the process and access zones.
// Dependencies: arrow, bytes, parquet
// ============================================================================

//! ## Overview
//! Tables are written as a single Arrow record batch. Integer, float, text,
//! boolean and microsecond timestamp columns map one-to-one onto Arrow types,
//! so nulls survive a round trip unchanged. Narrower integer and float types
//! written by other tools are widened on read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arrow::array::Array;
use arrow::array::ArrayRef;
use arrow::array::BooleanArray;
use arrow::array::Float64Array;
use arrow::array::Int64Array;
use arrow::array::StringArray;
use arrow::array::TimestampMicrosecondArray;
use arrow::compute::cast;
use arrow::datatypes::DataType as ArrowType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::datatypes::TimeUnit;
use arrow::record_batch::RecordBatch;
use arrow::record_batch::RecordBatchOptions;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;

use crate::codec::CodecError;
use crate::core::table::Column;
use crate::core::table::ColumnData;
use crate::core::table::DataType;
use crate::core::table::Table;
use crate::core::time::from_unix_micros;
use crate::core::time::to_unix_micros;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Writer identity stored in the file's key/value metadata.
const CREATED_BY: &str = "mobility-lake";

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a table as a Parquet file.
///
/// # Errors
///
/// Returns [`CodecError::Parquet`] when the writer fails or a timestamp is
/// outside the representable range.
pub fn encode_parquet(table: &Table) -> Result<Vec<u8>, CodecError> {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|column| Field::new(column.name.clone(), arrow_type(column.data_type()), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays = table.columns().iter().map(arrow_array).collect::<Result<Vec<_>, _>>()?;
    let options = RecordBatchOptions::new().with_row_count(Some(table.row_count()));
    let batch = RecordBatch::try_new_with_options(Arc::clone(&schema), arrays, &options)
        .map_err(|err| CodecError::Parquet(format!("record batch build failed: {err}")))?;

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(writer_properties()))
        .map_err(|err| CodecError::Parquet(format!("parquet writer init failed: {err}")))?;
    writer
        .write(&batch)
        .map_err(|err| CodecError::Parquet(format!("parquet write failed: {err}")))?;
    writer
        .close()
        .map_err(|err| CodecError::Parquet(format!("parquet close failed: {err}")))?;
    Ok(buffer)
}

/// Writer properties shared by every dataset.
fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some(CREATED_BY.to_string()),
    };
    WriterProperties::builder().set_key_value_metadata(Some(vec![created_by])).build()
}

/// Maps a column type to its Arrow type.
fn arrow_type(data_type: DataType) -> ArrowType {
    match data_type {
        DataType::Utf8 => ArrowType::Utf8,
        DataType::Int64 => ArrowType::Int64,
        DataType::Float64 => ArrowType::Float64,
        DataType::Boolean => ArrowType::Boolean,
        DataType::Timestamp => ArrowType::Timestamp(TimeUnit::Microsecond, None),
    }
}

/// Builds the Arrow array for a column.
fn arrow_array(column: &Column) -> Result<ArrayRef, CodecError> {
    let array: ArrayRef = match &column.data {
        ColumnData::Utf8(values) => {
            Arc::new(values.iter().map(Option::as_deref).collect::<StringArray>())
        }
        ColumnData::Int64(values) => Arc::new(values.iter().copied().collect::<Int64Array>()),
        ColumnData::Float64(values) => Arc::new(values.iter().copied().collect::<Float64Array>()),
        ColumnData::Boolean(values) => Arc::new(values.iter().copied().collect::<BooleanArray>()),
        ColumnData::Timestamp(values) => {
            let micros = values
                .iter()
                .map(|value| match value {
                    None => Ok(None),
                    Some(moment) => to_unix_micros(*moment).map(Some).ok_or_else(|| {
                        CodecError::Parquet(format!(
                            "timestamp {moment} in column `{}` is out of range",
                            column.name
                        ))
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(TimestampMicrosecondArray::from(micros))
        }
    };
    Ok(array)
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a Parquet file into a table.
///
/// # Errors
///
/// Returns [`CodecError::Parquet`] for corrupt files and
/// [`CodecError::Unsupported`] for column types without a table mapping.
pub fn decode_parquet(bytes: &[u8]) -> Result<Table, CodecError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
        .map_err(|err| CodecError::Parquet(format!("parquet reader init failed: {err}")))?;
    let schema = Arc::clone(builder.schema());
    let reader = builder
        .build()
        .map_err(|err| CodecError::Parquet(format!("parquet reader build failed: {err}")))?;

    let mut columns = schema
        .fields()
        .iter()
        .map(|field| {
            let data_type = table_type(field.data_type()).ok_or_else(|| {
                CodecError::Unsupported(format!(
                    "column `{}` has type {}",
                    field.name(),
                    field.data_type()
                ))
            })?;
            Ok(Column::new(field.name().clone(), ColumnData::nulls(data_type, 0)))
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    for batch in reader {
        let batch =
            batch.map_err(|err| CodecError::Parquet(format!("parquet read failed: {err}")))?;
        for (index, column) in columns.iter_mut().enumerate() {
            append_array(&mut column.data, batch.column(index))?;
        }
    }
    Table::new(columns).map_err(|err| CodecError::Parquet(err.to_string()))
}

/// Maps an Arrow type to the column type it is read as.
fn table_type(arrow: &ArrowType) -> Option<DataType> {
    match arrow {
        ArrowType::Utf8 | ArrowType::LargeUtf8 | ArrowType::Utf8View => Some(DataType::Utf8),
        ArrowType::Int8
        | ArrowType::Int16
        | ArrowType::Int32
        | ArrowType::Int64
        | ArrowType::UInt8
        | ArrowType::UInt16
        | ArrowType::UInt32 => Some(DataType::Int64),
        ArrowType::Float16 | ArrowType::Float32 | ArrowType::Float64 => Some(DataType::Float64),
        ArrowType::Boolean => Some(DataType::Boolean),
        ArrowType::Timestamp(_, _) => Some(DataType::Timestamp),
        _ => None,
    }
}

/// Appends one batch column to the accumulated column data.
fn append_array(target: &mut ColumnData, array: &ArrayRef) -> Result<(), CodecError> {
    let wanted = arrow_type(target.data_type());
    let array = if array.data_type() == &wanted {
        Arc::clone(array)
    } else {
        cast(array.as_ref(), &wanted)
            .map_err(|err| CodecError::Parquet(format!("column cast failed: {err}")))?
    };
    let mismatch = || CodecError::Parquet(format!("unexpected array type {}", array.data_type()));
    match target {
        ColumnData::Utf8(values) => {
            let typed = array.as_any().downcast_ref::<StringArray>().ok_or_else(mismatch)?;
            values.extend(typed.iter().map(|value| value.map(str::to_string)));
        }
        ColumnData::Int64(values) => {
            let typed = array.as_any().downcast_ref::<Int64Array>().ok_or_else(mismatch)?;
            values.extend(typed.iter());
        }
        ColumnData::Float64(values) => {
            let typed = array.as_any().downcast_ref::<Float64Array>().ok_or_else(mismatch)?;
            values.extend(typed.iter());
        }
        ColumnData::Boolean(values) => {
            let typed = array.as_any().downcast_ref::<BooleanArray>().ok_or_else(mismatch)?;
            values.extend(typed.iter());
        }
        ColumnData::Timestamp(values) => {
            let typed =
                array.as_any().downcast_ref::<TimestampMicrosecondArray>().ok_or_else(mismatch)?;
            for micros in typed.iter() {
                let moment = match micros {
                    None => None,
                    Some(micros) => Some(from_unix_micros(micros).ok_or_else(|| {
                        CodecError::Parquet(format!("timestamp {micros} is out of range"))
                    })?),
                };
                values.push(moment);
            }
        }
    }
    Ok(())
}
