// crates/mobility-lake-core/tests/parquet_codec.rs
// ============================================================================
// Module: Parquet Codec Tests
// Description: Typed, nullable columns through the Parquet encoder.
// Purpose: Ensure process-zone files keep nullable integers and timestamps.
// ============================================================================

//! Parquet encode/decode tests.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use mobility_lake_core::Column;
use mobility_lake_core::DataType;
use mobility_lake_core::Table;
use mobility_lake_core::Value;
use mobility_lake_core::codec::CodecError;
use mobility_lake_core::codec::decode_parquet;
use mobility_lake_core::codec::encode_parquet;
use time::macros::datetime;

#[test]
fn nullable_integers_stay_integers() {
    let table = Table::new(vec![
        Column::int64("parking_id", vec![Some(1), None, Some(3)]),
        Column::float64("occupancy_pct", vec![Some(50.5), Some(0.0), None]),
        Column::utf8("name", vec![Some("Sol"), None, Some("Mayor")]),
        Column::boolean("open", vec![Some(true), Some(false), None]),
        Column::timestamp("timestamp", vec![Some(datetime!(2024-03-15 08:00)), None, None]),
    ])
    .unwrap();
    let decoded = decode_parquet(&encode_parquet(&table).unwrap()).unwrap();
    assert_eq!(decoded, table);
    assert_eq!(decoded.column("parking_id").unwrap().data_type(), DataType::Int64);
    assert_eq!(decoded.column("parking_id").unwrap().data.value(1), Value::Null);
}

#[test]
fn zero_row_tables_keep_their_schema() {
    let table = Table::new(vec![Column::int64("id", Vec::new())]).unwrap();
    let decoded = decode_parquet(&encode_parquet(&table).unwrap()).unwrap();
    assert_eq!(decoded.row_count(), 0);
    assert_eq!(decoded.column_names(), vec!["id"]);
}

#[test]
fn corrupt_bytes_are_a_parquet_error() {
    assert!(matches!(decode_parquet(b"not parquet"), Err(CodecError::Parquet(_))));
}
