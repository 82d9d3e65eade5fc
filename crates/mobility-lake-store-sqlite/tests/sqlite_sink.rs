// crates/mobility-lake-store-sqlite/tests/sqlite_sink.rs
// ============================================================================
// Module: SQLite Sink Tests
// Description: Drop-and-replace loads, type mapping and failure rollback.
// Purpose: Ensure relational copies match the published views exactly.
// ============================================================================

//! `SQLite` sink integration tests.

#![allow(
    clippy::unwrap_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use mobility_lake_core::Column;
use mobility_lake_core::RelationalSink;
use mobility_lake_core::SinkError;
use mobility_lake_core::Table;
use mobility_lake_store_sqlite::SqliteSink;
use mobility_lake_store_sqlite::SqliteSinkConfig;
use mobility_lake_store_sqlite::SqliteSinkError;
use rusqlite::Connection;
use time::macros::datetime;

fn rutas(rows: i64) -> Table {
    Table::new(vec![
        Column::int64("station_origin_id", (0 .. rows).map(Some).collect()),
        Column::utf8("user_type", (0 .. rows).map(|_| Some("annual")).collect()),
        Column::float64("avg_distance_km", (0 .. rows).map(|_| None).collect()),
    ])
    .unwrap()
}

fn count(path: &std::path::Path, table: &str) -> i64 {
    let connection = Connection::open(path).unwrap();
    let sql = format!("SELECT COUNT(*) FROM \"{table}\"");
    connection.query_row(&sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn load_replace_drops_previous_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db/mobility.db");
    let sink = SqliteSink::open(&SqliteSinkConfig::new(&path)).unwrap();
    assert_eq!(sink.load_replace("rutas_users", &rutas(5)).unwrap(), 5);
    assert_eq!(sink.load_replace("rutas_users", &rutas(2)).unwrap(), 2);
    assert_eq!(count(&path, "rutas_users"), 2);
}

#[test]
fn types_are_mapped_and_timestamps_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mobility.db");
    let sink = SqliteSink::open(&SqliteSinkConfig::new(&path)).unwrap();
    let table = Table::new(vec![
        Column::boolean("open", vec![Some(true)]),
        Column::timestamp("timestamp", vec![Some(datetime!(2024-03-15 08:00))]),
    ])
    .unwrap();
    sink.load_replace("parkings_unidos", &table).unwrap();
    let connection = Connection::open(&path).unwrap();
    let (open, stamp): (i64, String) = connection
        .query_row("SELECT open, timestamp FROM parkings_unidos", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(open, 1);
    assert_eq!(stamp, "2024-03-15 08:00:00");
}

#[test]
fn rejected_identifiers_keep_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mobility.db");
    let sink = SqliteSink::open(&SqliteSinkConfig::new(&path)).unwrap();
    sink.load_replace("rutas_users", &rutas(3)).unwrap();
    let bad = Table::new(vec![Column::int64("bad column", vec![Some(1)])]).unwrap();
    let err = sink.load_replace("rutas_users", &bad).unwrap_err();
    assert!(matches!(err, SinkError::Invalid(_)), "{err:?}");
    assert!(matches!(sink.load_replace("bad;name", &rutas(1)), Err(SinkError::Invalid(_))));
    assert_eq!(count(&path, "rutas_users"), 3);
}

#[test]
fn directory_paths_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = SqliteSink::open(&SqliteSinkConfig::new(dir.path()));
    assert!(matches!(result, Err(SqliteSinkError::Invalid(_))));
}
