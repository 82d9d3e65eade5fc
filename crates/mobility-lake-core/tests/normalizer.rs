// crates/mobility-lake-core/tests/normalizer.rs
// ============================================================================
// Module: Schema Normalizer Tests
// Description: Renames, coercions and derived temporal parts per dataset kind.
// Purpose: Pin the canonical process-zone schema of every source dataset.
// ============================================================================

//! Normalization tests over decoded raw tables.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use mobility_lake_core::ColumnData;
use mobility_lake_core::DatasetKind;
use mobility_lake_core::Table;
use mobility_lake_core::Value;
use mobility_lake_core::codec::decode_csv;
use mobility_lake_core::runtime::normalizer::SchemaError;
use mobility_lake_core::runtime::normalizer::TEMPORAL_PARTS;
use mobility_lake_core::runtime::normalize;
use proptest::prelude::*;

const BIKE_HEADER: &str = "id,usuario_id,tipo_usuario,estacion_origen,estacion_destino,\
fecha_hora_inicio,fecha_hora_fin,duracion_segundos,distancia_km,calorias_estimadas,\
co2_evitado_gramos";

fn bike_csv(rows: &[&str]) -> Vec<u8> {
    let mut text = format!("{BIKE_HEADER}\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text.into_bytes()
}

fn int_cell(table: &Table, column: &str, row: usize) -> Value {
    table.column(column).unwrap().data.value(row)
}

#[test]
fn bike_share_rows_get_canonical_names_and_temporal_parts() {
    let raw = decode_csv(&bike_csv(&[
        "1,10,Anual,3,7,2024-03-15 08:00:00,2024-03-15 08:20:00,1200,3.5,90,410",
    ]))
    .unwrap();
    let table = normalize(&raw, DatasetKind::BikeShareUsage).unwrap();

    for name in ["user_id", "user_type", "station_origin_id", "start_time", "distance_km"] {
        assert!(table.has_column(name), "missing {name}");
    }
    assert!(!table.has_column("usuario_id"));
    assert_eq!(int_cell(&table, "hour", 0), Value::Int64(8));
    assert_eq!(int_cell(&table, "weekday", 0), Value::Int64(4));
    assert_eq!(int_cell(&table, "year", 0), Value::Int64(2024));
    assert_eq!(int_cell(&table, "month", 0), Value::Int64(3));
    assert_eq!(int_cell(&table, "day", 0), Value::Int64(15));
    assert_eq!(int_cell(&table, "duration_seconds", 0), Value::Int64(1200));
    assert_eq!(table.column("distance_km").unwrap().data.value(0), Value::Float64(3.5));
    assert_eq!(
        table.column("user_type").unwrap().data,
        ColumnData::Utf8(vec![Some("annual".to_string())])
    );
}

#[test]
fn null_tokens_and_blank_cells_become_nulls() {
    let raw = decode_csv(&bike_csv(&[
        "1,10,ocasional,3,7,2024-03-15 08:00:00,,N/A,,90,410",
    ]))
    .unwrap();
    let table = normalize(&raw, DatasetKind::BikeShareUsage).unwrap();
    assert_eq!(int_cell(&table, "duration_seconds", 0), Value::Null);
    assert_eq!(table.column("end_time").unwrap().data.value(0), Value::Null);
    assert_eq!(table.column("distance_km").unwrap().data.value(0), Value::Null);
    assert_eq!(table.column("user_type").unwrap().data.value(0), Value::Utf8("occasional".into()));
}

#[test]
fn unparseable_timestamp_is_a_schema_error() {
    let raw = decode_csv(&bike_csv(&[
        "1,10,anual,3,7,not-a-date,2024-03-15 08:20:00,1200,3.5,90,410",
    ]))
    .unwrap();
    let err = normalize(&raw, DatasetKind::BikeShareUsage).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidTimestamp { .. }), "{err:?}");
}

#[test]
fn missing_declared_column_is_a_schema_error() {
    let raw = decode_csv(b"id,usuario_id\n1,2\n").unwrap();
    let err = normalize(&raw, DatasetKind::BikeShareUsage).unwrap_err();
    assert!(matches!(err, SchemaError::MissingColumn(_)), "{err:?}");
}

#[test]
fn parking_rotation_builds_composite_timestamp_and_projects() {
    let raw = decode_csv(
        b"aparcamiento_id,fecha,hora,plazas_ocupadas,plazas_libres,porcentaje_ocupacion,extra\n\
          5,2024-03-15,9,80,20,80.0,x\n",
    )
    .unwrap();
    let table = normalize(&raw, DatasetKind::ParkingRotation).unwrap();
    assert_eq!(
        table.column_names(),
        vec![
            "parking_id",
            "timestamp",
            "occupied_spaces",
            "free_spaces",
            "occupancy_pct",
            "year",
            "month",
            "day",
            "hour",
            "weekday"
        ]
    );
    assert_eq!(int_cell(&table, "hour", 0), Value::Int64(9));
    assert_eq!(int_cell(&table, "weekday", 0), Value::Int64(4));
}

#[test]
fn traffic_congestion_levels_are_translated() {
    let raw = decode_csv(
        b"sensor_id,fecha_hora,total_vehiculos,coches,motos,camiones,buses,\
          velocidad_media_kmh,nivel_congestion\n\
          1,2024-03-15 08:00:00,100,80,10,5,5,32.5,Alta\n\
          2,2024-03-15 09:00:00,50,40,5,3,2,45.0,baja\n",
    )
    .unwrap();
    let table = normalize(&raw, DatasetKind::TrafficHourly).unwrap();
    assert_eq!(
        table.column("congestion_level").unwrap().data,
        ColumnData::Utf8(vec![Some("high".to_string()), Some("low".to_string())])
    );
    for part in TEMPORAL_PARTS {
        assert!(table.has_column(part));
    }
}

proptest! {
    #[test]
    fn normalization_is_deterministic(
        rows in prop::collection::vec(
            (0_i64 .. 10_000, 0_u8 .. 24, 1_u8 .. 29, prop::bool::ANY),
            1 .. 12,
        )
    ) {
        let lines: Vec<String> = rows
            .iter()
            .map(|(id, hour, day, annual)| {
                let kind = if *annual { "anual" } else { "ocasional" };
                format!(
                    "{id},{id},{kind},1,2,2024-02-{day:02} {hour:02}:00:00,,60,1.5,10,20"
                )
            })
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let raw = decode_csv(&bike_csv(&refs)).unwrap();
        let first = normalize(&raw, DatasetKind::BikeShareUsage).unwrap();
        let second = normalize(&raw, DatasetKind::BikeShareUsage).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.row_count(), rows.len());
        for (row, (_, hour, _, _)) in rows.iter().enumerate() {
            prop_assert_eq!(int_cell(&first, "hour", row), Value::Int64(i64::from(*hour)));
        }
    }
}
