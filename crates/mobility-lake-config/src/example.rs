// crates/mobility-lake-config/src/example.rs
// ============================================================================
// Module: Config Example
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for operators and tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for `mobility-lake.toml`. The example must always load
//! and validate.

/// Returns a canonical example `mobility-lake.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[storage]
type = "filesystem"
root = "lake-data"
# type = "s3"
# endpoint = "https://s3.example.com"
# region = "eu-west-1"
# force_path_style = true

[buckets]
raw = "raw-ingestion-zone"
process = "process-zone"
access = "access-zone"
govern_metadata = "govern-zone-metadata"
govern_security = "govern-zone-security"

[quality]
mode = "advise"

[audit]
sink = "file"
path = "mobility-lake-audit.jsonl"

[sink]
type = "sqlite"
path = "mobility.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[pipeline]
parallel = true
ingest_dir = "data"

[access]
traffic = "traf/trafico.parquet"
bike_share = "data/bicimad.parquet"
parking_rotation = "invent/parkings.parquet"
parking_info = "apar/aparcamientos.parquet"

[[ingest]]
path = "trafico-horario.csv"
key = "traf/trafico-horario.csv"
dated = true

[[stages]]
name = "trafico"
dataset = "trafico_process"
kind = "traffic_hourly"
source_bucket = "raw-ingestion-zone"
source = { latest = "traf/" }
source_format = "csv"
target = { bucket = "process-zone", object = "traf/trafico.parquet" }
transformation = "Hourly traffic standardization and temporal enrichment"
rules = { no_nulls = ["sensor_id", "timestamp"] }
"#,
    )
}
