//! Config validation tests for mobility-lake-config.
// crates/mobility-lake-config/tests/validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Field and cross-field constraints of mobility-lake.toml.
// Purpose: Ensure bad configuration fails closed before any component runs.
// =============================================================================

use std::path::PathBuf;

use common::TestResult;
use common::assert_invalid;
use common::config_from_toml;
use common::minimal_config;
use mobility_lake_config::AuditSinkKind;
use mobility_lake_config::SinkType;
use mobility_lake_config::StorageConfig;
use mobility_lake_core::QualityMode;

mod common;

#[test]
fn empty_config_is_valid_with_defaults() -> TestResult {
    let config = minimal_config()?;
    config.validate().map_err(|err| err.to_string())?;
    if config.quality.mode != QualityMode::Advise {
        return Err("advise must be the default quality mode".to_string());
    }
    if config.stage_plan().len() != 5 || config.ingest_plan().len() != 6 {
        return Err("empty overrides must fall back to the default plans".to_string());
    }
    if config.sink.sqlite().is_some() {
        return Err("sink must be disabled by default".to_string());
    }
    Ok(())
}

#[test]
fn duplicate_buckets_are_rejected() -> TestResult {
    let mut config = minimal_config()?;
    config.buckets.access = config.buckets.process.clone();
    assert_invalid(config.validate(), "assigned to more than one zone")
}

#[test]
fn invalid_bucket_names_are_rejected() -> TestResult {
    let mut config = minimal_config()?;
    config.buckets.raw = "Raw_Zone".to_string();
    assert_invalid(config.validate(), "invalid characters")
}

#[test]
fn file_audit_requires_path() -> TestResult {
    let mut config = minimal_config()?;
    config.audit.sink = AuditSinkKind::File;
    assert_invalid(config.validate(), "file audit sink requires path")?;
    config.audit.sink = AuditSinkKind::Stderr;
    config.audit.path = Some(PathBuf::from("audit.jsonl"));
    assert_invalid(config.validate(), "only valid for the file sink")
}

#[test]
fn sqlite_sink_requires_path() -> TestResult {
    let mut config = minimal_config()?;
    config.sink.sink_type = SinkType::Sqlite;
    assert_invalid(config.validate(), "sqlite sink requires path")?;
    config.sink.path = Some(PathBuf::from("mobility.db"));
    config.sink.busy_timeout_ms = 0;
    assert_invalid(config.validate(), "busy_timeout_ms must be greater than zero")
}

#[test]
fn sqlite_sink_settings_are_exposed() -> TestResult {
    let config = config_from_toml(
        r#"
[sink]
type = "sqlite"
path = "out/mobility.db"
sync_mode = "normal"
"#,
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let sqlite = config.sink.sqlite().ok_or("sqlite settings missing")?;
    if sqlite.path != PathBuf::from("out/mobility.db") || sqlite.busy_timeout_ms != 5_000 {
        return Err(format!("unexpected sqlite settings {}", sqlite.path.display()));
    }
    Ok(())
}

#[test]
fn s3_endpoint_requires_scheme_and_http_opt_in() -> TestResult {
    let mut config = minimal_config()?;
    config.storage = StorageConfig::S3 {
        endpoint: Some("s3.example.com".to_string()),
        region: None,
        force_path_style: true,
        allow_http: false,
    };
    assert_invalid(config.validate(), "must include http:// or https://")?;
    config.storage = StorageConfig::S3 {
        endpoint: Some("http://localhost:9000".to_string()),
        region: Some("us-east-1".to_string()),
        force_path_style: true,
        allow_http: false,
    };
    assert_invalid(config.validate(), "without allow_http")
}

#[test]
fn stage_overrides_must_use_zone_buckets() -> TestResult {
    let config = config_from_toml(
        r#"
[[stages]]
name = "trafico"
dataset = "trafico_process"
kind = "traffic_hourly"
source_bucket = "somewhere-else"
source = { exact = "traf/trafico.csv" }
target = { bucket = "process-zone", object = "traf/trafico.parquet" }
transformation = "traffic"
"#,
    )
    .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "unknown bucket `somewhere-else`")
}

#[test]
fn stage_names_must_be_unique() -> TestResult {
    let stage = r#"
[[stages]]
name = "trafico"
dataset = "trafico_process"
kind = "traffic_hourly"
source_bucket = "raw-ingestion-zone"
source = { latest = "traf/" }
target = { bucket = "process-zone", object = "traf/trafico.parquet" }
transformation = "traffic"
"#;
    let config = config_from_toml(&format!("{stage}{stage}")).map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "duplicate stage name `trafico`")
}

#[test]
fn traversal_keys_are_rejected() -> TestResult {
    let mut config = minimal_config()?;
    config.access.traffic = "../escape.parquet".to_string();
    assert_invalid(config.validate(), "access:")
}

#[test]
fn unknown_fields_fail_to_parse() {
    assert!(config_from_toml("[pipeline]\nthreads = 4\n").is_err());
    assert!(config_from_toml("[quality]\nmode = \"strict\"\n").is_err());
}
