//! Config loading tests for mobility-lake-config.
// crates/mobility-lake-config/tests/load.rs
// =============================================================================
// Module: Config Load Tests
// Description: File resolution, size limits, example and policy loading.
// Purpose: Ensure the on-disk entry points behave like the in-memory model.
// =============================================================================

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::fs;

use mobility_lake_config::ConfigError;
use mobility_lake_config::LakeConfig;
use mobility_lake_config::config_toml_example;
use mobility_lake_config::load_security_policy;
use mobility_lake_core::QualityMode;
use mobility_lake_core::SecurityPolicy;

#[test]
fn example_config_loads_and_validates() {
    let config = LakeConfig::from_bytes(config_toml_example().as_bytes()).unwrap();
    assert_eq!(config.quality.mode, QualityMode::Advise);
    assert!(config.pipeline.parallel);
    assert_eq!(config.stage_plan().len(), 1);
    assert!(config.sink.sqlite().is_some());
}

#[test]
fn load_reads_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lake.toml");
    fs::write(&path, "[quality]\nmode = \"enforce\"\n").unwrap();
    let config = LakeConfig::load(Some(&path)).unwrap();
    assert_eq!(config.quality.mode, QualityMode::Enforce);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = LakeConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn oversized_and_malformed_files_are_rejected() {
    let oversized = vec![b'#'; 1024 * 1024 + 1];
    assert!(matches!(LakeConfig::from_bytes(&oversized), Err(ConfigError::Invalid(_))));
    assert!(matches!(LakeConfig::from_bytes(b"[storage"), Err(ConfigError::Parse(_))));
    assert!(matches!(LakeConfig::from_bytes(&[0xff, 0xfe]), Err(ConfigError::Invalid(_))));
}

#[test]
fn security_policy_file_replaces_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.yaml");
    let yaml = r"
zones:
  access-zone:
    description: Dashboards only
    access_levels:
      read: [public_dashboards]
    encryption: required
    retention_policy: 30 days
";
    fs::write(&path, yaml).unwrap();
    let mut config = LakeConfig::default();
    config.security_policy = Some(path);
    let policy = load_security_policy(&config).unwrap();
    assert_eq!(policy.zones.len(), 1);
    assert_eq!(policy.readers("access-zone"), ["public_dashboards".to_string()]);
    assert_ne!(policy, SecurityPolicy::default_for(&config.buckets));
}

#[test]
fn security_policy_rejects_unknown_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.yaml");
    fs::write(
        &path,
        "zones:\n  elsewhere:\n    description: x\n    access_levels: {}\n    \
         encryption: none\n    retention_policy: 1 day\n",
    )
    .unwrap();
    let mut config = LakeConfig::default();
    config.security_policy = Some(path);
    assert!(matches!(load_security_policy(&config), Err(ConfigError::Invalid(_))));
}
