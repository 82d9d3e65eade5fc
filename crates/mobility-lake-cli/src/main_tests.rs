// crates/mobility-lake-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and selection helpers.
// Purpose: Ensure command lines map to the intended passes.
// Dependencies: mobility-lake-cli main helpers
// ============================================================================

//! ## Overview
//! Validates clap parsing of the command tree, name selection and the JSON
//! shape of isolated outcomes.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use clap::Parser;

use super::AccessView;
use super::Cli;
use super::Commands;
use super::GovernCommand;
use super::Outcome;
use super::parse_views;
use super::select_by_name;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn process_accepts_repeated_stages() {
    let cli = Cli::try_parse_from([
        "mobility-lake",
        "--config",
        "lake.toml",
        "process",
        "--stage",
        "bicimad",
        "--stage",
        "trafico",
        "--parallel",
    ])
    .unwrap();
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("lake.toml")));
    let Some(Commands::Process(command)) = cli.command else {
        panic!("expected process command");
    };
    assert_eq!(command.stages, ["bicimad", "trafico"]);
    assert!(command.parallel);
}

#[test]
fn govern_subcommands_use_kebab_case() {
    let cli = Cli::try_parse_from(["mobility-lake", "govern", "quality-report", "--failed-only"])
        .unwrap();
    let Some(Commands::Govern {
        command: GovernCommand::QualityReport(command),
    }) = cli.command
    else {
        panic!("expected quality report");
    };
    assert!(command.failed_only);
    assert!(Cli::try_parse_from(["mobility-lake", "govern", "publish-policy"]).is_ok());
    assert!(Cli::try_parse_from(["mobility-lake", "govern", "audit-everything"]).is_err());
}

#[test]
fn lineage_trace_requires_bucket_and_object() {
    assert!(Cli::try_parse_from(["mobility-lake", "lineage", "trace", "--bucket", "b"]).is_err());
    assert!(
        Cli::try_parse_from([
            "mobility-lake",
            "lineage",
            "trace",
            "--bucket",
            "access-zone",
            "--object",
            "analytics/rutas_users.parquet",
        ])
        .is_ok()
    );
}

#[test]
fn empty_selection_keeps_everything() {
    let views = parse_views(&[]).unwrap();
    assert_eq!(views, AccessView::ALL.to_vec());
}

#[test]
fn selection_keeps_plan_order_and_rejects_unknown_names() {
    let names = ["c".to_string(), "a".to_string()];
    let picked = select_by_name(vec!["a", "b", "c"], &names, |name| *name, "stage").unwrap();
    assert_eq!(picked, ["a", "c"]);
    let err = parse_views(&["rutas_users".to_string(), "nope".to_string()]).unwrap_err();
    assert_eq!(err.to_string(), "unknown view `nope`");
}

#[test]
fn failed_outcome_serializes_error_fields_only() {
    let outcome: Outcome<usize> =
        Outcome::from_result("trafico", Err::<usize, _>("boom"), |_| "not_found");
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["error_kind"], "not_found");
    assert_eq!(json["error"], "boom");
    assert!(json.get("report").is_none());
}
