// crates/mobility-lake-core/tests/quality_gate.rs
// ============================================================================
// Module: Quality Gate Tests
// Description: Check evaluation and advise/enforce gate outcomes.
// Purpose: Ensure every evaluation is recorded and enforce mode blocks output.
// ============================================================================

//! Quality check and gate policy tests.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::sync::Arc;

use mobility_lake_core::CheckKind;
use mobility_lake_core::Column;
use mobility_lake_core::DatasetName;
use mobility_lake_core::FixedClock;
use mobility_lake_core::GovernanceStore;
use mobility_lake_core::InMemoryBlobStore;
use mobility_lake_core::QualityGate;
use mobility_lake_core::QualityMode;
use mobility_lake_core::QualityRules;
use mobility_lake_core::Table;
use mobility_lake_core::runtime::evaluate;
use proptest::prelude::*;
use time::macros::datetime;

fn governance() -> Arc<GovernanceStore> {
    let clock = Arc::new(FixedClock::new(datetime!(2024-03-15 10:00 UTC)));
    let store = InMemoryBlobStore::with_clock(clock.clone()).with_buckets(&["govern"]).unwrap();
    Arc::new(GovernanceStore::new(Arc::new(store), "govern", clock))
}

fn ten_rows_three_null() -> Table {
    let ids: Vec<Option<i64>> = (0 .. 10).map(Some).collect();
    let users: Vec<Option<i64>> =
        (0 .. 10).map(|row| if row % 3 == 0 && row > 0 { None } else { Some(row) }).collect();
    Table::new(vec![Column::int64("id", ids), Column::int64("user_id", users)]).unwrap()
}

fn rules(no_nulls: &[&str], unique: &[&str]) -> QualityRules {
    QualityRules {
        no_nulls: no_nulls.iter().map(|name| (*name).to_string()).collect(),
        unique: unique.iter().map(|name| (*name).to_string()).collect(),
        ..QualityRules::default()
    }
}

#[test]
fn null_count_is_reported_in_details() {
    let checks = evaluate(&ten_rows_three_null(), &rules(&["user_id"], &[]));
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].check, CheckKind::NoNulls);
    assert!(!checks[0].passed);
    assert!(checks[0].details.contains('3'));
}

#[test]
fn duplicates_are_counted_per_repeat() {
    let table =
        Table::new(vec![Column::int64("id", vec![Some(1), Some(1), Some(2), Some(1)])]).unwrap();
    let checks = evaluate(&table, &rules(&[], &["id"]));
    assert!(!checks[0].passed);
    assert_eq!(checks[0].details, "2 duplicate values found");
}

#[test]
fn composite_uniqueness_uses_joined_label() {
    let table = Table::new(vec![
        Column::int64("parking_id", vec![Some(1), Some(1)]),
        Column::utf8("timestamp", vec![Some("2024-03-15 08:00:00"), Some("2024-03-15 09:00:00")]),
    ])
    .unwrap();
    let checks = evaluate(
        &table,
        &QualityRules {
            unique_together: vec![vec!["parking_id".to_string(), "timestamp".to_string()]],
            ..QualityRules::default()
        },
    );
    assert_eq!(checks[0].column, "parking_id,timestamp");
    assert!(checks[0].passed);
}

#[test]
fn negative_values_fail_non_negative() {
    let table =
        Table::new(vec![Column::float64("occupancy_pct", vec![Some(4.0), Some(-1.0), None])])
            .unwrap();
    let checks = evaluate(
        &table,
        &QualityRules {
            non_negative: vec!["occupancy_pct".to_string()],
            ..QualityRules::default()
        },
    );
    assert_eq!(checks[0].check, CheckKind::NonNegative);
    assert_eq!(checks[0].details, "1 negative values found");
}

#[test]
fn missing_column_fails_without_panicking() {
    let checks = evaluate(&ten_rows_three_null(), &rules(&["absent"], &["absent"]));
    assert_eq!(checks.len(), 2);
    assert!(checks.iter().all(|check| !check.passed));
}

#[test]
fn advise_mode_admits_failures_and_records_them() {
    let governance = governance();
    let gate = QualityGate::new(Arc::clone(&governance), QualityMode::Advise);
    let name = DatasetName::new("bicimad_process");
    let outcome = gate.check(&name, &ten_rows_three_null(), &rules(&["user_id"], &[])).unwrap();
    assert!(outcome.admitted);
    assert!(!outcome.record.all_passed());
    let page = governance.list_quality().unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].0, outcome.key);
    assert_eq!(page.records[0].1.row_count, 10);
}

#[test]
fn enforce_mode_rejects_failures_but_still_records() {
    let governance = governance();
    let gate = QualityGate::new(Arc::clone(&governance), QualityMode::Enforce);
    let dataset = DatasetName::new("bicimad_process");
    let rejected = gate.check(&dataset, &ten_rows_three_null(), &rules(&["user_id"], &[])).unwrap();
    assert!(!rejected.admitted);
    let admitted = gate.check(&dataset, &ten_rows_three_null(), &rules(&["id"], &["id"])).unwrap();
    assert!(admitted.admitted);
    assert_eq!(governance.list_quality().unwrap().records.len(), 2);
}

#[test]
fn empty_rules_produce_an_empty_passing_record() {
    let governance = governance();
    let gate = QualityGate::new(governance, QualityMode::Enforce);
    let name = DatasetName::new("avisa");
    let outcome = gate.check(&name, &ten_rows_three_null(), &QualityRules::default()).unwrap();
    assert!(outcome.record.checks.is_empty());
    assert!(outcome.admitted);
}

proptest! {
    #[test]
    fn null_check_counts_every_null(values in prop::collection::vec(
        prop::option::of(any::<i64>()),
        0 .. 40,
    )) {
        let nulls = values.iter().filter(|value| value.is_none()).count();
        let table = Table::new(vec![Column::int64("user_id", values)]).unwrap();
        let checks = evaluate(&table, &rules(&["user_id"], &[]));
        prop_assert_eq!(checks.len(), 1);
        prop_assert_eq!(checks[0].passed, nulls == 0);
        prop_assert_eq!(checks[0].details.clone(), format!("{nulls} null values found"));
    }
}
