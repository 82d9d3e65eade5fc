// crates/mobility-lake-core/src/runtime/quality.rs
// ============================================================================
// Module: Quality Gate
// Description: Evaluates declarative quality rules and records the outcome.
// Purpose: Detect and surface data defects before a dataset is published.
// Dependencies: crate::core, crate::runtime::governance
// ============================================================================

//! ## Overview
//! [`evaluate`] is a pure function from a table and a rule set to check
//! results. [`QualityGate`] wraps it, persists one [`QualityCheckRecord`] per
//! call, and tells the caller whether the configured [`QualityMode`] lets the
//! stage continue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::identifiers::DatasetName;
use crate::core::quality::CheckKind;
use crate::core::quality::CheckResult;
use crate::core::quality::QualityCheckRecord;
use crate::core::quality::QualityMode;
use crate::core::quality::QualityRules;
use crate::core::table::KeyValue;
use crate::core::table::Table;
use crate::runtime::governance::GovernanceError;
use crate::runtime::governance::GovernanceStore;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates every rule against a table.
///
/// Checks are returned in rule order: `no_nulls`, `unique`,
/// `unique_together`, then `non_negative`.
#[must_use]
pub fn evaluate(table: &Table, rules: &QualityRules) -> Vec<CheckResult> {
    let mut checks = Vec::new();
    for column in &rules.no_nulls {
        checks.push(check_no_nulls(table, column));
    }
    for column in &rules.unique {
        checks.push(check_unique(table, std::slice::from_ref(column)));
    }
    for columns in &rules.unique_together {
        checks.push(check_unique(table, columns));
    }
    for column in &rules.non_negative {
        checks.push(check_non_negative(table, column));
    }
    checks
}

/// Counts nulls in one column.
fn check_no_nulls(table: &Table, name: &str) -> CheckResult {
    let Some(column) = table.column(name) else {
        return missing(CheckKind::NoNulls, name);
    };
    let nulls = column.data.null_count();
    CheckResult {
        check: CheckKind::NoNulls,
        column: name.to_string(),
        passed: nulls == 0,
        details: format!("{nulls} null values found"),
    }
}

/// Counts duplicate rows over one column or a column set.
fn check_unique(table: &Table, names: &[String]) -> CheckResult {
    let label = names.join(",");
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let Some(column) = table.column(name) else {
            return missing(CheckKind::Unique, &label);
        };
        columns.push(column);
    }
    let mut seen: BTreeSet<Vec<KeyValue>> = BTreeSet::new();
    let mut duplicates = 0_usize;
    for row in 0 .. table.row_count() {
        let key: Vec<KeyValue> = columns.iter().map(|column| column.data.key(row)).collect();
        if !seen.insert(key) {
            duplicates += 1;
        }
    }
    CheckResult {
        check: CheckKind::Unique,
        column: label,
        passed: duplicates == 0,
        details: format!("{duplicates} duplicate values found"),
    }
}

/// Counts negative values in a numeric column.
fn check_non_negative(table: &Table, name: &str) -> CheckResult {
    let Some(column) = table.column(name) else {
        return missing(CheckKind::NonNegative, name);
    };
    let numeric = (0 .. column.len()).all(|row| {
        column.data.is_null(row) || column.data.numeric(row).is_some()
    });
    if !numeric {
        return CheckResult {
            check: CheckKind::NonNegative,
            column: name.to_string(),
            passed: false,
            details: format!("column `{name}` is not numeric"),
        };
    }
    let negatives =
        (0 .. column.len()).filter_map(|row| column.data.numeric(row)).filter(|v| *v < 0.0).count();
    CheckResult {
        check: CheckKind::NonNegative,
        column: name.to_string(),
        passed: negatives == 0,
        details: format!("{negatives} negative values found"),
    }
}

/// Builds the failed result for a rule naming an absent column.
fn missing(check: CheckKind, name: &str) -> CheckResult {
    CheckResult {
        check,
        column: name.to_string(),
        passed: false,
        details: format!("column `{name}` not found"),
    }
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    /// Persisted record.
    pub record: QualityCheckRecord,
    /// Key of the persisted record.
    pub key: String,
    /// Whether the stage may persist its output.
    pub admitted: bool,
}

/// Evaluates rules, records the result and applies the gate policy.
pub struct QualityGate {
    /// Record persistence.
    governance: Arc<GovernanceStore>,
    /// Failure policy.
    mode: QualityMode,
}

impl QualityGate {
    /// Creates a gate.
    #[must_use]
    pub const fn new(governance: Arc<GovernanceStore>, mode: QualityMode) -> Self {
        Self {
            governance,
            mode,
        }
    }

    /// Returns the failure policy.
    #[must_use]
    pub const fn mode(&self) -> QualityMode {
        self.mode
    }

    /// Evaluates `rules` against `table` and persists the record.
    ///
    /// Under [`QualityMode::Advise`] the outcome is always admitted; under
    /// [`QualityMode::Enforce`] it is admitted only when every check passed.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the record cannot be persisted.
    pub fn check(
        &self,
        dataset: &DatasetName,
        table: &Table,
        rules: &QualityRules,
    ) -> Result<GateOutcome, GovernanceError> {
        let record = QualityCheckRecord {
            dataset: dataset.clone(),
            timestamp: self.governance.clock().now(),
            row_count: table.row_count(),
            checks: evaluate(table, rules),
        };
        let key = self.governance.append_quality(&record)?;
        let admitted = match self.mode {
            QualityMode::Advise => true,
            QualityMode::Enforce => record.all_passed(),
        };
        Ok(GateOutcome {
            record,
            key,
            admitted,
        })
    }
}
