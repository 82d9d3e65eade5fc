// crates/mobility-lake-core/src/core/quality.rs
// ============================================================================
// Module: Mobility Lake Quality Records
// Description: Quality rule sets, check results, and persisted check records.
// Purpose: Describe what the quality gate checks and what it found.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`QualityRules`] value lists the columns each check applies to. The gate
//! turns it into [`CheckResult`] values whose `details` always carry the
//! measured count.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::DatasetName;

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Declarative quality rules for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityRules {
    /// Columns that must not contain nulls.
    pub no_nulls: Vec<String>,
    /// Columns whose values must be unique.
    pub unique: Vec<String>,
    /// Column sets whose combined values must be unique.
    pub unique_together: Vec<Vec<String>>,
    /// Numeric columns that must not contain negative values.
    pub non_negative: Vec<String>,
}

impl QualityRules {
    /// Returns true when no rule is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.no_nulls.is_empty()
            && self.unique.is_empty()
            && self.unique_together.is_empty()
            && self.non_negative.is_empty()
    }
}

/// What the gate does with failing checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMode {
    /// Record failures and continue.
    #[default]
    Advise,
    /// Record failures and abort the stage before anything is persisted.
    Enforce,
}

impl QualityMode {
    /// Returns the stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Advise => "advise",
            Self::Enforce => "enforce",
        }
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Kind of quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// No nulls in a column.
    NoNulls,
    /// No duplicate values in a column or column set.
    Unique,
    /// No negative values in a numeric column.
    NonNegative,
}

impl CheckKind {
    /// Returns the stable label for the check.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoNulls => "no_nulls",
            Self::Unique => "unique",
            Self::NonNegative => "non_negative",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check kind.
    pub check: CheckKind,
    /// Column, or comma-joined column set.
    pub column: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Measured count in words.
    pub details: String,
}

/// Persisted outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheckRecord {
    /// Dataset evaluated.
    pub dataset: DatasetName,
    /// Evaluation time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Rows evaluated.
    pub row_count: usize,
    /// Individual check results.
    pub checks: Vec<CheckResult>,
}

impl QualityCheckRecord {
    /// Returns the failing checks.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|check| !check.passed)
    }

    /// Returns true when every check passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }
}
