// crates/mobility-lake-core/src/core/identifiers.rs
// ============================================================================
// Module: Mobility Lake Identifiers
// Description: Opaque string identifiers for datasets and pipeline stages.
// Purpose: Keep dataset and stage names typed across records and reports.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are plain strings on the wire. Validation of the characters a
//! name may contain happens where a name becomes part of a storage key (see
//! [`crate::runtime::governance`]), not in these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Name of a dataset tracked by the governance records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetName(String);

impl DatasetName {
    /// Creates a new dataset name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DatasetName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DatasetName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Name of a pipeline stage, used in audit events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageName(String);

impl StageName {
    /// Creates a new stage name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for StageName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StageName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
