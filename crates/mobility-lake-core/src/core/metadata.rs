// crates/mobility-lake-core/src/core/metadata.rs
// ============================================================================
// Module: Mobility Lake Metadata Records
// Description: Catalog entries describing published analytics datasets.
// Purpose: Tell consumers what a dataset is for and where it lives.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Metadata records are keyed by dataset name. The location fields are
//! optional on read so that hand-written or legacy records still list under
//! the `"unknown"` catalog bucket instead of failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::DatasetName;
use crate::core::zone::ObjectRef;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Static description of an analytics dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// What the dataset contains.
    pub description: String,
    /// What the dataset is used for.
    pub purpose: String,
    /// How often it is rebuilt.
    pub refresh_frequency: String,
    /// Intended audience.
    pub target_users: String,
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Catalog entry for one published dataset.
///
/// # Invariants
/// - At most one record exists per `dataset_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Unique dataset name.
    pub dataset_name: DatasetName,
    /// What the dataset contains.
    #[serde(default)]
    pub description: String,
    /// What the dataset is used for.
    #[serde(default)]
    pub purpose: String,
    /// How often it is rebuilt.
    #[serde(default)]
    pub refresh_frequency: String,
    /// Intended audience.
    #[serde(default)]
    pub target_users: String,
    /// Storage format label.
    #[serde(default)]
    pub format: String,
    /// Bucket holding the dataset.
    #[serde(default)]
    pub source_bucket: Option<String>,
    /// Object key of the dataset.
    #[serde(default)]
    pub object_name: Option<String>,
    /// Publication time.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub uploaded_at: Option<OffsetDateTime>,
}

impl MetadataRecord {
    /// Builds a record for a dataset published at `location`.
    #[must_use]
    pub fn published(
        dataset_name: DatasetName,
        descriptor: &DatasetDescriptor,
        format: &str,
        location: &ObjectRef,
        uploaded_at: OffsetDateTime,
    ) -> Self {
        Self {
            dataset_name,
            description: descriptor.description.clone(),
            purpose: descriptor.purpose.clone(),
            refresh_frequency: descriptor.refresh_frequency.clone(),
            target_users: descriptor.target_users.clone(),
            format: format.to_string(),
            source_bucket: Some(location.bucket.clone()),
            object_name: Some(location.object.clone()),
            uploaded_at: Some(uploaded_at),
        }
    }
}
