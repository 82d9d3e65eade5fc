// crates/mobility-lake-core/src/core/zone.rs
// ============================================================================
// Module: Mobility Lake Zones
// Description: Zone names, bucket assignments, and object references.
// Purpose: Address every dataset by bucket and object key.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A zone is a level of data readiness backed by one bucket in the blob store.
//! The govern zone owns two buckets: one for metadata, lineage and quality
//! records, and one for the security policy document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default raw ingestion bucket.
pub const DEFAULT_RAW_BUCKET: &str = "raw-ingestion-zone";
/// Default process bucket.
pub const DEFAULT_PROCESS_BUCKET: &str = "process-zone";
/// Default access bucket.
pub const DEFAULT_ACCESS_BUCKET: &str = "access-zone";
/// Default governance metadata bucket.
pub const DEFAULT_GOVERN_METADATA_BUCKET: &str = "govern-zone-metadata";
/// Default governance security bucket.
pub const DEFAULT_GOVERN_SECURITY_BUCKET: &str = "govern-zone-security";

// ============================================================================
// SECTION: Zones
// ============================================================================

/// Pipeline zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Unmodified ingested files.
    Raw,
    /// Cleaned and standardized tables.
    Process,
    /// Analytics-ready views.
    Access,
    /// Metadata, lineage, quality and security records.
    Govern,
}

impl Zone {
    /// Returns the stable label for the zone.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Process => "process",
            Self::Access => "access",
            Self::Govern => "govern",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Object References
// ============================================================================

/// Bucket and object key of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Bucket name.
    pub bucket: String,
    /// Object key within the bucket.
    pub object: String,
}

impl ObjectRef {
    /// Creates a new object reference.
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Returns the object key with path separators flattened to `_`.
    #[must_use]
    pub fn flattened_object(&self) -> String {
        self.object.replace('/', "_")
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object)
    }
}

// ============================================================================
// SECTION: Bucket Assignment
// ============================================================================

/// Bucket names assigned to each zone.
///
/// # Invariants
/// - Names are validated by the configuration layer before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneBuckets {
    /// Raw ingestion bucket.
    pub raw: String,
    /// Process bucket.
    pub process: String,
    /// Access bucket.
    pub access: String,
    /// Governance metadata, lineage and quality bucket.
    pub govern_metadata: String,
    /// Governance security policy bucket.
    pub govern_security: String,
}

impl Default for ZoneBuckets {
    fn default() -> Self {
        Self {
            raw: DEFAULT_RAW_BUCKET.to_string(),
            process: DEFAULT_PROCESS_BUCKET.to_string(),
            access: DEFAULT_ACCESS_BUCKET.to_string(),
            govern_metadata: DEFAULT_GOVERN_METADATA_BUCKET.to_string(),
            govern_security: DEFAULT_GOVERN_SECURITY_BUCKET.to_string(),
        }
    }
}

impl ZoneBuckets {
    /// Returns the bucket backing a zone. The govern zone maps to the metadata bucket.
    #[must_use]
    pub fn bucket(&self, zone: Zone) -> &str {
        match zone {
            Zone::Raw => &self.raw,
            Zone::Process => &self.process,
            Zone::Access => &self.access,
            Zone::Govern => &self.govern_metadata,
        }
    }

    /// Returns the zone owning a bucket, if any.
    #[must_use]
    pub fn zone_of(&self, bucket: &str) -> Option<Zone> {
        if bucket == self.raw {
            Some(Zone::Raw)
        } else if bucket == self.process {
            Some(Zone::Process)
        } else if bucket == self.access {
            Some(Zone::Access)
        } else if bucket == self.govern_metadata || bucket == self.govern_security {
            Some(Zone::Govern)
        } else {
            None
        }
    }

    /// Returns all bucket names in zone order.
    #[must_use]
    pub fn all(&self) -> [&str; 5] {
        [
            &self.raw,
            &self.process,
            &self.access,
            &self.govern_metadata,
            &self.govern_security,
        ]
    }
}
