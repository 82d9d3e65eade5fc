// crates/mobility-lake-core/src/runtime/governance.rs
// ============================================================================
// Module: Governance Record Store
// Description: JSON record persistence under the govern metadata bucket.
// Purpose: Give lineage, quality and metadata records stable, collision-free keys.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Each governance record is its own JSON object:
//!
//! - `metadata/{dataset}.json` (replaced on republish)
//! - `lineage/{source}_to_{target}_{stamp}_{seq}.json` (append-only)
//! - `quality/{dataset}_{stamp}_{seq}.json` (append-only)
//!
//! Append-only keys carry a millisecond stamp plus a per-store sequence
//! number, so concurrent appends through one store never overwrite each
//! other and keys sort chronologically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::identifiers::DatasetName;
use crate::core::lineage::LineageEdge;
use crate::core::metadata::MetadataRecord;
use crate::core::quality::QualityCheckRecord;
use crate::core::time::Clock;
use crate::core::time::key_stamp;
use crate::interfaces::BlobStore;
use crate::interfaces::BlobStoreError;
use crate::interfaces::validate_object_key;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of metadata records.
pub const METADATA_PREFIX: &str = "metadata/";
/// Prefix of lineage edges.
pub const LINEAGE_PREFIX: &str = "lineage/";
/// Prefix of quality check records.
pub const QUALITY_PREFIX: &str = "quality/";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Governance record errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    /// The blob store failed.
    #[error(transparent)]
    Store(#[from] BlobStoreError),
    /// A record could not be serialized.
    #[error("governance record encode error: {0}")]
    Encode(String),
    /// A stored record could not be parsed.
    #[error("governance record `{key}` is unreadable: {message}")]
    Decode {
        /// Object key.
        key: String,
        /// Parser message.
        message: String,
    },
    /// A dataset name cannot be used in a key.
    #[error("invalid dataset name `{0}`")]
    InvalidName(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Reads and writes governance records in the metadata bucket.
pub struct GovernanceStore {
    /// Backing blob store.
    store: Arc<dyn BlobStore>,
    /// Govern metadata bucket.
    bucket: String,
    /// Time source for record keys.
    clock: Arc<dyn Clock>,
    /// Per-store sequence for append-only keys.
    sequence: AtomicU64,
}

impl GovernanceStore {
    /// Creates a governance store over `bucket`.
    #[must_use]
    pub fn new(
        store: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            clock,
            sequence: AtomicU64::new(0),
        }
    }

    /// Returns the metadata bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the clock used for record keys and timestamps.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the backing blob store.
    #[must_use]
    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Writes a metadata record, replacing any record with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the name is unusable or the write fails.
    pub fn put_metadata(&self, record: &MetadataRecord) -> Result<String, GovernanceError> {
        let key = metadata_key(&record.dataset_name)?;
        self.put_json(&key, record)?;
        Ok(key)
    }

    /// Loads the metadata record for a dataset, if present.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the read fails or the record is unreadable.
    pub fn get_metadata(
        &self,
        name: &DatasetName,
    ) -> Result<Option<MetadataRecord>, GovernanceError> {
        let key = metadata_key(name)?;
        match self.get_json(&key) {
            Ok(record) => Ok(Some(record)),
            Err(GovernanceError::Store(err)) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Loads all metadata records; unreadable keys are returned separately.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when listing or reading fails.
    pub fn list_metadata(&self) -> Result<RecordPage<MetadataRecord>, GovernanceError> {
        self.list_json(METADATA_PREFIX)
    }

    // ------------------------------------------------------------------------
    // Lineage
    // ------------------------------------------------------------------------

    /// Appends a lineage edge under a fresh key.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the write fails.
    pub fn append_lineage(&self, edge: &LineageEdge) -> Result<String, GovernanceError> {
        let stem = format!(
            "{LINEAGE_PREFIX}{}_to_{}",
            edge.source.key_fragment(),
            edge.target.flattened_object()
        );
        let key = self.append_key(&stem);
        self.put_json(&key, edge)?;
        Ok(key)
    }

    /// Loads all lineage edges in key order.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when listing or reading fails.
    pub fn list_lineage(&self) -> Result<RecordPage<LineageEdge>, GovernanceError> {
        self.list_json(LINEAGE_PREFIX)
    }

    // ------------------------------------------------------------------------
    // Quality
    // ------------------------------------------------------------------------

    /// Appends a quality check record under a fresh key.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the name is unusable or the write fails.
    pub fn append_quality(&self, record: &QualityCheckRecord) -> Result<String, GovernanceError> {
        validate_name(&record.dataset)?;
        let key = self.append_key(&format!("{QUALITY_PREFIX}{}", record.dataset));
        self.put_json(&key, record)?;
        Ok(key)
    }

    /// Loads all quality check records in key order.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when listing or reading fails.
    pub fn list_quality(&self) -> Result<RecordPage<QualityCheckRecord>, GovernanceError> {
        self.list_json(QUALITY_PREFIX)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Builds a unique, chronologically sortable key from a stem.
    fn append_key(&self, stem: &str) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{stem}_{}_{sequence:06}.json", key_stamp(self.clock.now()))
    }

    /// Serializes and stores a record.
    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), GovernanceError> {
        validate_object_key(key)?;
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|err| GovernanceError::Encode(err.to_string()))?;
        self.store.put(&self.bucket, key, &bytes)?;
        Ok(())
    }

    /// Loads and parses a record.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, GovernanceError> {
        let bytes = self.store.get(&self.bucket, key)?;
        serde_json::from_slice(&bytes).map_err(|err| GovernanceError::Decode {
            key: key.to_string(),
            message: err.to_string(),
        })
    }

    /// Loads every record under a prefix.
    fn list_json<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<RecordPage<T>, GovernanceError> {
        let mut page = RecordPage {
            records: Vec::new(),
            unreadable: Vec::new(),
        };
        if !self.store.bucket_exists(&self.bucket)? {
            return Ok(page);
        }
        for info in self.store.list(&self.bucket, prefix)? {
            if !info.key.ends_with(".json") {
                continue;
            }
            match self.get_json(&info.key) {
                Ok(record) => page.records.push((info.key, record)),
                Err(GovernanceError::Decode {
                    key, ..
                }) => page.unreadable.push(key),
                Err(err) => return Err(err),
            }
        }
        Ok(page)
    }
}

/// Records read from one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPage<T> {
    /// Parsed records with their keys, in key order.
    pub records: Vec<(String, T)>,
    /// Keys that could not be parsed.
    pub unreadable: Vec<String>,
}

/// Returns the key of a dataset's metadata record.
fn metadata_key(name: &DatasetName) -> Result<String, GovernanceError> {
    validate_name(name)?;
    Ok(format!("{METADATA_PREFIX}{name}.json"))
}

/// Rejects names that would escape their prefix.
fn validate_name(name: &DatasetName) -> Result<(), GovernanceError> {
    let text = name.as_str();
    let valid = !text.is_empty()
        && text.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !text.starts_with('.');
    if valid { Ok(()) } else { Err(GovernanceError::InvalidName(text.to_string())) }
}
