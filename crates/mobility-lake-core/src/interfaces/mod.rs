// crates/mobility-lake-core/src/interfaces/mod.rs
// ============================================================================
// Module: Mobility Lake Interfaces
// Description: Backend-agnostic blob store and relational sink contracts.
// Purpose: Keep the pipeline independent of MinIO, S3, filesystems and SQL engines.
// Dependencies: crate::core, serde, thiserror, time
// ============================================================================

//! ## Overview
//! The pipeline talks to storage through [`BlobStore`] and to SQL consumers
//! through [`RelationalSink`]. Both are synchronous; backends that wrap async
//! clients drive them internally. Object keys are validated with
//! [`validate_object_key`] before any backend sees them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Component;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::table::Table;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single key segment.
pub const MAX_KEY_SEGMENT_LENGTH: usize = 255;
/// Maximum length of a full object key.
pub const MAX_KEY_LENGTH: usize = 1024;
/// Maximum length of a bucket name.
pub const MAX_BUCKET_NAME_LENGTH: usize = 63;

// ============================================================================
// SECTION: Blob Store
// ============================================================================

/// Listing entry for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Last modification time.
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    /// Size in bytes.
    pub size: u64,
}

/// Blob store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobStoreError {
    /// The object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },
    /// The bucket does not exist.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    /// A bucket name or key was rejected.
    #[error("invalid object reference: {0}")]
    Invalid(String),
    /// Local I/O failed.
    #[error("blob store io error: {0}")]
    Io(String),
    /// The remote backend failed.
    #[error("blob store backend error: {0}")]
    Backend(String),
}

impl BlobStoreError {
    /// Returns true for missing objects and buckets.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::BucketNotFound(_))
    }
}

/// Key/value object storage addressed by bucket and key.
pub trait BlobStore: Send + Sync {
    /// Stores bytes, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when the write fails.
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError>;

    /// Loads an object.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::NotFound`] when the object is missing.
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BlobStoreError>;

    /// Lists objects whose key starts with `prefix`, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when the listing fails.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>, BlobStoreError>;

    /// Returns true when the bucket exists.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when the backend cannot answer.
    fn bucket_exists(&self, bucket: &str) -> Result<bool, BlobStoreError>;

    /// Creates the bucket when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when creation fails.
    fn ensure_bucket(&self, bucket: &str) -> Result<(), BlobStoreError>;
}

// ============================================================================
// SECTION: Relational Sink
// ============================================================================

/// Relational sink errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// A table or column name was rejected.
    #[error("invalid sink identifier: {0}")]
    Invalid(String),
    /// The sink failed to apply the load.
    #[error("relational sink error: {0}")]
    Sink(String),
}

/// SQL-facing target for analytics views.
pub trait RelationalSink: Send + Sync {
    /// Drops and recreates `table_name` holding exactly the rows of `table`.
    /// Returns the number of rows loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the load fails; the previous table is kept.
    fn load_replace(&self, table_name: &str, table: &Table) -> Result<usize, SinkError>;
}

// ============================================================================
// SECTION: Key Validation
// ============================================================================

/// Validates a bucket name (S3 naming rules: lowercase, digits, `-` and `.`).
///
/// # Errors
///
/// Returns [`BlobStoreError::Invalid`] when the name is not acceptable.
pub fn validate_bucket_name(bucket: &str) -> Result<(), BlobStoreError> {
    if bucket.len() < 3 || bucket.len() > MAX_BUCKET_NAME_LENGTH {
        return Err(BlobStoreError::Invalid(format!(
            "bucket name `{bucket}` must be 3 to {MAX_BUCKET_NAME_LENGTH} characters"
        )));
    }
    let valid_chars = bucket
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '.');
    let valid_edges = bucket.starts_with(|ch: char| ch.is_ascii_alphanumeric())
        && bucket.ends_with(|ch: char| ch.is_ascii_alphanumeric());
    if !valid_chars || !valid_edges {
        return Err(BlobStoreError::Invalid(format!(
            "bucket name `{bucket}` contains invalid characters"
        )));
    }
    Ok(())
}

/// Validates a relative, traversal-free object key.
///
/// # Errors
///
/// Returns [`BlobStoreError::Invalid`] when the key is empty, absolute,
/// too long, or contains traversal segments.
pub fn validate_object_key(key: &str) -> Result<(), BlobStoreError> {
    if key.is_empty() {
        return Err(BlobStoreError::Invalid("object key must be set".to_string()));
    }
    if key.contains('\\') {
        return Err(BlobStoreError::Invalid("object key must not contain backslashes".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(BlobStoreError::Invalid("object key exceeds length limit".to_string()));
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(BlobStoreError::Invalid(format!(
            "object key `{key}` must not start or end with a slash"
        )));
    }
    for component in Path::new(key).components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_string_lossy();
                if segment.len() > MAX_KEY_SEGMENT_LENGTH {
                    return Err(BlobStoreError::Invalid(
                        "object key segment exceeds length limit".to_string(),
                    ));
                }
            }
            _ => {
                return Err(BlobStoreError::Invalid(format!(
                    "object key `{key}` must be relative without traversal"
                )));
            }
        }
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(BlobStoreError::Invalid(format!("object key `{key}` has an empty segment")));
    }
    Ok(())
}

/// Validates a listing prefix. An empty prefix lists the whole bucket.
///
/// # Errors
///
/// Returns [`BlobStoreError::Invalid`] for absolute or traversing prefixes.
pub fn validate_prefix(prefix: &str) -> Result<(), BlobStoreError> {
    if prefix.is_empty() {
        return Ok(());
    }
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    validate_object_key(trimmed)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_zone_bucket_names() {
        assert!(validate_bucket_name("raw-ingestion-zone").is_ok());
        assert!(validate_bucket_name("Raw").is_err());
        assert!(validate_bucket_name("-raw").is_err());
    }

    #[test]
    fn rejects_traversal_keys() {
        assert!(validate_object_key("data/bicimad.csv").is_ok());
        assert!(validate_object_key("../secrets").is_err());
        assert!(validate_object_key("/abs/key").is_err());
        assert!(validate_object_key("data//x.csv").is_err());
        assert!(validate_object_key("data/./x.csv").is_err());
    }

    #[test]
    fn prefixes_may_end_with_a_slash() {
        assert!(validate_prefix("").is_ok());
        assert!(validate_prefix("lineage/").is_ok());
        assert!(validate_prefix("lineage/trafico_2024").is_ok());
        assert!(validate_prefix("../").is_err());
    }
}
