// crates/mobility-lake-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Blob Store
// Description: Mutex-guarded blob store for tests and dry runs.
// Purpose: Provide a deterministic BlobStore with controllable timestamps.
// Dependencies: crate::interfaces, crate::core::time
// ============================================================================

//! ## Overview
//! Buckets must exist before objects are written, matching S3 semantics.
//! Modification times come from an injected [`Clock`], and tests may set
//! them explicitly with [`InMemoryBlobStore::put_with_modified`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use time::OffsetDateTime;

use crate::core::time::Clock;
use crate::core::time::SystemClock;
use crate::interfaces::BlobStore;
use crate::interfaces::BlobStoreError;
use crate::interfaces::ObjectInfo;
use crate::interfaces::validate_bucket_name;
use crate::interfaces::validate_object_key;
use crate::interfaces::validate_prefix;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stored object with its modification time.
#[derive(Debug, Clone)]
struct StoredObject {
    /// Object bytes.
    bytes: Vec<u8>,
    /// Last write time.
    last_modified: OffsetDateTime,
}

/// Bucket name to key to object.
type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// In-memory blob store.
#[derive(Clone)]
pub struct InMemoryBlobStore {
    /// Bucket map protected by a mutex.
    buckets: Arc<Mutex<Buckets>>,
    /// Time source for modification times.
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBlobStore {
    /// Creates an empty store timed by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store timed by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
        }
    }

    /// Creates buckets up front.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when a bucket name is invalid.
    pub fn with_buckets(self, names: &[&str]) -> Result<Self, BlobStoreError> {
        for name in names {
            self.ensure_bucket(name)?;
        }
        Ok(self)
    }

    /// Writes an object with an explicit modification time.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when the bucket is missing or the key is invalid.
    pub fn put_with_modified(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        last_modified: OffsetDateTime,
    ) -> Result<(), BlobStoreError> {
        validate_object_key(key)?;
        let mut guard = self.lock()?;
        let objects = guard
            .get_mut(bucket)
            .ok_or_else(|| BlobStoreError::BucketNotFound(bucket.to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                last_modified,
            },
        );
        drop(guard);
        Ok(())
    }

    /// Acquires the bucket map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Buckets>, BlobStoreError> {
        self.buckets
            .lock()
            .map_err(|_| BlobStoreError::Backend("blob store mutex poisoned".to_string()))
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        self.put_with_modified(bucket, key, bytes, self.clock.now())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        let guard = self.lock()?;
        let objects =
            guard.get(bucket).ok_or_else(|| BlobStoreError::BucketNotFound(bucket.to_string()))?;
        objects.get(key).map(|object| object.bytes.clone()).ok_or_else(|| {
            BlobStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        })
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>, BlobStoreError> {
        validate_prefix(prefix)?;
        let guard = self.lock()?;
        let objects =
            guard.get(bucket).ok_or_else(|| BlobStoreError::BucketNotFound(bucket.to_string()))?;
        Ok(objects
            .range(prefix.to_string() ..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                last_modified: object.last_modified,
                size: object.bytes.len() as u64,
            })
            .collect())
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool, BlobStoreError> {
        Ok(self.lock()?.contains_key(bucket))
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<(), BlobStoreError> {
        validate_bucket_name(bucket)?;
        self.lock()?.entry(bucket.to_string()).or_default();
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn put_requires_bucket() {
        let store = InMemoryBlobStore::new();
        let err = store.put("process-zone", "a.parquet", b"x").unwrap_err();
        assert!(err.is_not_found());
        store.ensure_bucket("process-zone").unwrap();
        store.put("process-zone", "a.parquet", b"x").unwrap();
        assert_eq!(store.get("process-zone", "a.parquet").unwrap(), b"x".to_vec());
    }

    #[test]
    fn list_filters_by_prefix_in_key_order() {
        let store = InMemoryBlobStore::new().with_buckets(&["raw-ingestion-zone"]).unwrap();
        for key in ["traf/b.csv", "data/x.csv", "traf/a.csv"] {
            store.put("raw-ingestion-zone", key, b"1").unwrap();
        }
        let keys: Vec<String> =
            store.list("raw-ingestion-zone", "traf/").unwrap().into_iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["traf/a.csv".to_string(), "traf/b.csv".to_string()]);
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = InMemoryBlobStore::new().with_buckets(&["access-zone"]).unwrap();
        assert!(store.get("access-zone", "nope").unwrap_err().is_not_found());
        assert!(!store.bucket_exists("other-zone").unwrap());
    }
}
