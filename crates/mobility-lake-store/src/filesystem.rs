// crates/mobility-lake-store/src/filesystem.rs
// ============================================================================
// Module: Filesystem Blob Store
// Description: Buckets as directories, objects as files below a root.
// Purpose: Provide a local backend with the same semantics as object storage.
// Dependencies: mobility-lake-core, time
// ============================================================================

//! ## Overview
//! Every bucket is a directory directly below the store root and every key a
//! relative file path inside it. Keys are untrusted: they are validated and
//! the resolved parent directory must stay inside the bucket after symlink
//! resolution. Writes go to a sibling temporary file that is renamed into
//! place, so readers never see a partial object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use mobility_lake_core::BlobStore;
use mobility_lake_core::BlobStoreError;
use mobility_lake_core::ObjectInfo;
use mobility_lake_core::interfaces::validate_bucket_name;
use mobility_lake_core::interfaces::validate_object_key;
use mobility_lake_core::interfaces::validate_prefix;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix of in-flight writes; such files are never listed.
const PARTIAL_SUFFIX: &str = ".partial";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Filesystem-backed blob store.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    /// Canonical root directory.
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the root cannot be created or
    /// resolved.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BlobStoreError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|err| io_error("unable to create store root", &err))?;
        let root =
            root.canonicalize().map_err(|err| io_error("unable to resolve store root", &err))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of an existing bucket.
    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, BlobStoreError> {
        validate_bucket_name(bucket)?;
        let dir = self.root.join(bucket);
        if !dir.is_dir() {
            return Err(BlobStoreError::BucketNotFound(bucket.to_string()));
        }
        Ok(dir)
    }

    /// Resolves an object path, rejecting anything outside the bucket.
    fn object_path(
        &self,
        bucket: &str,
        key: &str,
        create_parent: bool,
    ) -> Result<PathBuf, BlobStoreError> {
        validate_object_key(key)?;
        let bucket_dir = self.bucket_dir(bucket)?;
        let joined = bucket_dir.join(key);
        let parent = joined
            .parent()
            .ok_or_else(|| BlobStoreError::Invalid(format!("object key `{key}` has no parent")))?;
        if create_parent {
            fs::create_dir_all(parent)
                .map_err(|err| io_error("unable to create object directory", &err))?;
        }
        let Ok(resolved_parent) = parent.canonicalize() else {
            return Err(BlobStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        };
        let bucket_root = bucket_dir
            .canonicalize()
            .map_err(|err| io_error("unable to resolve bucket directory", &err))?;
        if !resolved_parent.starts_with(&bucket_root) {
            return Err(BlobStoreError::Invalid(format!("object key `{key}` escapes its bucket")));
        }
        let file_name = joined
            .file_name()
            .ok_or_else(|| {
                BlobStoreError::Invalid(format!("object key `{key}` has no file name"))
            })?;
        Ok(resolved_parent.join(file_name))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        if key.ends_with(PARTIAL_SUFFIX) {
            return Err(BlobStoreError::Invalid(format!(
                "object key `{key}` uses the reserved `{PARTIAL_SUFFIX}` suffix"
            )));
        }
        let path = self.object_path(bucket, key, true)?;
        let mut partial = path.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);
        fs::write(&partial, bytes).map_err(|err| io_error("unable to write object", &err))?;
        fs::rename(&partial, &path).map_err(|err| {
            let _ = fs::remove_file(&partial);
            io_error("unable to commit object", &err)
        })
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        let path = self.object_path(bucket, key, false)?;
        fs::read(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound || path.is_dir() {
                BlobStoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                io_error("unable to read object", &err)
            }
        })
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>, BlobStoreError> {
        validate_prefix(prefix)?;
        let bucket_dir = self.bucket_dir(bucket)?;
        let mut objects = Vec::new();
        collect_objects(&bucket_dir, "", &mut objects)?;
        objects.retain(|info| info.key.starts_with(prefix));
        objects.sort_by(|left, right| left.key.cmp(&right.key));
        Ok(objects)
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool, BlobStoreError> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket).is_dir())
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<(), BlobStoreError> {
        validate_bucket_name(bucket)?;
        fs::create_dir_all(self.root.join(bucket))
            .map_err(|err| io_error("unable to create bucket directory", &err))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Walks a bucket directory and records every committed file.
///
/// Symlinked directories are not followed.
fn collect_objects(
    dir: &Path,
    prefix: &str,
    out: &mut Vec<ObjectInfo>,
) -> Result<(), BlobStoreError> {
    let entries = fs::read_dir(dir).map_err(|err| io_error("unable to list bucket", &err))?;
    for entry in entries {
        let entry = entry.map_err(|err| io_error("unable to list bucket", &err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if prefix.is_empty() { name.clone() } else { format!("{prefix}/{name}") };
        let file_type = entry.file_type().map_err(|err| io_error("unable to stat entry", &err))?;
        if file_type.is_dir() {
            collect_objects(&entry.path(), &key, out)?;
            continue;
        }
        if !file_type.is_file() || name.ends_with(PARTIAL_SUFFIX) {
            continue;
        }
        let metadata = entry.metadata().map_err(|err| io_error("unable to stat object", &err))?;
        let last_modified =
            metadata.modified().map_or(OffsetDateTime::UNIX_EPOCH, OffsetDateTime::from);
        out.push(ObjectInfo {
            key,
            last_modified,
            size: metadata.len(),
        });
    }
    Ok(())
}

/// Maps an I/O error to a store error with context.
fn io_error(context: &str, err: &io::Error) -> BlobStoreError {
    BlobStoreError::Io(format!("{context}: {err}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn partial_suffix_is_reserved() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        store.ensure_bucket("raw-ingestion-zone").unwrap();
        let err = store.put("raw-ingestion-zone", "data/x.partial", b"x").unwrap_err();
        assert!(matches!(err, BlobStoreError::Invalid(_)));
    }

    #[test]
    fn leftover_partial_files_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        store.ensure_bucket("process-zone").unwrap();
        store.put("process-zone", "data/a.parquet", b"a").unwrap();
        fs::write(store.root().join("process-zone/data/b.parquet.partial"), b"b").unwrap();
        let keys: Vec<String> =
            store.list("process-zone", "").unwrap().into_iter().map(|info| info.key).collect();
        assert_eq!(keys, vec!["data/a.parquet".to_string()]);
    }
}
