// crates/mobility-lake-store/tests/fs_store.rs
// ============================================================================
// Module: Filesystem Store Tests
// Description: Bucket, key and listing behavior of the filesystem backend.
// Purpose: Ensure the local backend matches object-store semantics.
// ============================================================================

//! Filesystem blob store tests.

#![allow(
    clippy::unwrap_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;

use mobility_lake_core::BlobStore;
use mobility_lake_core::BlobStoreError;
use mobility_lake_store::FsBlobStore;

fn store() -> (tempfile::TempDir, FsBlobStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::open(dir.path().join("lake")).unwrap();
    (dir, store)
}

#[test]
fn put_then_get_returns_same_bytes() {
    let (_dir, store) = store();
    store.ensure_bucket("raw-ingestion-zone").unwrap();
    store.put("raw-ingestion-zone", "data/bicimad.csv", b"id\n1\n").unwrap();
    assert_eq!(store.get("raw-ingestion-zone", "data/bicimad.csv").unwrap(), b"id\n1\n");
    store.put("raw-ingestion-zone", "data/bicimad.csv", b"id\n2\n").unwrap();
    assert_eq!(store.get("raw-ingestion-zone", "data/bicimad.csv").unwrap(), b"id\n2\n");
}

#[test]
fn missing_bucket_and_object_are_distinct_errors() {
    let (_dir, store) = store();
    assert!(matches!(
        store.put("process-zone", "a.parquet", b"x"),
        Err(BlobStoreError::BucketNotFound(_))
    ));
    store.ensure_bucket("process-zone").unwrap();
    let err = store.get("process-zone", "nested/absent.parquet").unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    let err = store.get("process-zone", "absent.parquet").unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[test]
fn traversal_keys_are_rejected() {
    let (_dir, store) = store();
    store.ensure_bucket("access-zone").unwrap();
    for key in ["../escape.txt", "/etc/passwd", "a/../../b", "a\\b"] {
        assert!(matches!(store.put("access-zone", key, b"x"), Err(BlobStoreError::Invalid(_))));
    }
    assert!(matches!(store.ensure_bucket("../up"), Err(BlobStoreError::Invalid(_))));
}

#[cfg(unix)]
#[test]
fn symlinked_directories_cannot_escape_the_bucket() {
    let (dir, store) = store();
    store.ensure_bucket("access-zone").unwrap();
    let outside = dir.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, store.root().join("access-zone/link")).unwrap();
    assert!(matches!(
        store.put("access-zone", "link/file.txt", b"x"),
        Err(BlobStoreError::Invalid(_))
    ));
    assert!(!outside.join("file.txt").exists());
}

#[test]
fn list_is_recursive_sorted_and_prefix_filtered() {
    let (_dir, store) = store();
    store.ensure_bucket("raw-ingestion-zone").unwrap();
    store.put("raw-ingestion-zone", "traf/b.csv", b"bb").unwrap();
    store.put("raw-ingestion-zone", "traf/a.csv", b"a").unwrap();
    store.put("raw-ingestion-zone", "data/bicimad.csv", b"x").unwrap();
    let all: Vec<String> =
        store.list("raw-ingestion-zone", "").unwrap().into_iter().map(|info| info.key).collect();
    assert_eq!(all, vec!["data/bicimad.csv", "traf/a.csv", "traf/b.csv"]);
    let traffic = store.list("raw-ingestion-zone", "traf/").unwrap();
    assert_eq!(traffic.len(), 2);
    assert_eq!(traffic[1].size, 2);
    assert!(matches!(store.list("absent-zone", ""), Err(BlobStoreError::BucketNotFound(_))));
}

#[test]
fn bucket_existence_tracks_directories() {
    let (_dir, store) = store();
    assert!(!store.bucket_exists("govern-zone-metadata").unwrap());
    store.ensure_bucket("govern-zone-metadata").unwrap();
    store.ensure_bucket("govern-zone-metadata").unwrap();
    assert!(store.bucket_exists("govern-zone-metadata").unwrap());
}
