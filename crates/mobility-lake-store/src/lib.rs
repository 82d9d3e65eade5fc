// crates/mobility-lake-store/src/lib.rs
// ============================================================================
// Module: Mobility Lake Store
// Description: Blob store backends for the lake zones.
// Purpose: Persist zone objects on a local filesystem or an S3 endpoint.
// Dependencies: mobility-lake-core, aws-sdk-s3 (feature `s3`)
// ============================================================================

//! ## Overview
//! [`FsBlobStore`] maps buckets to directories under a root and is the
//! default backend. [`S3BlobStore`] talks to any S3-compatible endpoint and
//! is compiled with the `s3` feature. Both implement
//! [`mobility_lake_core::BlobStore`] and validate every bucket name and key
//! before touching storage.

pub mod filesystem;
#[cfg(feature = "s3")]
pub mod s3;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use filesystem::FsBlobStore;
#[cfg(feature = "s3")]
pub use s3::S3BlobStore;
#[cfg(feature = "s3")]
pub use s3::S3StoreOptions;
