// crates/mobility-lake-core/src/lib.rs
// ============================================================================
// Module: Mobility Lake Core
// Description: Multi-zone data lake pipeline for urban mobility datasets.
// Purpose: Provide zone storage contracts, transforms and governance records.
// Dependencies: arrow, parquet, serde, time, sha2, thiserror
// ============================================================================

//! ## Overview
//! Data moves through four zones. Raw ingestion lands source files verbatim,
//! stages normalize them into Parquet in the process zone, access builders
//! aggregate analytical views and the govern zone records quality checks,
//! lineage edges and catalog metadata for every step.
//!
//! Storage is abstracted by [`interfaces::BlobStore`]; the relational copy of
//! access views goes through [`interfaces::RelationalSink`]. Both are
//! implemented in sibling crates.

pub mod codec;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;
pub use interfaces::BlobStore;
pub use interfaces::BlobStoreError;
pub use interfaces::ObjectInfo;
pub use interfaces::RelationalSink;
pub use interfaces::SinkError;
pub use runtime::AccessBuilder;
pub use runtime::AccessView;
pub use runtime::GovernReporter;
pub use runtime::GovernanceStore;
pub use runtime::InMemoryBlobStore;
pub use runtime::LineageGraph;
pub use runtime::MetadataCatalog;
pub use runtime::MobilityLake;
pub use runtime::PipelineAuditSink;
pub use runtime::QualityGate;
pub use runtime::RawIngestor;
pub use runtime::StageRunner;
pub use runtime::StageSpec;
