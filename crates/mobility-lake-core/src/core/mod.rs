// crates/mobility-lake-core/src/core/mod.rs
// ============================================================================
// Module: Mobility Lake Core Types
// Description: Zones, datasets, tables and governance record types.
// Purpose: Provide the shared vocabulary of every pipeline component.
// Dependencies: serde, time, sha2, serde_jcs
// ============================================================================

//! ## Overview
//! Core types carry no I/O. Every governance record type here serializes to
//! the JSON documents stored in the govern zone; table types hold columnar
//! data between decode and encode.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod dataset;
pub mod hashing;
pub mod identifiers;
pub mod lineage;
pub mod metadata;
pub mod policy;
pub mod quality;
pub mod table;
pub mod time;
pub mod zone;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dataset::DatasetFormat;
pub use dataset::DatasetKind;
pub use dataset::DatasetRecord;
pub use hashing::ContentDigest;
pub use hashing::DIGEST_ALGORITHM;
pub use hashing::DigestError;
pub use identifiers::DatasetName;
pub use identifiers::StageName;
pub use lineage::LineageEdge;
pub use lineage::LineageNote;
pub use lineage::LineageSource;
pub use lineage::LineageStep;
pub use lineage::LineageTrace;
pub use lineage::MULTIPLE_SOURCES;
pub use metadata::DatasetDescriptor;
pub use metadata::MetadataRecord;
pub use policy::SECURITY_POLICY_KEY;
pub use policy::SecurityPolicy;
pub use policy::ZonePolicy;
pub use quality::CheckKind;
pub use quality::CheckResult;
pub use quality::QualityCheckRecord;
pub use quality::QualityMode;
pub use quality::QualityRules;
pub use table::Column;
pub use table::ColumnData;
pub use table::DataType;
pub use table::Table;
pub use table::TableError;
pub use table::Value;
pub use self::time::Clock;
pub use self::time::FixedClock;
pub use self::time::SystemClock;
pub use zone::ObjectRef;
pub use zone::Zone;
pub use zone::ZoneBuckets;
