// crates/mobility-lake-core/src/core/dataset.rs
// ============================================================================
// Module: Mobility Lake Datasets
// Description: Dataset kinds, storage formats, and written dataset records.
// Purpose: Describe what a stored blob holds and how it was encoded.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A dataset kind selects the normalization rules applied to a raw file. A
//! [`DatasetRecord`] describes a blob once it has been written to a zone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::ContentDigest;
use crate::core::zone::ObjectRef;
use crate::core::zone::Zone;

// ============================================================================
// SECTION: Dataset Kinds
// ============================================================================

/// Source dataset families handled by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Bike-share trip usage.
    BikeShareUsage,
    /// Parking facility reference data.
    ParkingInfo,
    /// Hourly parking occupancy rotation.
    ParkingRotation,
    /// Hourly traffic sensor counts.
    TrafficHourly,
    /// Citizen incident reports.
    CitizenReports,
}

impl DatasetKind {
    /// All dataset kinds in declaration order.
    pub const ALL: [Self; 5] = [
        Self::BikeShareUsage,
        Self::ParkingInfo,
        Self::ParkingRotation,
        Self::TrafficHourly,
        Self::CitizenReports,
    ];

    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BikeShareUsage => "bike_share_usage",
            Self::ParkingInfo => "parking_info",
            Self::ParkingRotation => "parking_rotation",
            Self::TrafficHourly => "traffic_hourly",
            Self::CitizenReports => "citizen_reports",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Encoding of a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    /// Apache Parquet columnar file.
    Parquet,
    /// Delimited text with a header row.
    Csv,
    /// JSON array of flat records.
    Json,
    /// Opaque SQL dump, never parsed.
    SqlDump,
}

impl DatasetFormat {
    /// Returns the stable label for the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::SqlDump => "sql_dump",
        }
    }

    /// Infers the format from an object key extension.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let extension = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
        match extension.as_str() {
            "parquet" => Some(Self::Parquet),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "sql" => Some(Self::SqlDump),
            _ => None,
        }
    }
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Dataset Records
// ============================================================================

/// A tabular blob written to a zone.
///
/// # Invariants
/// - `digest` is computed over the exact bytes stored at `object`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Zone holding the blob.
    pub zone: Zone,
    /// Storage location.
    pub object: ObjectRef,
    /// Number of rows written.
    pub row_count: usize,
    /// Encoding of the stored bytes.
    pub format: DatasetFormat,
    /// Content digest of the stored bytes.
    pub digest: ContentDigest,
}
