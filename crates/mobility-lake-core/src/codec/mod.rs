// crates/mobility-lake-core/src/codec/mod.rs
// ============================================================================
// Module: Mobility Lake Codecs
// Description: Raw text decoders and the columnar Parquet codec.
// Purpose: Convert stored bytes to tables and back.
// Dependencies: arrow, parquet, serde_json
// ============================================================================

//! ## Overview
//! Raw CSV and JSON files decode into all-text tables; typing is the
//! normalizer's job. Process and Access zone tables are stored as Parquet and
//! round-trip exactly, integer nulls included.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod csv;
pub mod json;
pub mod parquet;

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::dataset::DatasetFormat;
use crate::core::table::Table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::csv::decode_csv;
pub use self::json::decode_json_records;
pub use self::json::table_to_json_rows;
pub use self::parquet::decode_parquet;
pub use self::parquet::encode_parquet;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// CSV input could not be decoded.
    #[error("csv decode error: {0}")]
    Csv(String),
    /// JSON input could not be decoded.
    #[error("json decode error: {0}")]
    Json(String),
    /// Parquet encoding or decoding failed.
    #[error("parquet codec error: {0}")]
    Parquet(String),
    /// The format cannot be decoded into a table.
    #[error("unsupported format: {0}")]
    Unsupported(String),
}

// ============================================================================
// SECTION: Raw Formats
// ============================================================================

/// Encoding of a stage's source blob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// CSV with a header row.
    #[default]
    Csv,
    /// JSON array (or JSON lines) of flat objects.
    Json,
    /// Parquet file.
    Parquet,
}

impl SourceFormat {
    /// Returns the matching dataset format.
    #[must_use]
    pub const fn dataset_format(self) -> DatasetFormat {
        match self {
            Self::Csv => DatasetFormat::Csv,
            Self::Json => DatasetFormat::Json,
            Self::Parquet => DatasetFormat::Parquet,
        }
    }
}

/// Decodes a source blob in the given format.
///
/// # Errors
///
/// Returns [`CodecError`] when the bytes are not valid for the format.
pub fn decode(format: SourceFormat, bytes: &[u8]) -> Result<Table, CodecError> {
    match format {
        SourceFormat::Csv => decode_csv(bytes),
        SourceFormat::Json => decode_json_records(bytes),
        SourceFormat::Parquet => decode_parquet(bytes),
    }
}
