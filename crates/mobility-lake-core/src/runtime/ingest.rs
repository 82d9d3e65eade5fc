// crates/mobility-lake-core/src/runtime/ingest.rs
// ============================================================================
// Module: Raw Ingestion
// Description: Verbatim upload of local source files into the raw zone.
// Purpose: Land source data unchanged so every later zone can be rebuilt.
// Dependencies: crate::codec, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! Files are uploaded byte for byte. Tabular files are also decoded to report
//! a row count; a file that does not decode is still uploaded with a count of
//! zero, as is the opaque SQL dump. Dated keys insert `_YYYYmmdd` before the
//! extension so repeated ingestions land side by side and the stage runner
//! can pick the latest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::codec::decode_csv;
use crate::codec::decode_json_records;
use crate::codec::decode_parquet;
use crate::core::dataset::DatasetFormat;
use crate::core::dataset::DatasetRecord;
use crate::core::hashing::ContentDigest;
use crate::core::time::Clock;
use crate::core::time::date_stamp;
use crate::core::zone::ObjectRef;
use crate::core::zone::Zone;
use crate::interfaces::BlobStore;
use crate::interfaces::BlobStoreError;
use crate::interfaces::validate_object_key;
use crate::runtime::audit::OperationKind;
use crate::runtime::audit::PipelineAuditEvent;
use crate::runtime::audit::PipelineAuditEventParams;
use crate::runtime::audit::PipelineAuditSink;

// ============================================================================
// SECTION: Specs
// ============================================================================

/// One local file to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestSpec {
    /// Local file, relative to the ingestion directory unless absolute.
    pub path: PathBuf,
    /// Raw-zone object key.
    pub key: String,
    /// Appends `_YYYYmmdd` before the key's extension.
    #[serde(default)]
    pub dated: bool,
}

impl IngestSpec {
    /// Creates an undated spec.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            dated: false,
        }
    }
}

/// Returns the default source files of the mobility pipeline.
#[must_use]
pub fn default_ingest_plan() -> Vec<IngestSpec> {
    vec![
        IngestSpec::new("bicimad-usos.csv", "data/bicimad.csv"),
        IngestSpec::new("trafico-horario.csv", "traf/trafico-horario.csv"),
        IngestSpec::new("parkings-rotacion.csv", "invent/parkings-rotacion.csv"),
        IngestSpec::new("ext_aparcamientos_info.csv", "apar/ext_aparcamientos_info.csv"),
        IngestSpec::new("avisamadrid.json", "avisos/avisamadrid.json"),
        IngestSpec::new("dump-bbdd-municipal.sql", "db/avisos.sql"),
    ]
}

/// Inserts a date stamp before the extension of a key.
///
/// `traf/trafico.csv` becomes `traf/trafico_20240315.csv`; keys without an
/// extension get the stamp appended.
#[must_use]
pub fn dated_key(key: &str, stamp: &str) -> String {
    let (dir, file) = key.rsplit_once('/').map_or(("", key), |(dir, file)| (dir, file));
    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{stamp}.{ext}"),
        _ => format!("{file}_{stamp}"),
    };
    if dir.is_empty() { file } else { format!("{dir}/{file}") }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Raw ingestion errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The local file could not be read.
    #[error("cannot read `{path}`: {message}")]
    Io {
        /// Local path.
        path: String,
        /// OS error text.
        message: String,
    },
    /// The upload failed.
    #[error(transparent)]
    Store(#[from] BlobStoreError),
}

impl IngestError {
    /// Returns the error category label used in audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io {
                ..
            } => "io",
            Self::Store(_) => "store",
        }
    }
}

// ============================================================================
// SECTION: Ingestor
// ============================================================================

/// Uploads local files into the raw zone.
pub struct RawIngestor {
    /// Dataset storage.
    store: Arc<dyn BlobStore>,
    /// Raw bucket.
    bucket: String,
    /// Time source for dated keys.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn PipelineAuditSink>,
}

impl RawIngestor {
    /// Creates an ingestor writing to `bucket`.
    #[must_use]
    pub fn new(
        store: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn PipelineAuditSink>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            clock,
            audit,
        }
    }

    /// Uploads every planned file; failures are isolated per file.
    #[must_use]
    pub fn ingest_all(
        &self,
        base_dir: &Path,
        specs: &[IngestSpec],
    ) -> Vec<(IngestSpec, Result<DatasetRecord, IngestError>)> {
        specs.iter().map(|spec| (spec.clone(), self.ingest(base_dir, spec))).collect()
    }

    /// Uploads one file and audits the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the file cannot be read or uploaded.
    pub fn ingest(&self, base_dir: &Path, spec: &IngestSpec) -> Result<DatasetRecord, IngestError> {
        let path =
            if spec.path.is_absolute() { spec.path.clone() } else { base_dir.join(&spec.path) };
        let key = if spec.dated {
            dated_key(&spec.key, &date_stamp(self.clock.now()))
        } else {
            spec.key.clone()
        };
        let target = ObjectRef::new(self.bucket.clone(), key);
        let result = self.upload(&path, &target);
        self.audit.record(&PipelineAuditEvent::new(PipelineAuditEventParams {
            operation: OperationKind::Ingestion,
            stage: spec.key.clone(),
            source: path.display().to_string(),
            target: target.to_string(),
            rows_affected: result.as_ref().ok().map(|record| record.row_count),
            failure: result.as_ref().err().map(|err| (err.kind(), err.to_string())),
        }));
        result
    }

    /// Reads, uploads and describes one file.
    fn upload(&self, path: &Path, target: &ObjectRef) -> Result<DatasetRecord, IngestError> {
        validate_object_key(&target.object)?;
        let bytes = fs::read(path).map_err(|err| IngestError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let format = DatasetFormat::from_key(&target.object).unwrap_or(DatasetFormat::SqlDump);
        let row_count = match format {
            DatasetFormat::Csv => decode_csv(&bytes).map(|table| table.row_count()).unwrap_or(0),
            DatasetFormat::Json => {
                decode_json_records(&bytes).map(|table| table.row_count()).unwrap_or(0)
            }
            DatasetFormat::Parquet => {
                decode_parquet(&bytes).map(|table| table.row_count()).unwrap_or(0)
            }
            DatasetFormat::SqlDump => 0,
        };
        self.store.put(&target.bucket, &target.object, &bytes)?;
        Ok(DatasetRecord {
            zone: Zone::Raw,
            object: target.clone(),
            row_count,
            format,
            digest: ContentDigest::of_bytes(&bytes),
        })
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
    fn dated_key_inserts_stamp_before_extension() {
        assert_eq!(dated_key("traf/trafico.csv", "20240315"), "traf/trafico_20240315.csv");
        assert_eq!(dated_key("db/dump", "20240315"), "db/dump_20240315");
        assert_eq!(dated_key("file.json", "20240315"), "file_20240315.json");
        assert_eq!(dated_key("a.b/.hidden", "20240315"), "a.b/.hidden_20240315");
    }
}
