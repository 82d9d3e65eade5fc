// crates/mobility-lake-core/src/runtime/runner.rs
// ============================================================================
// Module: Transformation Stage Runner
// Description: Fetch, normalize, gate, persist and record one dataset.
// Purpose: Move a raw dataset into the process zone with full provenance.
// Dependencies: crate::codec, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! A stage follows a fixed protocol:
//!
//! 1. resolve the source key (exact, or latest under a prefix)
//! 2. fetch and decode the source blob
//! 3. normalize with the rules of the dataset kind
//! 4. evaluate quality and persist the check record
//! 5. abort when the gate rejects the table
//! 6. encode Parquet and persist the target blob
//! 7. append the lineage edge
//!
//! The target is written before its edge, and nothing is written when an
//! earlier step fails. Every outcome emits one audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::codec::CodecError;
use crate::codec::SourceFormat;
use crate::codec::decode;
use crate::codec::encode_parquet;
use crate::core::dataset::DatasetFormat;
use crate::core::dataset::DatasetKind;
use crate::core::dataset::DatasetRecord;
use crate::core::hashing::ContentDigest;
use crate::core::identifiers::DatasetName;
use crate::core::identifiers::StageName;
use crate::core::lineage::LineageEdge;
use crate::core::quality::QualityCheckRecord;
use crate::core::quality::QualityMode;
use crate::core::quality::QualityRules;
use crate::core::zone::ObjectRef;
use crate::core::zone::Zone;
use crate::core::zone::ZoneBuckets;
use crate::interfaces::BlobStore;
use crate::interfaces::BlobStoreError;
use crate::interfaces::ObjectInfo;
use crate::runtime::audit::OperationKind;
use crate::runtime::audit::PipelineAuditEvent;
use crate::runtime::audit::PipelineAuditEventParams;
use crate::runtime::audit::PipelineAuditSink;
use crate::runtime::governance::GovernanceError;
use crate::runtime::governance::GovernanceStore;
use crate::runtime::lineage::LineageGraph;
use crate::runtime::normalizer::Normalizer;
use crate::runtime::normalizer::SchemaError;
use crate::runtime::quality::QualityGate;

// ============================================================================
// SECTION: Stage Specs
// ============================================================================

/// How a stage picks its source object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelector {
    /// A fixed object key.
    Exact(String),
    /// The most recently modified object under a prefix.
    Latest(String),
}

impl SourceSelector {
    /// Returns the key or prefix text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(key) | Self::Latest(key) => key,
        }
    }
}

/// Declarative description of one raw to process stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSpec {
    /// Stage name used in audit events.
    pub name: StageName,
    /// Dataset name used for quality records.
    pub dataset: DatasetName,
    /// Normalization rule family.
    pub kind: DatasetKind,
    /// Bucket holding the source object.
    pub source_bucket: String,
    /// Source object selection.
    pub source: SourceSelector,
    /// Encoding of the source object.
    #[serde(default)]
    pub source_format: SourceFormat,
    /// Destination of the normalized Parquet blob.
    pub target: ObjectRef,
    /// Quality rules evaluated before persist.
    #[serde(default)]
    pub rules: QualityRules,
    /// Free-text transformation note recorded on the lineage edge.
    pub transformation: String,
}

/// Successful stage outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Stage name.
    pub stage: StageName,
    /// Resolved source object.
    pub source: ObjectRef,
    /// Rows decoded from the source.
    pub rows_in: usize,
    /// Written dataset.
    pub dataset: DatasetRecord,
    /// Quality record written by the gate.
    pub quality: QualityCheckRecord,
    /// Key of the quality record.
    pub quality_key: String,
    /// Key of the lineage edge.
    pub lineage_key: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The source object or bucket does not exist.
    #[error("source not found: {0}")]
    NotFound(String),
    /// No object matched the latest-file prefix.
    #[error("no source object under `{bucket}/{prefix}`")]
    NoCandidate {
        /// Source bucket.
        bucket: String,
        /// Listing prefix.
        prefix: String,
    },
    /// Normalization failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Decoding or encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The quality gate rejected the table.
    #[error("quality gate rejected `{dataset}`: {failed} failed checks")]
    QualityRejected {
        /// Dataset name.
        dataset: DatasetName,
        /// Number of failed checks.
        failed: usize,
    },
    /// The blob store failed.
    #[error(transparent)]
    Store(BlobStoreError),
    /// A governance record could not be written.
    #[error(transparent)]
    Governance(#[from] GovernanceError),
    /// The stage thread ended without a result.
    #[error("stage aborted: {0}")]
    Aborted(String),
}

impl StageError {
    /// Returns the error category label used in audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::NoCandidate {
                ..
            } => "not_found",
            Self::Schema(_) => "schema",
            Self::Codec(_) => "codec",
            Self::QualityRejected {
                ..
            } => "quality",
            Self::Store(_) => "store",
            Self::Governance(_) => "governance",
            Self::Aborted(_) => "aborted",
        }
    }
}

impl From<BlobStoreError> for StageError {
    fn from(err: BlobStoreError) -> Self {
        if err.is_not_found() { Self::NotFound(err.to_string()) } else { Self::Store(err) }
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs stage specs against a blob store.
pub struct StageRunner {
    /// Dataset storage.
    store: Arc<dyn BlobStore>,
    /// Governance record storage.
    governance: Arc<GovernanceStore>,
    /// Quality gate.
    gate: QualityGate,
    /// Lineage edge log.
    lineage: LineageGraph,
    /// Audit sink.
    audit: Arc<dyn PipelineAuditSink>,
    /// Zone bucket names.
    buckets: ZoneBuckets,
}

impl StageRunner {
    /// Creates a runner sharing `governance` with other components.
    #[must_use]
    pub fn new(
        store: Arc<dyn BlobStore>,
        governance: Arc<GovernanceStore>,
        mode: QualityMode,
        audit: Arc<dyn PipelineAuditSink>,
        buckets: ZoneBuckets,
    ) -> Self {
        Self {
            store,
            gate: QualityGate::new(Arc::clone(&governance), mode),
            lineage: LineageGraph::new(Arc::clone(&governance)),
            governance,
            audit,
            buckets,
        }
    }

    /// Runs one stage and audits the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] when any step fails; nothing is written to the
    /// target zone in that case.
    pub fn run_stage(&self, spec: &StageSpec) -> Result<StageReport, StageError> {
        let result = self.execute(spec);
        let (source, rows, failure) = match &result {
            Ok(report) => (report.source.to_string(), Some(report.dataset.row_count), None),
            Err(err) => (
                format!("{}/{}", spec.source_bucket, spec.source.as_str()),
                None,
                Some((err.kind(), err.to_string())),
            ),
        };
        self.audit.record(&PipelineAuditEvent::new(PipelineAuditEventParams {
            operation: OperationKind::Process,
            stage: spec.name.to_string(),
            source,
            target: spec.target.to_string(),
            rows_affected: rows,
            failure,
        }));
        result
    }

    /// Resolves the most recently modified object under a prefix.
    ///
    /// Ties on modification time go to the lexicographically greatest key.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::NoCandidate`] when nothing matches and
    /// [`StageError::NotFound`] when the bucket is missing.
    pub fn resolve_latest(&self, bucket: &str, prefix: &str) -> Result<String, StageError> {
        let candidates = self.store.list(bucket, prefix)?;
        latest_object(candidates).map(|info| info.key).ok_or_else(|| StageError::NoCandidate {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }

    /// Executes the stage protocol.
    fn execute(&self, spec: &StageSpec) -> Result<StageReport, StageError> {
        let key = match &spec.source {
            SourceSelector::Exact(key) => key.clone(),
            SourceSelector::Latest(prefix) => self.resolve_latest(&spec.source_bucket, prefix)?,
        };
        let source = ObjectRef::new(spec.source_bucket.clone(), key);
        let bytes = self.store.get(&source.bucket, &source.object)?;
        let raw = decode(spec.source_format, &bytes)?;
        let table = Normalizer::for_kind(spec.kind).apply(&raw)?;

        let outcome = self.gate.check(&spec.dataset, &table, &spec.rules)?;
        if !outcome.admitted {
            return Err(StageError::QualityRejected {
                dataset: spec.dataset.clone(),
                failed: outcome.record.failures().count(),
            });
        }

        let encoded = encode_parquet(&table)?;
        self.store.put(&spec.target.bucket, &spec.target.object, &encoded)?;
        let edge = LineageEdge::single(
            source.clone(),
            spec.target.clone(),
            spec.transformation.clone(),
            self.governance.clock().now(),
        );
        let lineage_key = self.lineage.append_edge(&edge)?;

        Ok(StageReport {
            stage: spec.name.clone(),
            source,
            rows_in: raw.row_count(),
            dataset: DatasetRecord {
                zone: self.buckets.zone_of(&spec.target.bucket).unwrap_or(Zone::Process),
                object: spec.target.clone(),
                row_count: table.row_count(),
                format: DatasetFormat::Parquet,
                digest: ContentDigest::of_bytes(&encoded),
            },
            quality: outcome.record,
            quality_key: outcome.key,
            lineage_key,
        })
    }
}

/// Picks the newest object; ties go to the greatest key.
#[must_use]
pub fn latest_object(candidates: Vec<ObjectInfo>) -> Option<ObjectInfo> {
    candidates.into_iter().filter(|info| !info.key.ends_with('/')).max_by(|left, right| {
        left.last_modified.cmp(&right.last_modified).then_with(|| left.key.cmp(&right.key))
    })
}
