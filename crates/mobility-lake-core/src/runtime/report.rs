// crates/mobility-lake-core/src/runtime/report.rs
// ============================================================================
// Module: Govern Reporting
// Description: Quality, lineage and coverage reports plus policy publication.
// Purpose: Turn stored governance records into audit views.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde_yaml
// ============================================================================

//! ## Overview
//! [`GovernReporter`] reads the governance records written by stages and
//! builders and answers the operator questions of the govern zone:
//!
//! - which quality checks ran and how often they passed
//! - where every cataloged access dataset came from
//! - which process or access objects have no recorded provenance
//!
//! It also publishes the declarative security policy as YAML.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::hashing::ContentDigest;
use crate::core::hashing::DigestError;
use crate::core::identifiers::DatasetName;
use crate::core::lineage::LineageTrace;
use crate::core::policy::SECURITY_POLICY_KEY;
use crate::core::policy::SecurityPolicy;
use crate::core::quality::CheckKind;
use crate::core::zone::ObjectRef;
use crate::core::zone::ZoneBuckets;
use crate::interfaces::BlobStoreError;
use crate::runtime::audit::OperationKind;
use crate::runtime::audit::PipelineAuditEvent;
use crate::runtime::audit::PipelineAuditEventParams;
use crate::runtime::audit::PipelineAuditSink;
use crate::runtime::catalog::MetadataCatalog;
use crate::runtime::governance::GovernanceError;
use crate::runtime::governance::GovernanceStore;
use crate::runtime::lineage::LineageGraph;
use crate::runtime::lineage::trace_edges;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Govern reporting errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Governance records could not be read.
    #[error(transparent)]
    Governance(#[from] GovernanceError),
    /// The blob store failed.
    #[error(transparent)]
    Store(#[from] BlobStoreError),
    /// The policy could not be serialized or hashed.
    #[error("policy encode error: {0}")]
    Encode(String),
}

impl From<DigestError> for ReportError {
    fn from(err: DigestError) -> Self {
        Self::Encode(err.to_string())
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// One stored quality check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReportRow {
    /// Dataset name.
    pub dataset: DatasetName,
    /// Evaluation time.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Check kind.
    pub check: CheckKind,
    /// Checked column or column set.
    pub column: String,
    /// Outcome.
    pub passed: bool,
    /// Count detail.
    pub details: String,
}

/// Pass statistics for one dataset and check kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummaryRow {
    /// Dataset name.
    pub dataset: DatasetName,
    /// Check kind.
    pub check: CheckKind,
    /// Passing evaluations.
    pub passed_count: usize,
    /// All evaluations.
    pub total_count: usize,
    /// Percentage of passing evaluations.
    pub pass_rate: f64,
}

/// Quality checks across every stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// Every check in record key order.
    pub rows: Vec<QualityReportRow>,
    /// Pass rates per dataset and check kind.
    pub summary: Vec<QualitySummaryRow>,
    /// Keys of records that could not be parsed.
    pub unreadable: Vec<String>,
}

impl QualityReport {
    /// Returns the failed checks.
    pub fn failed(&self) -> impl Iterator<Item = &QualityReportRow> {
        self.rows.iter().filter(|row| !row.passed)
    }
}

/// Lineage of one cataloged dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetLineage {
    /// Catalog name.
    pub dataset: DatasetName,
    /// Backward trace from the dataset's location.
    pub trace: LineageTrace,
}

/// Result of publishing the security policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyPublication {
    /// Written object.
    pub object: ObjectRef,
    /// Canonical JSON digest of the policy content.
    pub digest: ContentDigest,
}

// ============================================================================
// SECTION: Reporter
// ============================================================================

/// Builds govern-zone reports.
pub struct GovernReporter {
    /// Governance record storage.
    governance: Arc<GovernanceStore>,
    /// Lineage edge log.
    lineage: LineageGraph,
    /// Metadata catalog.
    catalog: MetadataCatalog,
    /// Zone bucket names.
    buckets: ZoneBuckets,
    /// Audit sink.
    audit: Arc<dyn PipelineAuditSink>,
}

impl GovernReporter {
    /// Creates a reporter sharing `governance` with other components.
    #[must_use]
    pub fn new(
        governance: Arc<GovernanceStore>,
        buckets: ZoneBuckets,
        audit: Arc<dyn PipelineAuditSink>,
    ) -> Self {
        Self {
            lineage: LineageGraph::new(Arc::clone(&governance)),
            catalog: MetadataCatalog::new(Arc::clone(&governance)),
            governance,
            buckets,
            audit,
        }
    }

    /// Flattens every stored quality record and summarizes pass rates.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the records cannot be listed.
    pub fn quality_report(&self) -> Result<QualityReport, ReportError> {
        let page = self.governance.list_quality()?;
        let mut rows = Vec::new();
        let mut tally: BTreeMap<(DatasetName, CheckKind), (usize, usize)> = BTreeMap::new();
        for (_, record) in page.records {
            for check in record.checks {
                let entry = tally.entry((record.dataset.clone(), check.check)).or_insert((0, 0));
                entry.1 += 1;
                if check.passed {
                    entry.0 += 1;
                }
                rows.push(QualityReportRow {
                    dataset: record.dataset.clone(),
                    timestamp: record.timestamp,
                    check: check.check,
                    column: check.column,
                    passed: check.passed,
                    details: check.details,
                });
            }
        }
        let summary = tally
            .into_iter()
            .map(|((dataset, check), (passed_count, total_count))| QualitySummaryRow {
                dataset,
                check,
                passed_count,
                total_count,
                pass_rate: pass_rate(passed_count, total_count),
            })
            .collect();
        Ok(QualityReport {
            rows,
            summary,
            unreadable: page.unreadable,
        })
    }

    /// Traces every cataloged access-zone dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the catalog or lineage cannot be read.
    pub fn lineage_report(&self) -> Result<Vec<DatasetLineage>, ReportError> {
        let listing = self.catalog.list_all()?;
        let edges = self.lineage.edges()?;
        let Some(objects) = listing.datasets.get(&self.buckets.access) else {
            return Ok(Vec::new());
        };
        Ok(objects
            .iter()
            .map(|(object, record)| DatasetLineage {
                dataset: record.dataset_name.clone(),
                trace: trace_edges(
                    edges.clone(),
                    &ObjectRef::new(self.buckets.access.clone(), object),
                ),
            })
            .collect())
    }

    /// Lists process and access objects without an inbound lineage edge.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when a bucket or the lineage cannot be listed.
    pub fn untraced(&self) -> Result<Vec<ObjectRef>, ReportError> {
        let targets: BTreeSet<ObjectRef> =
            self.lineage.edges()?.into_iter().map(|edge| edge.target).collect();
        let store = self.governance.blob_store();
        let mut untraced = Vec::new();
        for bucket in [&self.buckets.process, &self.buckets.access] {
            if !store.bucket_exists(bucket)? {
                continue;
            }
            for info in store.list(bucket, "")? {
                let object = ObjectRef::new(bucket.clone(), info.key);
                if !targets.contains(&object) {
                    untraced.push(object);
                }
            }
        }
        Ok(untraced)
    }

    /// Writes the security policy as YAML to the security bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when serialization or the write fails.
    pub fn publish_policy(
        &self,
        policy: &SecurityPolicy,
    ) -> Result<PolicyPublication, ReportError> {
        let object = ObjectRef::new(self.buckets.govern_security.clone(), SECURITY_POLICY_KEY);
        let result = self.write_policy(policy, &object);
        self.audit.record(&PipelineAuditEvent::new(PipelineAuditEventParams {
            operation: OperationKind::Govern,
            stage: "security_policy".to_string(),
            source: "configuration".to_string(),
            target: object.to_string(),
            rows_affected: result.as_ref().ok().map(|_| policy.zones.len()),
            failure: result.as_ref().err().map(|err| ("govern", err.to_string())),
        }));
        result
    }

    /// Serializes, hashes and stores the policy.
    fn write_policy(
        &self,
        policy: &SecurityPolicy,
        object: &ObjectRef,
    ) -> Result<PolicyPublication, ReportError> {
        let yaml =
            serde_yaml::to_string(policy).map_err(|err| ReportError::Encode(err.to_string()))?;
        let digest = ContentDigest::of_record(policy)?;
        self.governance.blob_store().put(&object.bucket, &object.object, yaml.as_bytes())?;
        Ok(PolicyPublication {
            object: object.clone(),
            digest,
        })
    }
}

/// Percentage of passing evaluations.
#[allow(clippy::cast_precision_loss, reason = "Check counts are far below 2^52.")]
fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { passed as f64 * 100.0 / total as f64 }
}

/// Parses a published YAML policy.
///
/// # Errors
///
/// Returns [`ReportError::Encode`] when the document is not a valid policy.
pub fn parse_policy(bytes: &[u8]) -> Result<SecurityPolicy, ReportError> {
    serde_yaml::from_slice(bytes).map_err(|err| ReportError::Encode(err.to_string()))
}
