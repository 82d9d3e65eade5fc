// crates/mobility-lake-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Mobility Lake Pipeline
// Description: Component wiring and the default raw to process plan.
// Purpose: Build every pipeline component over one shared governance store.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`MobilityLake`] is the explicit context object of a pipeline run: it owns
//! the blob store, zone buckets, clock, audit sink and the single
//! [`GovernanceStore`] every component shares. Components are created from it
//! on demand; there is no process-wide client.
//!
//! [`run_stages`] executes a stage plan with per-stage failure isolation,
//! optionally on scoped threads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;

use crate::codec::SourceFormat;
use crate::core::dataset::DatasetKind;
use crate::core::identifiers::DatasetName;
use crate::core::identifiers::StageName;
use crate::core::quality::QualityMode;
use crate::core::quality::QualityRules;
use crate::core::time::Clock;
use crate::core::zone::ObjectRef;
use crate::core::zone::ZoneBuckets;
use crate::interfaces::BlobStore;
use crate::interfaces::BlobStoreError;
use crate::runtime::access::AccessBuilder;
use crate::runtime::access::AccessInputs;
use crate::runtime::audit::PipelineAuditSink;
use crate::runtime::catalog::MetadataCatalog;
use crate::runtime::governance::GovernanceStore;
use crate::runtime::ingest::RawIngestor;
use crate::runtime::lineage::LineageGraph;
use crate::runtime::report::GovernReporter;
use crate::runtime::runner::SourceSelector;
use crate::runtime::runner::StageError;
use crate::runtime::runner::StageReport;
use crate::runtime::runner::StageRunner;
use crate::runtime::runner::StageSpec;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Shared context for every pipeline component.
pub struct MobilityLake {
    /// Dataset storage.
    store: Arc<dyn BlobStore>,
    /// Zone bucket names.
    buckets: ZoneBuckets,
    /// Governance records shared by all components.
    governance: Arc<GovernanceStore>,
    /// Audit sink.
    audit: Arc<dyn PipelineAuditSink>,
    /// Quality gate policy.
    mode: QualityMode,
}

impl MobilityLake {
    /// Creates a context; governance records go to the metadata bucket.
    #[must_use]
    pub fn new(
        store: Arc<dyn BlobStore>,
        buckets: ZoneBuckets,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn PipelineAuditSink>,
        mode: QualityMode,
    ) -> Self {
        let governance = Arc::new(GovernanceStore::new(
            Arc::clone(&store),
            buckets.govern_metadata.clone(),
            clock,
        ));
        Self {
            store,
            buckets,
            governance,
            audit,
            mode,
        }
    }

    /// Creates every zone bucket that does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when a bucket cannot be created.
    pub fn ensure_buckets(&self) -> Result<(), BlobStoreError> {
        for bucket in self.buckets.all() {
            self.store.ensure_bucket(bucket)?;
        }
        Ok(())
    }

    /// Returns the blob store.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Returns the zone bucket names.
    #[must_use]
    pub const fn buckets(&self) -> &ZoneBuckets {
        &self.buckets
    }

    /// Returns the shared governance store.
    #[must_use]
    pub const fn governance(&self) -> &Arc<GovernanceStore> {
        &self.governance
    }

    /// Returns the quality gate policy.
    #[must_use]
    pub const fn mode(&self) -> QualityMode {
        self.mode
    }

    /// Creates a raw ingestor.
    #[must_use]
    pub fn ingestor(&self) -> RawIngestor {
        RawIngestor::new(
            Arc::clone(&self.store),
            self.buckets.raw.clone(),
            Arc::clone(self.governance.clock()),
            Arc::clone(&self.audit),
        )
    }

    /// Creates a stage runner.
    #[must_use]
    pub fn runner(&self) -> StageRunner {
        StageRunner::new(
            Arc::clone(&self.store),
            Arc::clone(&self.governance),
            self.mode,
            Arc::clone(&self.audit),
            self.buckets.clone(),
        )
    }

    /// Creates an access-zone builder.
    #[must_use]
    pub fn access_builder(&self, inputs: AccessInputs) -> AccessBuilder {
        AccessBuilder::new(
            Arc::clone(&self.store),
            Arc::clone(&self.governance),
            Arc::clone(&self.audit),
            self.buckets.clone(),
            inputs,
        )
    }

    /// Creates a govern reporter.
    #[must_use]
    pub fn reporter(&self) -> GovernReporter {
        GovernReporter::new(
            Arc::clone(&self.governance),
            self.buckets.clone(),
            Arc::clone(&self.audit),
        )
    }

    /// Creates a lineage graph view.
    #[must_use]
    pub fn lineage(&self) -> LineageGraph {
        LineageGraph::new(Arc::clone(&self.governance))
    }

    /// Creates a metadata catalog view.
    #[must_use]
    pub fn catalog(&self) -> MetadataCatalog {
        MetadataCatalog::new(Arc::clone(&self.governance))
    }
}

// ============================================================================
// SECTION: Stage Execution
// ============================================================================

/// Runs every stage; one failing stage never prevents the others.
///
/// Results are returned in plan order. With `parallel` set each stage runs on
/// its own scoped thread.
#[must_use]
pub fn run_stages(
    runner: &StageRunner,
    specs: &[StageSpec],
    parallel: bool,
) -> Vec<(StageName, Result<StageReport, StageError>)> {
    if !parallel {
        return specs.iter().map(|spec| (spec.name.clone(), runner.run_stage(spec))).collect();
    }
    thread::scope(|scope| {
        let handles: Vec<_> = specs
            .iter()
            .map(|spec| (spec.name.clone(), scope.spawn(move || runner.run_stage(spec))))
            .collect();
        handles
            .into_iter()
            .map(|(name, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(StageError::Aborted(format!("stage `{name}` thread panicked")))
                });
                (name, result)
            })
            .collect()
    })
}

// ============================================================================
// SECTION: Default Plan
// ============================================================================

/// Returns the default raw to process stages of the mobility pipeline.
#[must_use]
pub fn default_process_plan(buckets: &ZoneBuckets) -> Vec<StageSpec> {
    let stage = |name: &str,
                 dataset: &str,
                 kind: DatasetKind,
                 source: &str,
                 source_format: SourceFormat,
                 target: &str,
                 rules: QualityRules,
                 transformation: &str| StageSpec {
        name: StageName::new(name),
        dataset: DatasetName::new(dataset),
        kind,
        source_bucket: buckets.raw.clone(),
        source: SourceSelector::Exact(source.to_string()),
        source_format,
        target: ObjectRef::new(buckets.process.clone(), target),
        rules,
        transformation: transformation.to_string(),
    };
    vec![
        stage(
            "bicimad",
            "bicimad_process",
            DatasetKind::BikeShareUsage,
            "data/bicimad.csv",
            SourceFormat::Csv,
            "data/bicimad.parquet",
            rules(&["id", "user_id", "start_time"], &["id"]),
            "Bike-share usage standardization and temporal enrichment",
        ),
        stage(
            "aparcamientos",
            "aparcamientos_process",
            DatasetKind::ParkingInfo,
            "apar/ext_aparcamientos_info.csv",
            SourceFormat::Csv,
            "apar/aparcamientos.parquet",
            rules(&["parking_id", "name"], &["parking_id"]),
            "Parking facility information standardization",
        ),
        stage(
            "parkings",
            "parkings_process",
            DatasetKind::ParkingRotation,
            "invent/parkings-rotacion.csv",
            SourceFormat::Csv,
            "invent/parkings.parquet",
            rules(&["parking_id", "timestamp"], &[]),
            "Parking rotation standardization and temporal enrichment",
        ),
        stage(
            "trafico",
            "trafico_process",
            DatasetKind::TrafficHourly,
            "traf/trafico-horario.csv",
            SourceFormat::Csv,
            "traf/trafico.parquet",
            rules(&["sensor_id", "timestamp"], &[]),
            "Hourly traffic standardization and temporal enrichment",
        ),
        stage(
            "avisa",
            "avisa_process",
            DatasetKind::CitizenReports,
            "avisos/avisamadrid.json",
            SourceFormat::Json,
            "avisa/avisos.parquet",
            rules(&["id", "fecha_reporte"], &["id"]),
            "Citizen report standardization and temporal enrichment",
        ),
    ]
}

/// Builds a rule set from `no_nulls` and `unique` columns.
fn rules(no_nulls: &[&str], unique: &[&str]) -> QualityRules {
    QualityRules {
        no_nulls: no_nulls.iter().map(|column| (*column).to_string()).collect(),
        unique: unique.iter().map(|column| (*column).to_string()).collect(),
        ..QualityRules::default()
    }
}
