// crates/mobility-lake-core/src/runtime/mod.rs
// ============================================================================
// Module: Mobility Lake Runtime
// Description: Pipeline components that move data between zones.
// Purpose: Implement ingestion, stages, access views and governance.
// Dependencies: crate::core, crate::interfaces, crate::codec
// ============================================================================

//! ## Overview
//! Runtime components are synchronous and share one
//! [`governance::GovernanceStore`] per pipeline context. Each component
//! audits its own outcomes through a [`audit::PipelineAuditSink`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod access;
pub mod aggregate;
pub mod audit;
pub mod catalog;
pub mod governance;
pub mod ingest;
pub mod lineage;
pub mod normalizer;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod runner;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AccessBuilder;
pub use access::AccessError;
pub use access::AccessInputs;
pub use access::AccessReport;
pub use access::AccessView;
pub use access::SinkLoad;
pub use access::read_view;
pub use aggregate::AggregateError;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::OperationKind;
pub use audit::OperationStatus;
pub use audit::PipelineAuditEvent;
pub use audit::PipelineAuditSink;
pub use audit::StderrAuditSink;
pub use catalog::CatalogListing;
pub use catalog::MetadataCatalog;
pub use governance::GovernanceError;
pub use governance::GovernanceStore;
pub use governance::RecordPage;
pub use ingest::IngestError;
pub use ingest::IngestSpec;
pub use ingest::RawIngestor;
pub use ingest::default_ingest_plan;
pub use lineage::LineageGraph;
pub use lineage::trace_edges;
pub use normalizer::Normalizer;
pub use normalizer::SchemaError;
pub use normalizer::normalize;
pub use pipeline::MobilityLake;
pub use pipeline::default_process_plan;
pub use pipeline::run_stages;
pub use quality::GateOutcome;
pub use quality::QualityGate;
pub use quality::evaluate;
pub use report::GovernReporter;
pub use report::PolicyPublication;
pub use report::QualityReport;
pub use report::ReportError;
pub use report::parse_policy;
pub use runner::SourceSelector;
pub use runner::StageError;
pub use runner::StageReport;
pub use runner::StageRunner;
pub use runner::StageSpec;
pub use store::InMemoryBlobStore;
