// crates/mobility-lake-core/src/runtime/audit.rs
// ============================================================================
// Module: Pipeline Audit Logging
// Description: Structured audit events for every pipeline operation.
// Purpose: Log stage outcomes as JSON lines with enough context to diagnose failures.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every ingestion, process, access, govern and sink operation emits one
//! [`PipelineAuditEvent`], on success and on failure. Sinks decide where the
//! JSON lines go; library code never prints.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Pipeline pass that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Raw file upload.
    Ingestion,
    /// Raw to process stage.
    Process,
    /// Process to access view.
    Access,
    /// Governance publication or report.
    Govern,
    /// Relational sink load.
    Sink,
}

/// Outcome of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Completed.
    Success,
    /// Aborted.
    Error,
}

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Pipeline pass.
    pub operation: OperationKind,
    /// Stage or view name.
    pub stage: String,
    /// Source location, e.g. `raw-ingestion-zone/data/bicimad.csv`.
    pub source: String,
    /// Target location.
    pub target: String,
    /// Rows read or written, when known.
    pub rows_affected: Option<usize>,
    /// Outcome.
    pub status: OperationStatus,
    /// Error category label on failure.
    pub error_kind: Option<&'static str>,
    /// Error detail on failure.
    pub error: Option<String>,
}

/// Inputs required to construct an audit event.
pub struct PipelineAuditEventParams {
    /// Pipeline pass.
    pub operation: OperationKind,
    /// Stage or view name.
    pub stage: String,
    /// Source location.
    pub source: String,
    /// Target location.
    pub target: String,
    /// Rows read or written, when known.
    pub rows_affected: Option<usize>,
    /// Error category and detail on failure.
    pub failure: Option<(&'static str, String)>,
}

impl PipelineAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: PipelineAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let (status, error_kind, error) = match params.failure {
            None => (OperationStatus::Success, None, None),
            Some((kind, detail)) => (OperationStatus::Error, Some(kind), Some(detail)),
        };
        Self {
            event: "data_operation",
            timestamp_ms,
            operation: params.operation,
            stage: params.stage,
            source: params.source,
            target: params.target,
            rows_affected: params.rows_affected,
            status,
            error_kind,
            error,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for pipeline events.
pub trait PipelineAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &PipelineAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl PipelineAuditSink for StderrAuditSink {
    fn record(&self, event: &PipelineAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl PipelineAuditSink for FileAuditSink {
    fn record(&self, event: &PipelineAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that drops all events.
pub struct NoopAuditSink;

impl PipelineAuditSink for NoopAuditSink {
    fn record(&self, _event: &PipelineAuditEvent) {}
}

/// Audit sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<PipelineAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl PipelineAuditSink for MemoryAuditSink {
    fn record(&self, event: &PipelineAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
