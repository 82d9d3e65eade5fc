// crates/mobility-lake-cli/src/wiring.rs
// ============================================================================
// Module: Lake Runtime Wiring
// Description: Build storage, audit and sink backends from configuration.
// Purpose: Create the explicit pipeline context once per CLI invocation.
// Dependencies: mobility-lake-config, mobility-lake-core, mobility-lake-store
// ============================================================================

//! ## Overview
//! [`LakeRuntime::open`] resolves every backend named by the configuration
//! and hands them to a single [`MobilityLake`]. Nothing is process-global:
//! each invocation owns its context and drops it on exit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::sync::Arc;

use mobility_lake_config::AuditConfig;
use mobility_lake_config::AuditSinkKind;
use mobility_lake_config::ConfigError;
use mobility_lake_config::LakeConfig;
use mobility_lake_config::StorageConfig;
use mobility_lake_config::load_security_policy;
use mobility_lake_core::BlobStore;
use mobility_lake_core::BlobStoreError;
use mobility_lake_core::MobilityLake;
use mobility_lake_core::PipelineAuditSink;
use mobility_lake_core::RelationalSink;
use mobility_lake_core::SecurityPolicy;
use mobility_lake_core::SystemClock;
use mobility_lake_core::runtime::AccessBuilder;
use mobility_lake_core::runtime::FileAuditSink;
use mobility_lake_core::runtime::NoopAuditSink;
use mobility_lake_core::runtime::StderrAuditSink;
use mobility_lake_store::FsBlobStore;
use mobility_lake_store_sqlite::SqliteSink;
use mobility_lake_store_sqlite::SqliteSinkError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while wiring the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringError {
    /// Configuration could not be loaded or resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The blob store could not be opened.
    #[error("blob store unavailable: {0}")]
    Store(#[from] BlobStoreError),
    /// The audit log could not be opened.
    #[error("audit log unavailable: {0}")]
    Audit(String),
    /// The relational sink could not be opened.
    #[error("relational sink unavailable: {0}")]
    Sink(#[from] SqliteSinkError),
    /// The configured backend is not compiled in.
    #[error("storage backend `{0}` requires the `{0}` feature")]
    Unsupported(&'static str),
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Everything one CLI invocation needs.
pub struct LakeRuntime {
    /// Validated configuration.
    config: LakeConfig,
    /// Pipeline context.
    lake: MobilityLake,
    /// Relational sink, when configured.
    sink: Option<Arc<dyn RelationalSink>>,
}

impl LakeRuntime {
    /// Opens every configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError`] when a backend cannot be opened.
    pub fn open(config: LakeConfig) -> Result<Self, WiringError> {
        let store = open_blob_store(&config.storage)?;
        let audit = open_audit_sink(&config.audit)?;
        let sink = match config.sink.sqlite() {
            Some(settings) => {
                Some(Arc::new(SqliteSink::open(&settings)?) as Arc<dyn RelationalSink>)
            }
            None => None,
        };
        let lake = MobilityLake::new(
            store,
            config.buckets.clone(),
            Arc::new(SystemClock),
            audit,
            config.quality.mode,
        );
        Ok(Self {
            config,
            lake,
            sink,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LakeConfig {
        &self.config
    }

    /// Returns the pipeline context.
    #[must_use]
    pub const fn lake(&self) -> &MobilityLake {
        &self.lake
    }

    /// Returns the relational sink, when configured.
    #[must_use]
    pub fn sink(&self) -> Option<&Arc<dyn RelationalSink>> {
        self.sink.as_ref()
    }

    /// Creates an access builder wired to the configured sink.
    #[must_use]
    pub fn access_builder(&self) -> AccessBuilder {
        let builder = self.lake.access_builder(self.config.access.clone());
        match &self.sink {
            Some(sink) => builder.with_sink(Arc::clone(sink)),
            None => builder,
        }
    }

    /// Returns the configured security policy.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::Config`] when the policy file is unusable.
    pub fn security_policy(&self) -> Result<SecurityPolicy, WiringError> {
        Ok(load_security_policy(&self.config)?)
    }
}

// ============================================================================
// SECTION: Backends
// ============================================================================

/// Opens the configured blob store.
///
/// # Errors
///
/// Returns [`WiringError`] when the store cannot be opened or its backend is
/// not compiled in.
pub fn open_blob_store(storage: &StorageConfig) -> Result<Arc<dyn BlobStore>, WiringError> {
    match storage {
        StorageConfig::Filesystem {
            root,
        } => Ok(Arc::new(FsBlobStore::open(root)?)),
        StorageConfig::S3 {
            endpoint,
            region,
            force_path_style,
            ..
        } => open_s3(endpoint.clone(), region.clone(), *force_path_style),
    }
}

/// Connects to S3-compatible storage.
#[cfg(feature = "s3")]
fn open_s3(
    endpoint: Option<String>,
    region: Option<String>,
    force_path_style: bool,
) -> Result<Arc<dyn BlobStore>, WiringError> {
    let options = mobility_lake_store::S3StoreOptions {
        endpoint,
        region,
        force_path_style,
    };
    Ok(Arc::new(mobility_lake_store::S3BlobStore::connect(&options)?))
}

/// Reports that S3 support is not compiled in.
#[cfg(not(feature = "s3"))]
fn open_s3(
    _endpoint: Option<String>,
    _region: Option<String>,
    _force_path_style: bool,
) -> Result<Arc<dyn BlobStore>, WiringError> {
    Err(WiringError::Unsupported("s3"))
}

/// Opens the configured audit sink.
///
/// # Errors
///
/// Returns [`WiringError::Audit`] when the log file cannot be opened.
pub fn open_audit_sink(audit: &AuditConfig) -> Result<Arc<dyn PipelineAuditSink>, WiringError> {
    match (audit.sink, &audit.path) {
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (AuditSinkKind::File, Some(path)) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .map_err(|err| WiringError::Audit(format!("{}: {err}", parent.display())))?;
            }
            let sink = FileAuditSink::new(path)
                .map_err(|err| WiringError::Audit(format!("{}: {err}", path.display())))?;
            Ok(Arc::new(sink))
        }
        (AuditSinkKind::File, None) => {
            Err(WiringError::Audit("file audit sink requires path".to_string()))
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use std::path::PathBuf;

    use mobility_lake_config::SinkType;

    use super::*;

    fn local_config(root: &std::path::Path) -> LakeConfig {
        let mut config = LakeConfig::default();
        config.storage = StorageConfig::Filesystem {
            root: root.join("lake"),
        };
        config.audit.sink = AuditSinkKind::None;
        config
    }

    #[test]
    fn filesystem_runtime_creates_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = LakeRuntime::open(local_config(dir.path())).unwrap();
        runtime.lake().ensure_buckets().unwrap();
        for bucket in runtime.config().buckets.all() {
            assert!(dir.path().join("lake").join(bucket).is_dir(), "{bucket}");
        }
        assert!(runtime.sink().is_none());
    }

    #[test]
    fn sqlite_sink_is_opened_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(dir.path());
        config.sink.sink_type = SinkType::Sqlite;
        config.sink.path = Some(dir.path().join("out/mobility.db"));
        let runtime = LakeRuntime::open(config).unwrap();
        assert!(runtime.sink().is_some());
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn file_audit_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let audit = AuditConfig {
            sink: AuditSinkKind::File,
            path: Some(dir.path().join("logs/audit.jsonl")),
        };
        open_audit_sink(&audit).unwrap();
        assert!(dir.path().join("logs/audit.jsonl").exists());
    }

    #[cfg(not(feature = "s3"))]
    #[test]
    fn s3_without_feature_is_unsupported() {
        let storage = StorageConfig::S3 {
            endpoint: None,
            region: None,
            force_path_style: false,
            allow_http: false,
        };
        assert!(matches!(open_blob_store(&storage), Err(WiringError::Unsupported("s3"))));
    }

    #[test]
    fn default_policy_covers_three_zones() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(dir.path());
        config.security_policy = None::<PathBuf>;
        let runtime = LakeRuntime::open(config).unwrap();
        assert_eq!(runtime.security_policy().unwrap().zones.len(), 3);
    }
}
