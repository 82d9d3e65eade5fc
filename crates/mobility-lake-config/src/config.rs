// crates/mobility-lake-config/src/config.rs
// ============================================================================
// Module: Mobility Lake Configuration
// Description: Configuration loading and validation for a lake deployment.
// Purpose: Reject bad storage, bucket, sink and stage settings before any I/O.
// Dependencies: mobility-lake-core, mobility-lake-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `mobility-lake.toml` is read under a size cap and checked for path limits.
//! Every section has defaults, so an empty file describes a local filesystem
//! lake with the standard zone buckets, advisory quality checks and stderr
//! audit logging. Invalid values fail the load.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use mobility_lake_core::BlobStoreError;
use mobility_lake_core::QualityMode;
use mobility_lake_core::StageSpec;
use mobility_lake_core::ZoneBuckets;
use mobility_lake_core::interfaces::validate_bucket_name;
use mobility_lake_core::interfaces::validate_object_key;
use mobility_lake_core::runtime::AccessInputs;
use mobility_lake_core::runtime::IngestSpec;
use mobility_lake_core::runtime::SourceSelector;
use mobility_lake_core::runtime::default_ingest_plan;
use mobility_lake_core::runtime::default_process_plan;
use mobility_lake_store_sqlite::SqliteJournalMode;
use mobility_lake_store_sqlite::SqliteSinkConfig;
use mobility_lake_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "mobility-lake.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MOBILITY_LAKE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default root directory of the filesystem store.
const DEFAULT_STORAGE_ROOT: &str = "lake-data";
/// Default directory holding the source files to ingest.
const DEFAULT_INGEST_DIR: &str = "data";
/// Default busy timeout for the `SQLite` sink (ms).
const DEFAULT_SINK_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root configuration of a mobility lake deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LakeConfig {
    /// Blob store backend.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Zone bucket names.
    #[serde(default)]
    pub buckets: ZoneBuckets,
    /// Quality gate policy.
    #[serde(default)]
    pub quality: QualityConfig,
    /// Audit event destination.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Relational sink for access views.
    #[serde(default)]
    pub sink: SinkConfig,
    /// Pipeline execution settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Process-zone inputs of the access builders.
    #[serde(default)]
    pub access: AccessInputs,
    /// Stage plan override; empty means the default plan.
    #[serde(default)]
    pub stages: Vec<StageSpec>,
    /// Ingestion plan override; empty means the default plan.
    #[serde(default)]
    pub ingest: Vec<IngestSpec>,
    /// Optional YAML security policy; the default policy is used otherwise.
    #[serde(default)]
    pub security_policy: Option<PathBuf>,
}

impl LakeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then [`CONFIG_ENV_VAR`], then
    /// `mobility-lake.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        Self::from_bytes(&bytes)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is oversized, malformed or
    /// invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        validate_buckets(&self.buckets)?;
        self.audit.validate()?;
        self.sink.validate()?;
        self.pipeline.validate()?;
        validate_access_inputs(&self.access)?;
        self.validate_stages()?;
        validate_ingest(&self.ingest)?;
        if let Some(path) = &self.security_policy {
            validate_path_string("security_policy", &path.to_string_lossy())?;
        }
        Ok(())
    }

    /// Returns the configured stage plan, or the default one.
    #[must_use]
    pub fn stage_plan(&self) -> Vec<StageSpec> {
        if self.stages.is_empty() {
            default_process_plan(&self.buckets)
        } else {
            self.stages.clone()
        }
    }

    /// Returns the configured ingestion plan, or the default one.
    #[must_use]
    pub fn ingest_plan(&self) -> Vec<IngestSpec> {
        if self.ingest.is_empty() { default_ingest_plan() } else { self.ingest.clone() }
    }

    /// Validates stage overrides against the zone buckets.
    fn validate_stages(&self) -> Result<(), ConfigError> {
        let known: BTreeSet<&str> = self.buckets.all().into_iter().collect();
        let mut names = BTreeSet::new();
        for stage in &self.stages {
            let name = stage.name.as_str();
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("stages.name must be non-empty".to_string()));
            }
            if !names.insert(name) {
                return Err(ConfigError::Invalid(format!("duplicate stage name `{name}`")));
            }
            for bucket in [&stage.source_bucket, &stage.target.bucket] {
                if !known.contains(bucket.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "stage `{name}` references unknown bucket `{bucket}`"
                    )));
                }
            }
            validate_source(&stage.source)
                .map_err(|err| ConfigError::Invalid(format!("stage `{name}` source: {err}")))?;
            validate_object_key(&stage.target.object)
                .map_err(|err| ConfigError::Invalid(format!("stage `{name}` target: {err}")))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Blob store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StorageConfig {
    /// Local directory; each bucket is a subdirectory.
    Filesystem {
        /// Root directory.
        #[serde(default = "default_storage_root")]
        root: PathBuf,
    },
    /// S3-compatible object storage.
    S3 {
        /// Optional endpoint for S3-compatible services.
        #[serde(default)]
        endpoint: Option<String>,
        /// Optional region (defaults to environment).
        #[serde(default)]
        region: Option<String>,
        /// Force path-style addressing.
        #[serde(default)]
        force_path_style: bool,
        /// Allow non-TLS endpoints (explicit opt-in).
        #[serde(default)]
        allow_http: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            root: default_storage_root(),
        }
    }
}

impl StorageConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Filesystem {
                root,
            } => validate_path_string("storage.root", &root.to_string_lossy()),
            Self::S3 {
                endpoint,
                region,
                allow_http,
                ..
            } => {
                if let Some(endpoint) = endpoint {
                    let trimmed = endpoint.trim();
                    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                        return Err(ConfigError::Invalid(
                            "storage.endpoint must include http:// or https://".to_string(),
                        ));
                    }
                    if trimmed.starts_with("http://") && !allow_http {
                        return Err(ConfigError::Invalid(
                            "storage.endpoint uses http:// without allow_http".to_string(),
                        ));
                    }
                }
                if region.as_ref().is_some_and(|region| region.trim().is_empty()) {
                    return Err(ConfigError::Invalid(
                        "storage.region must be non-empty when set".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Returns the default filesystem store root.
fn default_storage_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_ROOT)
}

// ============================================================================
// SECTION: Quality
// ============================================================================

/// Quality gate configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityConfig {
    /// `advise` records failures, `enforce` blocks persist.
    #[serde(default)]
    pub mode: QualityMode,
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// Append-only JSON lines file.
    File,
    /// Drop all events.
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Relational Sink
// ============================================================================

/// Relational sink backend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Access views are only written to the blob store.
    #[default]
    None,
    /// Access views are also loaded into `SQLite`.
    Sqlite,
}

/// Relational sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    /// Sink backend type.
    #[serde(rename = "type", default)]
    pub sink_type: SinkType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_sink_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sink_type: SinkType::default(),
            path: None,
            busy_timeout_ms: default_sink_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl SinkConfig {
    /// Returns the `SQLite` settings when the sqlite sink is enabled.
    #[must_use]
    pub fn sqlite(&self) -> Option<SqliteSinkConfig> {
        match (self.sink_type, &self.path) {
            (SinkType::Sqlite, Some(path)) => Some(SqliteSinkConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.sink_type {
            SinkType::None => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "sink type none must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            SinkType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite sink requires path".to_string())
                })?;
                validate_path_string("sink.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "sink.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Returns the default `SQLite` busy timeout.
const fn default_sink_busy_timeout_ms() -> u64 {
    DEFAULT_SINK_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Pipeline execution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Run independent stages on separate threads.
    #[serde(default)]
    pub parallel: bool,
    /// Directory holding the source files named by the ingestion plan.
    #[serde(default = "default_ingest_dir")]
    pub ingest_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            ingest_dir: default_ingest_dir(),
        }
    }
}

impl PipelineConfig {
    /// Validates pipeline configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("pipeline.ingest_dir", &self.ingest_dir.to_string_lossy())
    }
}

/// Returns the default ingestion directory.
fn default_ingest_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INGEST_DIR)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML or YAML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
pub(crate) fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates bucket names and requires them to be distinct.
fn validate_buckets(buckets: &ZoneBuckets) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for bucket in buckets.all() {
        validate_bucket_name(bucket)
            .map_err(|err| ConfigError::Invalid(format!("buckets: {err}")))?;
        if !seen.insert(bucket) {
            return Err(ConfigError::Invalid(format!(
                "bucket `{bucket}` is assigned to more than one zone"
            )));
        }
    }
    Ok(())
}

/// Validates the process-zone keys read by the access builders.
fn validate_access_inputs(access: &AccessInputs) -> Result<(), ConfigError> {
    for key in [
        &access.traffic,
        &access.bike_share,
        &access.parking_rotation,
        &access.parking_info,
    ] {
        validate_object_key(key).map_err(|err| ConfigError::Invalid(format!("access: {err}")))?;
    }
    Ok(())
}

/// Validates a stage source; latest-file prefixes may be empty or end in `/`.
fn validate_source(source: &SourceSelector) -> Result<(), BlobStoreError> {
    match source {
        SourceSelector::Exact(key) => validate_object_key(key),
        SourceSelector::Latest(prefix) => {
            let trimmed = prefix.trim_end_matches('/');
            if trimmed.is_empty() { Ok(()) } else { validate_object_key(trimmed) }
        }
    }
}

/// Validates ingestion overrides.
fn validate_ingest(specs: &[IngestSpec]) -> Result<(), ConfigError> {
    let mut keys = BTreeSet::new();
    for spec in specs {
        validate_path_string("ingest.path", &spec.path.to_string_lossy())?;
        validate_object_key(&spec.key)
            .map_err(|err| ConfigError::Invalid(format!("ingest key: {err}")))?;
        if !keys.insert((spec.key.as_str(), spec.dated)) {
            return Err(ConfigError::Invalid(format!("duplicate ingest key `{}`", spec.key)));
        }
    }
    Ok(())
}
