// crates/mobility-lake-store-sqlite/src/sink.rs
// ============================================================================
// Module: SQLite Relational Sink
// Description: Drop-and-replace table loads into a SQLite database.
// Purpose: Persist access-zone views for SQL consumers.
// Dependencies: mobility-lake-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteSink`] holds one connection behind a mutex. A load validates every
//! identifier, then drops, recreates and fills the table in a single
//! transaction; any failure rolls back and leaves the previous table intact.
//!
//! Column types map as follows: integers and booleans to `INTEGER`, floats
//! to `REAL`, text and timestamps to `TEXT`. Timestamps are written as
//! `YYYY-MM-DD HH:MM:SS`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use mobility_lake_core::DataType;
use mobility_lake_core::RelationalSink;
use mobility_lake_core::SinkError;
use mobility_lake_core::Table;
use mobility_lake_core::Value;
use mobility_lake_core::core::time::format_datetime;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum identifier length for tables and columns.
const MAX_IDENTIFIER_LENGTH: usize = 128;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` sink.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteSinkConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteSinkConfig {
    /// Creates a config with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` sink errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqliteSinkError {
    /// Filesystem error around the database file.
    #[error("sqlite sink io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite sink db error: {0}")]
    Db(String),
    /// Rejected path, identifier or table shape.
    #[error("sqlite sink invalid input: {0}")]
    Invalid(String),
}

impl From<SqliteSinkError> for SinkError {
    fn from(error: SqliteSinkError) -> Self {
        match error {
            SqliteSinkError::Invalid(message) => Self::Invalid(message),
            other => Self::Sink(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for SqliteSinkError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// `SQLite`-backed relational sink.
pub struct SqliteSink {
    /// Serialized connection.
    connection: Mutex<Connection>,
    /// Database path.
    path: PathBuf,
}

impl SqliteSink {
    /// Opens or creates the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSinkError`] when the path is unusable or the database
    /// cannot be opened.
    pub fn open(config: &SqliteSinkConfig) -> Result<Self, SqliteSinkError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let connection = open_connection(config)?;
        Ok(Self {
            connection: Mutex::new(connection),
            path: config.path.clone(),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces `table_name` with the rows of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSinkError`] when an identifier is rejected or the
    /// transaction fails; the previous table is kept in that case.
    pub fn replace_table(&self, table_name: &str, table: &Table) -> Result<usize, SqliteSinkError> {
        validate_identifier(table_name)?;
        if table.column_count() == 0 {
            return Err(SqliteSinkError::Invalid(format!("table `{table_name}` has no columns")));
        }
        for name in table.column_names() {
            validate_identifier(name)?;
        }
        let columns = table
            .columns()
            .iter()
            .map(|column| format!("{} {}", quote(&column.name), sql_type(column.data_type())))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders =
            (1 ..= table.column_count()).map(|index| format!("?{index}")).collect::<Vec<_>>();
        let quoted = quote(table_name);

        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteSinkError::Db("sqlite sink mutex poisoned".to_string()))?;
        let tx = guard.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {quoted}; CREATE TABLE {quoted} ({columns});"
        ))?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {quoted} VALUES ({})",
                placeholders.join(", ")
            ))?;
            for row in 0 .. table.row_count() {
                insert.execute(params_from_iter(table.row(row).into_iter().map(sql_value)))?;
            }
        }
        tx.commit()?;
        drop(guard);
        Ok(table.row_count())
    }
}

impl RelationalSink for SqliteSink {
    fn load_replace(&self, table_name: &str, table: &Table) -> Result<usize, SinkError> {
        Ok(self.replace_table(table_name, table)?)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the declared `SQLite` type of a column.
const fn sql_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Int64 | DataType::Boolean => "INTEGER",
        DataType::Float64 => "REAL",
        DataType::Utf8 | DataType::Timestamp => "TEXT",
    }
}

/// Converts a cell to a `SQLite` value.
fn sql_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Utf8(text) => SqlValue::Text(text),
        Value::Int64(number) => SqlValue::Integer(number),
        Value::Float64(number) => SqlValue::Real(number),
        Value::Boolean(flag) => SqlValue::Integer(i64::from(flag)),
        Value::Timestamp(moment) => SqlValue::Text(format_datetime(moment)),
    }
}

/// Quotes an identifier that already passed validation.
fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*` identifiers.
fn validate_identifier(identifier: &str) -> Result<(), SqliteSinkError> {
    let mut chars = identifier.chars();
    let valid_start = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let valid_rest = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !valid_start || !valid_rest || identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SqliteSinkError::Invalid(format!("identifier `{identifier}` is not allowed")));
    }
    if identifier.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(SqliteSinkError::Invalid(format!("identifier `{identifier}` is reserved")));
    }
    Ok(())
}

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteSinkError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteSinkError::Io("sink path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteSinkError::Io(err.to_string()))
}

/// Validates database paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteSinkError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteSinkError::Invalid("sink path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteSinkError::Invalid("sink path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteSinkError::Invalid(
                "sink path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteSinkError::Invalid(
            "sink path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteSinkConfig) -> Result<Connection, SqliteSinkError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
