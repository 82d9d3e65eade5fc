// crates/mobility-lake-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Relational Sink
// Description: Relational copy of access-zone views backed by SQLite.
// Purpose: Give SQL clients and dashboards a queryable copy of the views.
// Dependencies: mobility-lake-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`mobility_lake_core::RelationalSink`].
//! Each load replaces the target table inside one transaction, so readers see
//! either the previous or the new contents and never a mix.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod sink;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use sink::SqliteJournalMode;
pub use sink::SqliteSink;
pub use sink::SqliteSinkConfig;
pub use sink::SqliteSinkError;
pub use sink::SqliteSyncMode;
