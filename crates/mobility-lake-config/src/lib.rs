// crates/mobility-lake-config/src/lib.rs
// ============================================================================
// Module: Mobility Lake Config Library
// Description: Canonical config model, validation and policy loading.
// Purpose: Single source of truth for mobility-lake.toml semantics.
// Dependencies: mobility-lake-core, mobility-lake-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `mobility-lake-config` defines the configuration model of a lake
//! deployment: storage backend, zone buckets, quality gate mode, audit sink,
//! relational sink and the stage and ingestion plans. Validation is strict
//! and fails closed; a config is built once and handed to components.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod example;
pub mod policy;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use example::config_toml_example;
pub use policy::load_security_policy;
