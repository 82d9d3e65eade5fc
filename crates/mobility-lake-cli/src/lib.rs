// crates/mobility-lake-cli/src/lib.rs
// ============================================================================
// Module: Mobility Lake CLI Library
// Description: Component wiring shared by the CLI binary and its tests.
// Purpose: Turn a validated configuration into a running lake context.
// Dependencies: mobility-lake-config, mobility-lake-core, mobility-lake-store
// ============================================================================

//! ## Overview
//! The `mobility-lake` binary parses commands and prints results; building
//! the blob store, audit sink, relational sink and [`MobilityLake`] context
//! from a [`LakeConfig`] lives here so it can be tested without a process.
//!
//! [`MobilityLake`]: mobility_lake_core::MobilityLake
//! [`LakeConfig`]: mobility_lake_config::LakeConfig

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod wiring;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use wiring::LakeRuntime;
pub use wiring::WiringError;
