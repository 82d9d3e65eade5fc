// crates/mobility-lake-core/src/core/policy.rs
// ============================================================================
// Module: Mobility Lake Security Policy
// Description: Declarative access, encryption and retention policy per zone.
// Purpose: Publish the lake's security posture as a governed document.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The security policy is static configuration. The pipeline publishes it to
//! the govern security bucket but never enforces it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::zone::ZoneBuckets;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Object key of the published policy document.
pub const SECURITY_POLICY_KEY: &str = "policies/datalake_security_policy.yaml";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Roles allowed per access level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessLevels {
    /// Roles that may read.
    #[serde(default)]
    pub read: Vec<String>,
    /// Roles that may write.
    #[serde(default)]
    pub write: Vec<String>,
    /// Roles that may delete.
    #[serde(default)]
    pub delete: Vec<String>,
}

/// Policy for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZonePolicy {
    /// Zone purpose.
    pub description: String,
    /// Role lists per access level.
    pub access_levels: AccessLevels,
    /// Encryption requirement, e.g. `required`.
    pub encryption: String,
    /// Retention duration, e.g. `90 days`.
    pub retention_policy: String,
}

/// Security policy keyed by zone bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityPolicy {
    /// Zone policies.
    pub zones: BTreeMap<String, ZonePolicy>,
}

impl SecurityPolicy {
    /// Builds the default policy for the raw, process and access buckets.
    #[must_use]
    pub fn default_for(buckets: &ZoneBuckets) -> Self {
        let mut zones = BTreeMap::new();
        zones.insert(
            buckets.raw.clone(),
            ZonePolicy {
                description: "Storage for unprocessed source data".to_string(),
                access_levels: AccessLevels {
                    read: roles(&["data_engineer", "data_scientist", "admin"]),
                    write: roles(&["data_engineer", "admin", "system_integrator"]),
                    delete: roles(&["admin"]),
                },
                encryption: "required".to_string(),
                retention_policy: "90 days".to_string(),
            },
        );
        zones.insert(
            buckets.process.clone(),
            ZonePolicy {
                description: "Storage for cleaned and standardized data".to_string(),
                access_levels: AccessLevels {
                    read: roles(&["data_engineer", "data_scientist", "data_analyst", "admin"]),
                    write: roles(&["data_engineer", "admin"]),
                    delete: roles(&["admin"]),
                },
                encryption: "required".to_string(),
                retention_policy: "180 days".to_string(),
            },
        );
        zones.insert(
            buckets.access.clone(),
            ZonePolicy {
                description: "Analytics-ready data for consumption".to_string(),
                access_levels: AccessLevels {
                    read: roles(&[
                        "data_engineer",
                        "data_scientist",
                        "data_analyst",
                        "business_user",
                        "admin",
                        "public_dashboards",
                    ]),
                    write: roles(&["data_engineer", "admin"]),
                    delete: roles(&["admin"]),
                },
                encryption: "required".to_string(),
                retention_policy: "365 days".to_string(),
            },
        );
        Self {
            zones,
        }
    }

    /// Returns the roles allowed to read a zone bucket.
    #[must_use]
    pub fn readers(&self, bucket: &str) -> &[String] {
        self.zones.get(bucket).map(|zone| zone.access_levels.read.as_slice()).unwrap_or_default()
    }
}

/// Converts role literals to owned strings.
fn roles(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}
