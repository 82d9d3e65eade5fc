// crates/mobility-lake-config/src/policy.rs
// ============================================================================
// Module: Security Policy Loading
// Description: Resolve the security policy published to the govern zone.
// Purpose: Load an operator YAML policy or fall back to the zone defaults.
// Dependencies: mobility-lake-core, serde_yaml
// ============================================================================

//! ## Overview
//! The policy is declarative: it is stored and published, never enforced by
//! the pipeline. A configured YAML file replaces the built-in policy as a
//! whole; every bucket it names must be one of the configured zone buckets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use mobility_lake_core::SecurityPolicy;

use crate::config::ConfigError;
use crate::config::LakeConfig;
use crate::config::MAX_CONFIG_FILE_SIZE;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Returns the security policy for `config`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the policy file cannot be read or parsed, or
/// names a bucket that is not a zone bucket.
pub fn load_security_policy(config: &LakeConfig) -> Result<SecurityPolicy, ConfigError> {
    let Some(path) = &config.security_policy else {
        return Ok(SecurityPolicy::default_for(&config.buckets));
    };
    let bytes =
        fs::read(path).map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("security policy exceeds size limit".to_string()));
    }
    let policy: SecurityPolicy =
        serde_yaml::from_slice(&bytes).map_err(|err| ConfigError::Parse(err.to_string()))?;
    let known = config.buckets.all();
    for bucket in policy.zones.keys() {
        if !known.contains(&bucket.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "security policy names unknown bucket `{bucket}`"
            )));
        }
    }
    Ok(policy)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn missing_path_uses_default_policy() {
        let config = LakeConfig::default();
        let policy = load_security_policy(&config).unwrap();
        assert_eq!(policy, SecurityPolicy::default_for(&config.buckets));
        assert_eq!(policy.zones.len(), 3);
    }
}
