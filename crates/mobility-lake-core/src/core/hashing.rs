// crates/mobility-lake-core/src/core/hashing.rs
// ============================================================================
// Module: Mobility Lake Content Digests
// Description: SHA-256 fingerprints of stored blobs and governance records.
// Purpose: Let operators tell whether a rerun changed a dataset or policy.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! A [`ContentDigest`] is taken either over the exact bytes written to a zone
//! ([`ContentDigest::of_bytes`]) or over the RFC 8785 canonical JSON of a
//! record ([`ContentDigest::of_record`]), so field order in the source never
//! changes a record digest. SHA-256 is the only algorithm; the name is still
//! serialized so stored digests stay self-describing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Algorithm label written next to every digest.
pub const DIGEST_ALGORITHM: &str = "sha256";

/// SHA-256 digest of dataset or record content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// Algorithm label, always [`DIGEST_ALGORITHM`].
    pub algorithm: String,
    /// Lowercase hex digest.
    pub hex: String,
}

impl ContentDigest {
    /// Digests the bytes exactly as stored.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let mut hex = String::with_capacity(hash.len() * 2);
        for byte in hash.iter() {
            let _ = write!(hex, "{byte:02x}");
        }
        Self {
            algorithm: DIGEST_ALGORITHM.to_string(),
            hex,
        }
    }

    /// Digests the canonical JSON form of a record.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] when the record cannot be serialized.
    pub fn of_record<T: Serialize + ?Sized>(record: &T) -> Result<Self, DigestError> {
        let canonical =
            serde_jcs::to_vec(record).map_err(|err| DigestError::Canonical(err.to_string()))?;
        Ok(Self::of_bytes(&canonical))
    }

    /// Returns the leading `len` hex characters.
    #[must_use]
    pub fn short(&self, len: usize) -> &str {
        self.hex.get(.. len).unwrap_or(&self.hex)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Record digest failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// The record has no canonical JSON form.
    #[error("record is not canonical json: {0}")]
    Canonical(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn empty_input_matches_known_sha256() {
        let digest = ContentDigest::of_bytes(b"");
        assert_eq!(
            digest.hex,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest.short(8), "e3b0c442");
        assert_eq!(digest.to_string(), format!("sha256:{}", digest.hex));
    }

    #[test]
    fn record_digest_ignores_field_order() {
        let forward = serde_json::json!({"zone": "raw", "retention": "90 days"});
        let mut reversed = BTreeMap::new();
        reversed.insert("retention", "90 days");
        reversed.insert("zone", "raw");
        assert_eq!(
            ContentDigest::of_record(&forward).unwrap(),
            ContentDigest::of_record(&reversed).unwrap()
        );
    }
}
