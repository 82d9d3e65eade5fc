// crates/mobility-lake-core/src/runtime/catalog.rs
// ============================================================================
// Module: Metadata Catalog
// Description: Publish, look up, and list dataset metadata records.
// Purpose: Describe every published analytics dataset by name.
// Dependencies: crate::core, crate::runtime::governance
// ============================================================================

//! ## Overview
//! The catalog keeps one record per dataset name. Republishing a name
//! replaces its record. Listings group records by source bucket and object
//! name; records written without a location fall under [`UNKNOWN_LOCATION`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core::identifiers::DatasetName;
use crate::core::metadata::MetadataRecord;
use crate::runtime::governance::GovernanceError;
use crate::runtime::governance::GovernanceStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Grouping key used when a record has no bucket or object name.
pub const UNKNOWN_LOCATION: &str = "unknown";

// ============================================================================
// SECTION: Listing
// ============================================================================

/// Catalog contents grouped by location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogListing {
    /// Source bucket to object name to record.
    pub datasets: BTreeMap<String, BTreeMap<String, MetadataRecord>>,
    /// Keys of records that could not be parsed.
    pub unreadable: Vec<String>,
}

impl CatalogListing {
    /// Iterates every record in bucket then object order.
    pub fn records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.datasets.values().flat_map(BTreeMap::values)
    }

    /// Returns the number of listed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.values().map(BTreeMap::len).sum()
    }

    /// Returns true when nothing is cataloged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Metadata records keyed by dataset name.
pub struct MetadataCatalog {
    /// Record persistence.
    governance: Arc<GovernanceStore>,
}

impl MetadataCatalog {
    /// Creates a catalog over a governance store.
    #[must_use]
    pub const fn new(governance: Arc<GovernanceStore>) -> Self {
        Self {
            governance,
        }
    }

    /// Publishes a record, replacing any earlier record with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the record cannot be written.
    pub fn publish(&self, record: &MetadataRecord) -> Result<String, GovernanceError> {
        self.governance.put_metadata(record)
    }

    /// Returns the record for a dataset, if published.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the record exists but cannot be read.
    pub fn get(&self, name: &DatasetName) -> Result<Option<MetadataRecord>, GovernanceError> {
        self.governance.get_metadata(name)
    }

    /// Lists every readable record grouped by bucket and object name.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the catalog cannot be listed.
    pub fn list_all(&self) -> Result<CatalogListing, GovernanceError> {
        let page = self.governance.list_metadata()?;
        let mut listing = CatalogListing {
            datasets: BTreeMap::new(),
            unreadable: page.unreadable,
        };
        for (_, record) in page.records {
            let bucket =
                record.source_bucket.clone().unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
            let object =
                record.object_name.clone().unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
            listing.datasets.entry(bucket).or_default().insert(object, record);
        }
        Ok(listing)
    }
}
