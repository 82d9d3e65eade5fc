// crates/mobility-lake-core/src/core/lineage.rs
// ============================================================================
// Module: Mobility Lake Lineage Records
// Description: Lineage edges, synthetic notes, and trace results.
// Purpose: Record provenance for every zone transition.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A lineage edge links a source object to a target object. Datasets built
//! from several inputs use the `"multiple"` source marker; newer edges also
//! list their parents so traversal can continue past the join. Edges written
//! without parents end a backward walk with a synthetic [`LineageNote`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::zone::ObjectRef;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key fragment and wire value of the multi-source marker.
pub const MULTIPLE_SOURCES: &str = "multiple";

/// Note emitted when a walk reaches a multi-source edge without parents.
pub const MULTIPLE_SOURCES_NOTE: &str = "This dataset was created from multiple source datasets";

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Marker values accepted in place of a source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMarker {
    /// Built from more than one source dataset.
    Multiple,
}

/// Source side of a lineage edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineageSource {
    /// A single traceable object.
    Object(ObjectRef),
    /// A marker standing in for several sources.
    Marker(SourceMarker),
}

impl LineageSource {
    /// Returns the traceable source object, if any.
    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            Self::Marker(_) => None,
        }
    }

    /// Returns the fragment used in lineage storage keys.
    #[must_use]
    pub fn key_fragment(&self) -> String {
        match self {
            Self::Object(object) => object.flattened_object(),
            Self::Marker(SourceMarker::Multiple) => MULTIPLE_SOURCES.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Edges
// ============================================================================

/// Directed provenance link from a source to a target object.
///
/// # Invariants
/// - `parents` is empty unless `source` is the multi-source marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    /// Source object or marker.
    pub source: LineageSource,
    /// Explicit parents of a multi-source edge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ObjectRef>,
    /// Target object.
    pub target: ObjectRef,
    /// Free-text description of the transformation.
    pub transformation: String,
    /// Time the producing stage completed.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl LineageEdge {
    /// Creates an edge from one source object.
    #[must_use]
    pub fn single(
        source: ObjectRef,
        target: ObjectRef,
        transformation: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            source: LineageSource::Object(source),
            parents: Vec::new(),
            target,
            transformation: transformation.into(),
            timestamp,
        }
    }

    /// Creates a multi-source edge. A single parent collapses to a plain edge.
    #[must_use]
    pub fn from_sources(
        mut parents: Vec<ObjectRef>,
        target: ObjectRef,
        transformation: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        if parents.len() == 1
            && let Some(parent) = parents.pop()
        {
            return Self::single(parent, target, transformation, timestamp);
        }
        Self {
            source: LineageSource::Marker(SourceMarker::Multiple),
            parents,
            target,
            transformation: transformation.into(),
            timestamp,
        }
    }

    /// Returns the upstream objects this edge can be traversed into.
    #[must_use]
    pub fn upstream(&self) -> Vec<&ObjectRef> {
        match &self.source {
            LineageSource::Object(object) => vec![object],
            LineageSource::Marker(_) => self.parents.iter().collect(),
        }
    }

    /// Returns true when the edge cannot be traversed further.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self.source, LineageSource::Marker(_)) && self.parents.is_empty()
    }
}

// ============================================================================
// SECTION: Traces
// ============================================================================

/// Synthetic step standing in for an untraceable multi-source edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNote {
    /// Object produced by the multi-source edge.
    pub target: ObjectRef,
    /// Human-readable note.
    pub note: String,
    /// Transformation recorded on the edge.
    pub transformation: String,
    /// Timestamp recorded on the edge.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl LineageNote {
    /// Builds the note for an unresolved multi-source edge.
    #[must_use]
    pub fn for_edge(edge: &LineageEdge) -> Self {
        Self {
            target: edge.target.clone(),
            note: MULTIPLE_SOURCES_NOTE.to_string(),
            transformation: edge.transformation.clone(),
            timestamp: edge.timestamp,
        }
    }
}

/// One entry of a lineage trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineageStep {
    /// A recorded edge.
    Edge(LineageEdge),
    /// A synthetic note ending a branch.
    Note(LineageNote),
}

/// Result of walking lineage backward from a target.
///
/// # Invariants
/// - `steps` are in topological order: origins first, the target last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageTrace {
    /// Object the walk started from.
    pub target: ObjectRef,
    /// Edges and notes from origins to the target.
    pub steps: Vec<LineageStep>,
    /// Reached objects without any inbound edge.
    pub origins: Vec<ObjectRef>,
    /// True when a branch ended at a multi-source edge without parents.
    pub unresolved: bool,
}

impl LineageTrace {
    /// Returns the recorded edges of the trace in order.
    pub fn edges(&self) -> impl Iterator<Item = &LineageEdge> {
        self.steps.iter().filter_map(|step| match step {
            LineageStep::Edge(edge) => Some(edge),
            LineageStep::Note(_) => None,
        })
    }

    /// Returns true when the target has no recorded provenance.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
