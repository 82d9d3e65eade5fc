// crates/mobility-lake-core/src/runtime/lineage.rs
// ============================================================================
// Module: Lineage Graph
// Description: Append-only lineage edges with backward tracing.
// Purpose: Answer where a dataset came from, across every zone it crossed.
// Dependencies: crate::core, crate::runtime::governance
// ============================================================================

//! ## Overview
//! Edges are appended through the [`GovernanceStore`] and never rewritten.
//! [`LineageGraph::trace`] walks inbound edges from a target back to every
//! origin, returning a topologically ordered list of steps.
//!
//! Rerunning a stage appends an equivalent edge each time; the walk keeps only
//! the latest of each equivalent group so the trace reflects the current
//! shape of the graph rather than its run history.
//!
//! # Invariants
//! - Each object is expanded at most once, so cyclic records cannot loop.
//! - A multi-source edge without parents ends its branch with a note.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::lineage::LineageEdge;
use crate::core::lineage::LineageNote;
use crate::core::lineage::LineageSource;
use crate::core::lineage::LineageStep;
use crate::core::lineage::LineageTrace;
use crate::core::zone::ObjectRef;
use crate::runtime::governance::GovernanceError;
use crate::runtime::governance::GovernanceStore;

// ============================================================================
// SECTION: Graph
// ============================================================================

/// Lineage edge log with trace queries.
pub struct LineageGraph {
    /// Edge persistence.
    governance: Arc<GovernanceStore>,
}

/// Identity of equivalent edges appended by reruns.
type EdgeIdentity = (ObjectRef, LineageSource, Vec<ObjectRef>, String);

impl LineageGraph {
    /// Creates a graph over a governance store.
    #[must_use]
    pub const fn new(governance: Arc<GovernanceStore>) -> Self {
        Self {
            governance,
        }
    }

    /// Appends one edge.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the edge cannot be written.
    pub fn append_edge(&self, edge: &LineageEdge) -> Result<String, GovernanceError> {
        self.governance.append_lineage(edge)
    }

    /// Returns every readable edge in key order.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the edge log cannot be listed.
    pub fn edges(&self) -> Result<Vec<LineageEdge>, GovernanceError> {
        Ok(self.governance.list_lineage()?.records.into_iter().map(|(_, edge)| edge).collect())
    }

    /// Returns the latest edges whose target is `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the edge log cannot be listed.
    pub fn inbound(&self, target: &ObjectRef) -> Result<Vec<LineageEdge>, GovernanceError> {
        let index = latest_by_target(self.edges()?);
        Ok(index.get(target).cloned().unwrap_or_default())
    }

    /// Walks lineage backward from `target`.
    ///
    /// A target with no inbound edge yields an empty trace naming the target
    /// as its only origin.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the edge log cannot be listed.
    pub fn trace(&self, target: &ObjectRef) -> Result<LineageTrace, GovernanceError> {
        Ok(trace_edges(self.edges()?, target))
    }
}

// ============================================================================
// SECTION: Tracing
// ============================================================================

/// Builds a trace from an edge list.
#[must_use]
pub fn trace_edges(edges: Vec<LineageEdge>, target: &ObjectRef) -> LineageTrace {
    let index = latest_by_target(edges);
    let mut selected: Vec<LineageEdge> = Vec::new();
    let mut origins: BTreeSet<ObjectRef> = BTreeSet::new();
    let mut unresolved = false;
    let mut visited: BTreeSet<ObjectRef> = BTreeSet::new();
    let mut queue: VecDeque<ObjectRef> = VecDeque::from([target.clone()]);

    while let Some(node) = queue.pop_front() {
        if !visited.insert(node.clone()) {
            continue;
        }
        let Some(inbound) = index.get(&node) else {
            origins.insert(node);
            continue;
        };
        for edge in inbound {
            if edge.is_unresolved() {
                unresolved = true;
            }
            for parent in edge.upstream() {
                if !visited.contains(parent) {
                    queue.push_back(parent.clone());
                }
            }
            selected.push(edge.clone());
        }
    }

    let depth = heights(&selected);
    let mut ordered: Vec<(usize, LineageEdge)> = selected
        .into_iter()
        .map(|edge| (depth.get(&edge.target).copied().unwrap_or(0), edge))
        .collect();
    ordered.sort_by(|(left_height, left), (right_height, right)| {
        right_height
            .cmp(left_height)
            .then_with(|| left.timestamp.cmp(&right.timestamp))
            .then_with(|| left.target.cmp(&right.target))
    });

    let steps = ordered
        .into_iter()
        .map(|(_, edge)| {
            if edge.is_unresolved() {
                LineageStep::Note(LineageNote::for_edge(&edge))
            } else {
                LineageStep::Edge(edge)
            }
        })
        .collect();

    LineageTrace {
        target: target.clone(),
        steps,
        origins: origins.into_iter().collect(),
        unresolved,
    }
}

/// Groups edges by target, keeping the latest of each rerun group.
fn latest_by_target(edges: Vec<LineageEdge>) -> BTreeMap<ObjectRef, Vec<LineageEdge>> {
    let mut latest: BTreeMap<EdgeIdentity, LineageEdge> = BTreeMap::new();
    for edge in edges {
        let identity = (
            edge.target.clone(),
            edge.source.clone(),
            edge.parents.clone(),
            edge.transformation.clone(),
        );
        match latest.get(&identity) {
            // Later keys win ties, and edges arrive in key order.
            Some(existing) if existing.timestamp > edge.timestamp => {}
            _ => {
                latest.insert(identity, edge);
            }
        }
    }
    let mut index: BTreeMap<ObjectRef, Vec<LineageEdge>> = BTreeMap::new();
    for edge in latest.into_values() {
        index.entry(edge.target.clone()).or_default().push(edge);
    }
    index
}

/// Computes each target's distance to the traced object.
///
/// The traced object has height zero; a producer of an object at height `h`
/// has height at least `h + 1`. Relaxation is capped so cyclic records end.
fn heights(edges: &[LineageEdge]) -> BTreeMap<ObjectRef, usize> {
    let mut height: BTreeMap<ObjectRef, usize> = BTreeMap::new();
    for edge in edges {
        height.entry(edge.target.clone()).or_insert(0);
    }
    let cap = edges.len() + 1;
    let mut changed = true;
    let mut rounds = 0;
    while changed && rounds < cap {
        changed = false;
        rounds += 1;
        for edge in edges {
            let child = height.get(&edge.target).copied().unwrap_or(0);
            for parent in edge.upstream() {
                if let Some(current) = height.get_mut(parent)
                    && *current < child + 1
                    && child < cap
                {
                    *current = child + 1;
                    changed = true;
                }
            }
        }
    }
    height
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use time::Duration;
    use time::macros::datetime;

    use super::*;

    fn obj(bucket: &str, object: &str) -> ObjectRef {
        ObjectRef::new(bucket, object)
    }

    #[test]
    fn reruns_collapse_to_latest_edge() {
        let at = datetime!(2024-05-01 08:00 UTC);
        let edges = vec![
            LineageEdge::single(obj("raw", "a.csv"), obj("proc", "a.parquet"), "clean", at),
            LineageEdge::single(
                obj("raw", "a.csv"),
                obj("proc", "a.parquet"),
                "clean",
                at + Duration::minutes(5),
            ),
        ];
        let trace = trace_edges(edges, &obj("proc", "a.parquet"));
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.edges().next().unwrap().timestamp, at + Duration::minutes(5));
        assert_eq!(trace.origins, vec![obj("raw", "a.csv")]);
    }

    #[test]
    fn cyclic_records_terminate() {
        let at = datetime!(2024-05-01 08:00 UTC);
        let edges = vec![
            LineageEdge::single(obj("z", "a"), obj("z", "b"), "t", at),
            LineageEdge::single(obj("z", "b"), obj("z", "a"), "t", at),
        ];
        let trace = trace_edges(edges, &obj("z", "a"));
        assert_eq!(trace.steps.len(), 2);
        assert!(trace.origins.is_empty());
    }

    #[test]
    fn untraced_target_is_its_own_origin() {
        let trace = trace_edges(Vec::new(), &obj("z", "a"));
        assert!(trace.is_empty());
        assert_eq!(trace.origins, vec![obj("z", "a")]);
        assert!(!trace.unresolved);
    }
}
