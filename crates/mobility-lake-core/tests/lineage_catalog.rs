// crates/mobility-lake-core/tests/lineage_catalog.rs
// ============================================================================
// Module: Lineage And Catalog Tests
// Description: Backward traces over stored edges and catalog upserts.
// Purpose: Ensure provenance queries order, terminate and survive reruns.
// ============================================================================

//! Lineage trace and metadata catalog tests over a governance store.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use mobility_lake_core::BlobStore;
use mobility_lake_core::Clock;
use mobility_lake_core::DatasetDescriptor;
use mobility_lake_core::DatasetName;
use mobility_lake_core::FixedClock;
use mobility_lake_core::GovernanceStore;
use mobility_lake_core::InMemoryBlobStore;
use mobility_lake_core::LineageEdge;
use mobility_lake_core::LineageGraph;
use mobility_lake_core::LineageStep;
use mobility_lake_core::MULTIPLE_SOURCES;
use mobility_lake_core::MetadataCatalog;
use mobility_lake_core::MetadataRecord;
use mobility_lake_core::ObjectRef;
use mobility_lake_core::core::lineage::LineageSource;
use mobility_lake_core::core::lineage::SourceMarker;
use time::Duration;
use time::macros::datetime;

struct Fixture {
    store: Arc<InMemoryBlobStore>,
    clock: Arc<FixedClock>,
    governance: Arc<GovernanceStore>,
}

fn fixture() -> Fixture {
    let clock = Arc::new(FixedClock::new(datetime!(2024-03-15 10:00 UTC)));
    let store = Arc::new(
        InMemoryBlobStore::with_clock(clock.clone())
            .with_buckets(&["govern-zone-metadata"])
            .unwrap(),
    );
    let governance =
        Arc::new(GovernanceStore::new(store.clone(), "govern-zone-metadata", clock.clone()));
    Fixture {
        store,
        clock,
        governance,
    }
}

fn object(bucket: &str, key: &str) -> ObjectRef {
    ObjectRef::new(bucket, key)
}

fn edge(fixture: &Fixture, source: &ObjectRef, target: &ObjectRef) -> LineageEdge {
    fixture.clock.advance(Duration::seconds(1));
    LineageEdge::single(source.clone(), target.clone(), "step", fixture.clock.now())
}

#[test]
fn chain_is_traced_origin_first() {
    let fixture = fixture();
    let graph = LineageGraph::new(Arc::clone(&fixture.governance));
    let a = object("raw-ingestion-zone", "data/a.csv");
    let b = object("process-zone", "data/b.parquet");
    let c = object("access-zone", "analytics/c.parquet");
    graph.append_edge(&edge(&fixture, &b, &c)).unwrap();
    graph.append_edge(&edge(&fixture, &a, &b)).unwrap();

    let trace = graph.trace(&c).unwrap();
    let hops: Vec<(String, String)> = trace
        .edges()
        .map(|edge| (edge.source.key_fragment(), edge.target.to_string()))
        .collect();
    assert_eq!(hops.len(), 2);
    assert_eq!(hops[0].1, b.to_string());
    assert_eq!(hops[1].1, c.to_string());
    assert_eq!(trace.origins, vec![a]);
    assert!(!trace.unresolved);
}

#[test]
fn parentless_multiple_edge_yields_one_note() {
    let fixture = fixture();
    let graph = LineageGraph::new(Arc::clone(&fixture.governance));
    let target = object("access-zone", "analytics/d.parquet");
    let edge = LineageEdge::from_sources(Vec::new(), target.clone(), "merge", fixture.clock.now());
    assert_eq!(edge.source, LineageSource::Marker(SourceMarker::Multiple));
    graph.append_edge(&edge).unwrap();

    let trace = graph.trace(&target).unwrap();
    assert_eq!(trace.steps.len(), 1);
    let LineageStep::Note(note) = &trace.steps[0] else {
        panic!("expected a note, got {:?}", trace.steps[0]);
    };
    assert_eq!(note.target, target);
    assert!(trace.unresolved);
}

#[test]
fn multi_source_edge_with_parents_is_traversed() {
    let fixture = fixture();
    let graph = LineageGraph::new(Arc::clone(&fixture.governance));
    let left = object("process-zone", "invent/parkings.parquet");
    let right = object("process-zone", "apar/aparcamientos.parquet");
    let joined = object("access-zone", "analytics/parkings_unidos.parquet");
    graph
        .append_edge(&LineageEdge::from_sources(
            vec![left.clone(), right.clone()],
            joined.clone(),
            "join",
            fixture.clock.now(),
        ))
        .unwrap();
    let trace = graph.trace(&joined).unwrap();
    assert_eq!(trace.edges().count(), 1);
    assert_eq!(trace.origins, vec![right, left]);
}

#[test]
fn stored_multiple_marker_round_trips_as_text() {
    let fixture = fixture();
    let graph = LineageGraph::new(Arc::clone(&fixture.governance));
    let target = object("access-zone", "analytics/e.parquet");
    let key = graph
        .append_edge(&LineageEdge::from_sources(
            vec![object("p", "a"), object("p", "b")],
            target,
            "merge",
            fixture.clock.now(),
        ))
        .unwrap();
    let bytes = fixture.store.get("govern-zone-metadata", &key).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["source"], MULTIPLE_SOURCES);
}

#[test]
fn reruns_do_not_duplicate_trace_steps() {
    let fixture = fixture();
    let graph = LineageGraph::new(Arc::clone(&fixture.governance));
    let a = object("raw-ingestion-zone", "data/a.csv");
    let b = object("process-zone", "data/b.parquet");
    graph.append_edge(&edge(&fixture, &a, &b)).unwrap();
    graph.append_edge(&edge(&fixture, &a, &b)).unwrap();
    assert_eq!(graph.edges().unwrap().len(), 2);
    assert_eq!(graph.trace(&b).unwrap().steps.len(), 1);
}

#[test]
fn unreadable_lineage_records_are_skipped() {
    let fixture = fixture();
    let graph = LineageGraph::new(Arc::clone(&fixture.governance));
    let a = object("raw-ingestion-zone", "data/a.csv");
    let b = object("process-zone", "data/b.parquet");
    graph.append_edge(&edge(&fixture, &a, &b)).unwrap();
    fixture.store.put("govern-zone-metadata", "lineage/garbage.json", b"{not json").unwrap();
    let page = fixture.governance.list_lineage().unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.unreadable, vec!["lineage/garbage.json".to_string()]);
    assert_eq!(graph.trace(&b).unwrap().steps.len(), 1);
}

fn descriptor(description: &str) -> DatasetDescriptor {
    DatasetDescriptor {
        description: description.to_string(),
        purpose: "Traffic analysis and reporting".to_string(),
        refresh_frequency: "Daily".to_string(),
        target_users: "Traffic analysts".to_string(),
    }
}

#[test]
fn publishing_twice_keeps_one_record() {
    let fixture = fixture();
    let catalog = MetadataCatalog::new(Arc::clone(&fixture.governance));
    let name = DatasetName::new("rutas_users");
    let location = object("access-zone", "analytics/rutas_users.parquet");
    let first = MetadataRecord::published(
        name.clone(),
        &descriptor("first"),
        "parquet",
        &location,
        fixture.clock.now(),
    );
    let second = MetadataRecord::published(
        name.clone(),
        &descriptor("second"),
        "parquet",
        &location,
        fixture.clock.now(),
    );
    catalog.publish(&first).unwrap();
    catalog.publish(&second).unwrap();

    let listing = catalog.list_all().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(catalog.get(&name).unwrap().unwrap().description, "second");
    let grouped = &listing.datasets["access-zone"];
    assert!(grouped.contains_key("analytics/rutas_users.parquet"));
}

#[test]
fn catalog_rejects_path_like_names() {
    let fixture = fixture();
    let catalog = MetadataCatalog::new(Arc::clone(&fixture.governance));
    let record = MetadataRecord::published(
        DatasetName::new("../escape"),
        &descriptor("bad"),
        "parquet",
        &object("access-zone", "x.parquet"),
        fixture.clock.now(),
    );
    assert!(catalog.publish(&record).is_err());
}

#[test]
fn missing_catalog_entry_is_none() {
    let fixture = fixture();
    let catalog = MetadataCatalog::new(Arc::clone(&fixture.governance));
    assert!(catalog.get(&DatasetName::new("absent")).unwrap().is_none());
    assert!(catalog.list_all().unwrap().is_empty());
}
