// crates/mobility-lake-core/src/runtime/access.rs
// ============================================================================
// Module: Access Zone Builders
// Description: Analytic views built from process-zone tables.
// Purpose: Publish analytics-ready datasets with lineage and catalog entries.
// Dependencies: crate::codec, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! Each [`AccessView`] has a pure builder over in-memory tables and a fixed
//! publication target. [`AccessBuilder`] reads the process-zone inputs,
//! builds the view, writes it as Parquet under `analytics/`, appends one
//! lineage edge, publishes the catalog record, and optionally loads the view
//! into a relational sink.
//!
//! Views built from two inputs record a multi-source edge carrying both
//! parents, so lineage traces continue past the join.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::codec::CodecError;
use crate::codec::decode_parquet;
use crate::codec::encode_parquet;
use crate::core::dataset::DatasetFormat;
use crate::core::dataset::DatasetRecord;
use crate::core::hashing::ContentDigest;
use crate::core::identifiers::DatasetName;
use crate::core::lineage::LineageEdge;
use crate::core::metadata::DatasetDescriptor;
use crate::core::metadata::MetadataRecord;
use crate::core::table::Column;
use crate::core::table::Table;
use crate::core::table::TableError;
use crate::core::zone::ObjectRef;
use crate::core::zone::Zone;
use crate::core::zone::ZoneBuckets;
use crate::interfaces::BlobStore;
use crate::interfaces::BlobStoreError;
use crate::interfaces::RelationalSink;
use crate::runtime::aggregate::AggregateError;
use crate::runtime::aggregate::AggregateSpec;
use crate::runtime::aggregate::Aggregation;
use crate::runtime::aggregate::group_by;
use crate::runtime::aggregate::left_join;
use crate::runtime::audit::OperationKind;
use crate::runtime::audit::PipelineAuditEvent;
use crate::runtime::audit::PipelineAuditEventParams;
use crate::runtime::audit::PipelineAuditSink;
use crate::runtime::catalog::MetadataCatalog;
use crate::runtime::governance::GovernanceError;
use crate::runtime::governance::GovernanceStore;
use crate::runtime::lineage::LineageGraph;

// ============================================================================
// SECTION: Views
// ============================================================================

/// Vehicle columns compared for the predominant vehicle.
const VEHICLE_COLUMNS: [&str; 4] = ["cars", "motorcycles", "trucks", "buses"];

/// Facility attributes that identify a parking in the variability view.
const PARKING_KEYS: [&str; 6] =
    ["parking_id", "name", "address", "latitude", "longitude", "total_capacity"];

/// Analytic views published to the access zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessView {
    /// Traffic volume and speed by hour and congestion level.
    CongestionByHour,
    /// Bike-share route usage by user type.
    RutasUsers,
    /// Parking rotation joined with facility data.
    ParkingsUnidos,
    /// Occupancy variability per parking facility.
    ParkingsVisualizaciones,
}

impl AccessView {
    /// All views in build order.
    pub const ALL: [Self; 4] = [
        Self::CongestionByHour,
        Self::RutasUsers,
        Self::ParkingsUnidos,
        Self::ParkingsVisualizaciones,
    ];

    /// Returns the view name, also used as the catalog dataset name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CongestionByHour => "congestion_by_hour",
            Self::RutasUsers => "rutas_users",
            Self::ParkingsUnidos => "parkings_unidos",
            Self::ParkingsVisualizaciones => "parkings_visualizaciones",
        }
    }

    /// Parses a view name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|view| view.as_str() == name)
    }

    /// Returns the access-zone object key.
    #[must_use]
    pub fn target_key(self) -> String {
        format!("analytics/{}.parquet", self.as_str())
    }

    /// Returns the relational sink table, for views loaded into SQL.
    #[must_use]
    pub const fn sink_table(self) -> Option<&'static str> {
        match self {
            Self::CongestionByHour => None,
            Self::RutasUsers => Some("rutas_users"),
            Self::ParkingsUnidos => Some("parkings_unidos"),
            Self::ParkingsVisualizaciones => Some("parkings_visualizaciones"),
        }
    }

    /// Returns the transformation note recorded on the lineage edge.
    #[must_use]
    pub const fn transformation(self) -> &'static str {
        match self {
            Self::CongestionByHour => "Congestion summary by hour",
            Self::RutasUsers => "Popular routes by user type",
            Self::ParkingsUnidos => "Cleaned parking rotation joined with facility data",
            Self::ParkingsVisualizaciones => "Occupancy variability per parking facility",
        }
    }

    /// Returns the catalog description of the view.
    #[must_use]
    pub fn descriptor(self) -> DatasetDescriptor {
        let (description, purpose, target_users) = match self {
            Self::CongestionByHour => (
                "Congestion summary by hour",
                "Traffic analysis and reporting",
                "Traffic analysts, city planners",
            ),
            Self::RutasUsers => (
                "Route usage by user type",
                "Traffic analysis and reporting",
                "Traffic analysts, city planners",
            ),
            Self::ParkingsUnidos => (
                "Cleaned public parking data joined with locations",
                "Visualization and analysis for citizens",
                "Citizens and neighbourhood associations",
            ),
            Self::ParkingsVisualizaciones => (
                "Occupancy averages and variability per public parking",
                "Visualization and analysis for citizens",
                "Citizens and neighbourhood associations",
            ),
        };
        DatasetDescriptor {
            description: description.to_string(),
            purpose: purpose.to_string(),
            refresh_frequency: "Daily".to_string(),
            target_users: target_users.to_string(),
        }
    }
}

impl fmt::Display for AccessView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-zone keys read by the builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessInputs {
    /// Normalized hourly traffic.
    pub traffic: String,
    /// Normalized bike-share trips.
    pub bike_share: String,
    /// Normalized parking rotation.
    pub parking_rotation: String,
    /// Normalized parking facility data.
    pub parking_info: String,
}

impl Default for AccessInputs {
    fn default() -> Self {
        Self {
            traffic: "traf/trafico.parquet".to_string(),
            bike_share: "data/bicimad.parquet".to_string(),
            parking_rotation: "invent/parkings.parquet".to_string(),
            parking_info: "apar/aparcamientos.parquet".to_string(),
        }
    }
}

impl AccessInputs {
    /// Returns the process-zone keys a view reads.
    #[must_use]
    pub fn for_view(&self, view: AccessView) -> Vec<&str> {
        match view {
            AccessView::CongestionByHour => vec![self.traffic.as_str()],
            AccessView::RutasUsers => vec![self.bike_share.as_str()],
            AccessView::ParkingsUnidos | AccessView::ParkingsVisualizaciones => {
                vec![self.parking_rotation.as_str(), self.parking_info.as_str()]
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort an access-zone build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// An input object does not exist.
    #[error("input not found: {0}")]
    NotFound(String),
    /// Aggregation or joining failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    /// Decoding or encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The blob store failed.
    #[error(transparent)]
    Store(BlobStoreError),
    /// A governance record could not be written.
    #[error(transparent)]
    Governance(#[from] GovernanceError),
}

impl AccessError {
    /// Returns the error category label used in audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Aggregate(_) => "schema",
            Self::Codec(_) => "codec",
            Self::Store(_) => "store",
            Self::Governance(_) => "governance",
        }
    }
}

impl From<BlobStoreError> for AccessError {
    fn from(err: BlobStoreError) -> Self {
        if err.is_not_found() { Self::NotFound(err.to_string()) } else { Self::Store(err) }
    }
}

impl From<TableError> for AccessError {
    fn from(err: TableError) -> Self {
        Self::Aggregate(AggregateError::Table(err))
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Sums traffic by hour and congestion level and names the predominant vehicle.
///
/// # Errors
///
/// Returns [`AccessError`] when a required column is missing or not numeric.
pub fn congestion_by_hour(traffic: &Table) -> Result<Table, AccessError> {
    let mut aggregates: Vec<AggregateSpec> =
        ["total_vehicles", "cars", "motorcycles", "trucks", "buses"]
            .into_iter()
            .map(|column| AggregateSpec::same(column, Aggregation::Sum))
            .collect();
    aggregates.push(AggregateSpec::same("avg_speed_kmh", Aggregation::Mean));
    let mut summary = group_by(traffic, &["hour", "congestion_level"], &aggregates)?;

    let vehicles =
        VEHICLE_COLUMNS.iter().map(|name| summary.require(name)).collect::<Result<Vec<_>, _>>()?;
    let predominant: Vec<Option<&str>> = (0 .. summary.row_count())
        .map(|row| {
            let mut best: Option<(&str, f64)> = None;
            for (name, column) in VEHICLE_COLUMNS.into_iter().zip(&vehicles) {
                if let Some(value) = column.data.numeric(row)
                    && best.is_none_or(|(_, top)| value > top)
                {
                    best = Some((name, value));
                }
            }
            best.map(|(name, _)| name)
        })
        .collect();
    summary.push_column(Column::utf8("predominant_vehicle", predominant))?;
    Ok(summary)
}

/// Summarizes bike-share trips per route and user type.
///
/// # Errors
///
/// Returns [`AccessError`] when a required column is missing or not numeric.
pub fn rutas_users(trips: &Table) -> Result<Table, AccessError> {
    Ok(group_by(
        trips,
        &["station_origin_id", "station_dest_id", "user_type"],
        &[
            AggregateSpec::new("total_viajes", "user_id", Aggregation::Count),
            AggregateSpec::new("avg_duration_seconds", "duration_seconds", Aggregation::Mean),
            AggregateSpec::new("avg_distance_km", "distance_km", Aggregation::Mean),
            AggregateSpec::new("total_users", "user_id", Aggregation::NUnique),
        ],
    )?)
}

/// Joins complete rotation rows with complete facility rows on `parking_id`.
///
/// # Errors
///
/// Returns [`AccessError`] when either table lacks `parking_id`.
pub fn parkings_unidos(rotation: &Table, info: &Table) -> Result<Table, AccessError> {
    Ok(left_join(&rotation.drop_nulls(), &info.drop_nulls(), "parking_id")?)
}

/// Computes occupancy averages and variability per parking facility.
///
/// `hour_variability` is the mean over hours of the per-hour sample standard
/// deviation of `occupancy_pct`; `weekday_variability` is the same per
/// weekday.
///
/// # Errors
///
/// Returns [`AccessError`] when a required column is missing or not numeric.
pub fn parkings_visualizaciones(joined: &Table) -> Result<Table, AccessError> {
    let base = group_by(
        joined,
        &PARKING_KEYS,
        &[
            AggregateSpec::new("avg_occupancy_pct", "occupancy_pct", Aggregation::Mean),
            AggregateSpec::new("std_occupancy_pct", "occupancy_pct", Aggregation::Std),
        ],
    )?;
    let hourly = variability(joined, "hour", "hour_variability")?;
    let daily = variability(joined, "weekday", "weekday_variability")?;
    let merged = left_join(&base, &hourly, "parking_id")?;
    Ok(left_join(&merged, &daily, "parking_id")?)
}

/// Mean per parking of the per-bucket sample std of occupancy.
fn variability(joined: &Table, bucket: &str, output: &str) -> Result<Table, AccessError> {
    let per_bucket = group_by(
        joined,
        &["parking_id", bucket],
        &[AggregateSpec::new("bucket_std", "occupancy_pct", Aggregation::Std)],
    )?;
    Ok(group_by(
        &per_bucket,
        &["parking_id"],
        &[AggregateSpec::new(output, "bucket_std", Aggregation::Mean)],
    )?)
}

// ============================================================================
// SECTION: Publication
// ============================================================================

/// Result of publishing one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessReport {
    /// Built view.
    pub view: AccessView,
    /// Written dataset.
    pub dataset: DatasetRecord,
    /// Process-zone inputs.
    pub inputs: Vec<ObjectRef>,
    /// Key of the lineage edge.
    pub lineage_key: String,
    /// Key of the catalog record.
    pub metadata_key: String,
    /// Relational sink load, when a sink is configured for the view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<SinkLoad>,
}

impl AccessReport {
    /// Returns the sink error when the view was published but not loaded.
    #[must_use]
    pub fn sink_error(&self) -> Option<&str> {
        match &self.sink {
            Some(SinkLoad::Failed {
                error,
            }) => Some(error.as_str()),
            _ => None,
        }
    }
}

/// Outcome of loading a published view into the relational sink.
///
/// The load runs after the view, its lineage edge and its catalog record are
/// written, so a failed load never unpublishes the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SinkLoad {
    /// Rows written to the sink table.
    Loaded {
        /// Row count.
        rows: usize,
    },
    /// The sink rejected the load.
    Failed {
        /// Sink error message.
        error: String,
    },
}

/// Builds and publishes access-zone views.
pub struct AccessBuilder {
    /// Dataset storage.
    store: Arc<dyn BlobStore>,
    /// Governance record storage.
    governance: Arc<GovernanceStore>,
    /// Lineage edge log.
    lineage: LineageGraph,
    /// Metadata catalog.
    catalog: MetadataCatalog,
    /// Audit sink.
    audit: Arc<dyn PipelineAuditSink>,
    /// Zone bucket names.
    buckets: ZoneBuckets,
    /// Process-zone input keys.
    inputs: AccessInputs,
    /// Optional relational sink.
    sink: Option<Arc<dyn RelationalSink>>,
}

impl AccessBuilder {
    /// Creates a builder sharing `governance` with other components.
    #[must_use]
    pub fn new(
        store: Arc<dyn BlobStore>,
        governance: Arc<GovernanceStore>,
        audit: Arc<dyn PipelineAuditSink>,
        buckets: ZoneBuckets,
        inputs: AccessInputs,
    ) -> Self {
        Self {
            store,
            lineage: LineageGraph::new(Arc::clone(&governance)),
            catalog: MetadataCatalog::new(Arc::clone(&governance)),
            governance,
            audit,
            buckets,
            inputs,
            sink: None,
        }
    }

    /// Loads sink-backed views into `sink` after publication.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RelationalSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds and publishes every view; failures are isolated per view.
    #[must_use]
    pub fn build_all(&self) -> Vec<(AccessView, Result<AccessReport, AccessError>)> {
        AccessView::ALL.into_iter().map(|view| (view, self.build(view))).collect()
    }

    /// Builds and publishes one view and audits the outcome.
    ///
    /// A sink failure does not fail the build; it is carried in
    /// [`AccessReport::sink`] and audited as its own event.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError`] when an input is missing, the build fails, or
    /// a zone or governance write fails.
    pub fn build(&self, view: AccessView) -> Result<AccessReport, AccessError> {
        let inputs: Vec<ObjectRef> = self
            .inputs
            .for_view(view)
            .into_iter()
            .map(|key| ObjectRef::new(self.buckets.process.clone(), key))
            .collect();
        let target = ObjectRef::new(self.buckets.access.clone(), view.target_key());
        let result = self.publish(view, &inputs, &target);
        let failure = result.as_ref().err().map(|err| (err.kind(), err.to_string()));
        self.audit.record(&PipelineAuditEvent::new(PipelineAuditEventParams {
            operation: OperationKind::Access,
            stage: view.to_string(),
            source: inputs.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            target: target.to_string(),
            rows_affected: result.as_ref().ok().map(|report| report.dataset.row_count),
            failure,
        }));
        result
    }

    /// Reads inputs, builds the view and writes every output.
    fn publish(
        &self,
        view: AccessView,
        inputs: &[ObjectRef],
        target: &ObjectRef,
    ) -> Result<AccessReport, AccessError> {
        let tables = inputs.iter().map(|input| self.read(input)).collect::<Result<Vec<_>, _>>()?;
        let table = match (view, tables.as_slice()) {
            (AccessView::CongestionByHour, [traffic]) => congestion_by_hour(traffic)?,
            (AccessView::RutasUsers, [trips]) => rutas_users(trips)?,
            (AccessView::ParkingsUnidos, [rotation, info]) => parkings_unidos(rotation, info)?,
            (AccessView::ParkingsVisualizaciones, [rotation, info]) => {
                parkings_visualizaciones(&parkings_unidos(rotation, info)?)?
            }
            _ => return Err(AccessError::NotFound(format!("inputs for view `{view}`"))),
        };

        let encoded = encode_parquet(&table)?;
        self.store.put(&target.bucket, &target.object, &encoded)?;
        let now = self.governance.clock().now();
        let edge =
            LineageEdge::from_sources(inputs.to_vec(), target.clone(), view.transformation(), now);
        let lineage_key = self.lineage.append_edge(&edge)?;
        let record = MetadataRecord::published(
            DatasetName::new(view.as_str()),
            &view.descriptor(),
            DatasetFormat::Parquet.as_str(),
            target,
            now,
        );
        let metadata_key = self.catalog.publish(&record)?;
        let sink = match (&self.sink, view.sink_table()) {
            (Some(sink), Some(table_name)) => {
                Some(self.load_sink(sink.as_ref(), table_name, target, &table))
            }
            _ => None,
        };

        Ok(AccessReport {
            view,
            dataset: DatasetRecord {
                zone: Zone::Access,
                object: target.clone(),
                row_count: table.row_count(),
                format: DatasetFormat::Parquet,
                digest: ContentDigest::of_bytes(&encoded),
            },
            inputs: inputs.to_vec(),
            lineage_key,
            metadata_key,
            sink,
        })
    }

    /// Loads a published view into the sink and audits the load.
    fn load_sink(
        &self,
        sink: &dyn RelationalSink,
        table_name: &str,
        source: &ObjectRef,
        table: &Table,
    ) -> SinkLoad {
        let result = sink.load_replace(table_name, table);
        self.audit.record(&PipelineAuditEvent::new(PipelineAuditEventParams {
            operation: OperationKind::Sink,
            stage: table_name.to_string(),
            source: source.to_string(),
            target: format!("sink/{table_name}"),
            rows_affected: result.as_ref().ok().copied(),
            failure: result.as_ref().err().map(|err| ("sink", err.to_string())),
        }));
        match result {
            Ok(rows) => SinkLoad::Loaded {
                rows,
            },
            Err(err) => SinkLoad::Failed {
                error: err.to_string(),
            },
        }
    }

    /// Reads and decodes a Parquet input.
    fn read(&self, input: &ObjectRef) -> Result<Table, AccessError> {
        let bytes = self.store.get(&input.bucket, &input.object)?;
        Ok(decode_parquet(&bytes)?)
    }
}

/// Reads a published access-zone view back as a table.
///
/// # Errors
///
/// Returns [`AccessError`] when the view is missing or unreadable.
pub fn read_view(
    store: &dyn BlobStore,
    buckets: &ZoneBuckets,
    view: AccessView,
) -> Result<Table, AccessError> {
    let bytes = store.get(&buckets.access, &view.target_key())?;
    Ok(decode_parquet(&bytes)?)
}
