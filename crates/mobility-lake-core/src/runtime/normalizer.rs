// crates/mobility-lake-core/src/runtime/normalizer.rs
// ============================================================================
// Module: Schema Normalizer
// Description: Rule-driven rename, retype and derive pass for raw tables.
// Purpose: Turn raw source shapes into one canonical schema per dataset kind.
// Dependencies: crate::core, thiserror, time
// ============================================================================

//! ## Overview
//! Each dataset kind has one [`NormalizationRules`] value. [`Normalizer`]
//! applies the rules in a fixed order: rename, composite timestamp,
//! timestamp parsing, categorical remapping, temporal derivation, integer
//! coercion, float coercion, projection. The pass is pure; the same input
//! always produces the same table.
//!
//! Coercion never skips rows. A value that cannot be coerced fails the
//! whole table with a [`SchemaError`] naming the column and the value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::PrimitiveDateTime;

use crate::core::dataset::DatasetKind;
use crate::core::table::Column;
use crate::core::table::ColumnData;
use crate::core::table::DataType;
use crate::core::table::Table;
use crate::core::table::TableError;
use crate::core::table::Value;
use crate::core::time::format_datetime;
use crate::core::time::parse_datetime;
use crate::core::time::weekday_index;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Text cells read as null during coercion (compared case-insensitively).
const NULL_TOKENS: [&str; 5] = ["nan", "null", "none", "na", "n/a"];

/// Integer columns derived from the primary timestamp.
pub const TEMPORAL_PARTS: [&str; 5] = ["year", "month", "day", "hour", "weekday"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort normalization of a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A column named by the rules is absent.
    #[error("missing column `{0}`")]
    MissingColumn(String),
    /// A cell cannot be represented in the target type.
    #[error("column `{column}`: cannot coerce `{value}` to {target}")]
    Uncoercible {
        /// Column name.
        column: String,
        /// Offending cell text.
        value: String,
        /// Requested type.
        target: DataType,
    },
    /// A cell is not a recognised date-time.
    #[error("column `{column}`: invalid timestamp `{value}`")]
    InvalidTimestamp {
        /// Column name.
        column: String,
        /// Offending cell text.
        value: String,
    },
    /// Reshaping the table failed.
    #[error(transparent)]
    Table(#[from] TableError),
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Lower-case remapping of an enumerated text column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalRule {
    /// Column to remap.
    pub column: String,
    /// Lower-case source value to canonical value.
    pub mapping: Vec<(String, String)>,
}

/// Date and hour columns joined into one timestamp column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeTimestamp {
    /// Column holding `YYYY-MM-DD` dates.
    pub date_column: String,
    /// Column holding the hour of day.
    pub hour_column: String,
    /// Column receiving `YYYY-MM-DD HH:00:00` text.
    pub target: String,
}

/// Normalization rules for one dataset kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationRules {
    /// Source name to canonical name.
    pub renames: Vec<(String, String)>,
    /// Optional composite timestamp construction.
    pub composite_timestamp: Option<CompositeTimestamp>,
    /// Columns parsed as date-times.
    pub timestamps: Vec<String>,
    /// Categorical remappings.
    pub categoricals: Vec<CategoricalRule>,
    /// Timestamp column feeding the derived temporal parts.
    pub derive_from: Option<String>,
    /// Columns coerced to nullable integers.
    pub integers: Vec<String>,
    /// Columns coerced to nullable floats.
    pub floats: Vec<String>,
    /// Final column subset and order.
    pub projection: Option<Vec<String>>,
}

impl NormalizationRules {
    /// Returns the built-in rules for a dataset kind.
    #[must_use]
    pub fn for_kind(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::BikeShareUsage => bike_share_rules(),
            DatasetKind::ParkingInfo => parking_info_rules(),
            DatasetKind::ParkingRotation => parking_rotation_rules(),
            DatasetKind::TrafficHourly => traffic_rules(),
            DatasetKind::CitizenReports => citizen_report_rules(),
        }
    }
}

/// Bike-share trip usage rules.
fn bike_share_rules() -> NormalizationRules {
    NormalizationRules {
        renames: pairs(&[
            ("usuario_id", "user_id"),
            ("tipo_usuario", "user_type"),
            ("estacion_origen", "station_origin_id"),
            ("estacion_destino", "station_dest_id"),
            ("fecha_hora_inicio", "start_time"),
            ("fecha_hora_fin", "end_time"),
            ("duracion_segundos", "duration_seconds"),
            ("distancia_km", "distance_km"),
            ("calorias_estimadas", "estimated_calories"),
            ("co2_evitado_gramos", "co2_saved_grams"),
        ]),
        timestamps: names(&["start_time", "end_time"]),
        categoricals: vec![CategoricalRule {
            column: "user_type".to_string(),
            mapping: pairs(&[("anual", "annual"), ("ocasional", "occasional")]),
        }],
        derive_from: Some("start_time".to_string()),
        integers: names(&[
            "id",
            "user_id",
            "station_origin_id",
            "station_dest_id",
            "duration_seconds",
            "estimated_calories",
            "co2_saved_grams",
        ]),
        floats: names(&["distance_km"]),
        ..NormalizationRules::default()
    }
}

/// Parking facility reference rules.
fn parking_info_rules() -> NormalizationRules {
    NormalizationRules {
        renames: pairs(&[
            ("aparcamiento_id", "parking_id"),
            ("nombre", "name"),
            ("direccion", "address"),
            ("capacidad_total", "total_capacity"),
            ("plazas_movilidad_reducida", "reduced_mobility_spaces"),
            ("plazas_vehiculos_electricos", "ev_spaces"),
            ("tarifa_hora_euros", "hourly_rate_eur"),
            ("horario", "schedule"),
            ("latitud", "latitude"),
            ("longitud", "longitude"),
        ]),
        categoricals: vec![CategoricalRule {
            column: "schedule".to_string(),
            mapping: pairs(&[("24 horas", "24h")]),
        }],
        integers: names(&["parking_id", "total_capacity", "reduced_mobility_spaces", "ev_spaces"]),
        floats: names(&["hourly_rate_eur", "latitude", "longitude"]),
        ..NormalizationRules::default()
    }
}

/// Hourly parking rotation rules.
fn parking_rotation_rules() -> NormalizationRules {
    NormalizationRules {
        renames: pairs(&[
            ("aparcamiento_id", "parking_id"),
            ("fecha", "date"),
            ("hora", "hour"),
            ("plazas_ocupadas", "occupied_spaces"),
            ("plazas_libres", "free_spaces"),
            ("porcentaje_ocupacion", "occupancy_pct"),
        ]),
        composite_timestamp: Some(CompositeTimestamp {
            date_column: "date".to_string(),
            hour_column: "hour".to_string(),
            target: "timestamp".to_string(),
        }),
        timestamps: names(&["timestamp"]),
        derive_from: Some("timestamp".to_string()),
        integers: names(&["parking_id", "occupied_spaces", "free_spaces"]),
        floats: names(&["occupancy_pct"]),
        projection: Some(names(&[
            "parking_id",
            "timestamp",
            "occupied_spaces",
            "free_spaces",
            "occupancy_pct",
            "year",
            "month",
            "day",
            "hour",
            "weekday",
        ])),
        ..NormalizationRules::default()
    }
}

/// Hourly traffic sensor rules.
fn traffic_rules() -> NormalizationRules {
    NormalizationRules {
        renames: pairs(&[
            ("fecha_hora", "timestamp"),
            ("total_vehiculos", "total_vehicles"),
            ("coches", "cars"),
            ("motos", "motorcycles"),
            ("camiones", "trucks"),
            ("velocidad_media_kmh", "avg_speed_kmh"),
            ("nivel_congestion", "congestion_level"),
        ]),
        timestamps: names(&["timestamp"]),
        categoricals: vec![CategoricalRule {
            column: "congestion_level".to_string(),
            mapping: pairs(&[("baja", "low"), ("moderada", "moderate"), ("alta", "high")]),
        }],
        derive_from: Some("timestamp".to_string()),
        integers: names(&["sensor_id", "total_vehicles", "cars", "motorcycles", "trucks", "buses"]),
        floats: names(&["avg_speed_kmh"]),
        ..NormalizationRules::default()
    }
}

/// Citizen report rules.
fn citizen_report_rules() -> NormalizationRules {
    NormalizationRules {
        timestamps: names(&["fecha_reporte"]),
        derive_from: Some("fecha_reporte".to_string()),
        integers: names(&["id"]),
        ..NormalizationRules::default()
    }
}

/// Converts literal pairs to owned pairs.
fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(from, to)| ((*from).to_string(), (*to).to_string())).collect()
}

/// Converts literal names to owned names.
fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|name| (*name).to_string()).collect()
}

// ============================================================================
// SECTION: Normalizer
// ============================================================================

/// Applies one rule set to raw tables.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Rules applied by this normalizer.
    rules: NormalizationRules,
}

impl Normalizer {
    /// Creates a normalizer from explicit rules.
    #[must_use]
    pub const fn new(rules: NormalizationRules) -> Self {
        Self {
            rules,
        }
    }

    /// Creates the normalizer for a dataset kind.
    #[must_use]
    pub fn for_kind(kind: DatasetKind) -> Self {
        Self::new(NormalizationRules::for_kind(kind))
    }

    /// Returns the rules.
    #[must_use]
    pub const fn rules(&self) -> &NormalizationRules {
        &self.rules
    }

    /// Normalizes a raw table.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a declared column is missing or a value
    /// cannot be coerced.
    pub fn apply(&self, raw: &Table) -> Result<Table, SchemaError> {
        let mut table = raw.clone();
        for (from, to) in &self.rules.renames {
            table.rename(from, to)?;
        }
        if let Some(composite) = &self.rules.composite_timestamp {
            build_composite_timestamp(&mut table, composite)?;
        }
        for column in &self.rules.timestamps {
            coerce_column(&mut table, column, coerce_timestamp)?;
        }
        for rule in &self.rules.categoricals {
            remap_categorical(&mut table, rule)?;
        }
        if let Some(source) = &self.rules.derive_from {
            derive_temporal_parts(&mut table, source)?;
        }
        for column in &self.rules.integers {
            coerce_column(&mut table, column, coerce_integer)?;
        }
        for column in &self.rules.floats {
            coerce_column(&mut table, column, coerce_float)?;
        }
        if let Some(projection) = &self.rules.projection {
            let names: Vec<&str> = projection.iter().map(String::as_str).collect();
            table = table.project(&names)?;
        }
        Ok(table)
    }
}

/// Normalizes a raw table with the built-in rules of a dataset kind.
///
/// # Errors
///
/// Returns [`SchemaError`] when normalization fails.
pub fn normalize(raw: &Table, kind: DatasetKind) -> Result<Table, SchemaError> {
    Normalizer::for_kind(kind).apply(raw)
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Signature of a per-column coercion.
type Coercion = fn(&str, &ColumnData) -> Result<ColumnData, SchemaError>;

/// Replaces a column with its coerced form.
fn coerce_column(table: &mut Table, name: &str, coercion: Coercion) -> Result<(), SchemaError> {
    let column = table.column(name).ok_or_else(|| SchemaError::MissingColumn(name.to_string()))?;
    let data = coercion(name, &column.data)?;
    table.set_column(Column::new(name, data))?;
    Ok(())
}

/// Builds the composite `date HH:00:00` column.
fn build_composite_timestamp(
    table: &mut Table,
    composite: &CompositeTimestamp,
) -> Result<(), SchemaError> {
    let date = table
        .column(&composite.date_column)
        .ok_or_else(|| SchemaError::MissingColumn(composite.date_column.clone()))?;
    let hour = table
        .column(&composite.hour_column)
        .ok_or_else(|| SchemaError::MissingColumn(composite.hour_column.clone()))?;
    let ColumnData::Int64(hours) = coerce_integer(&composite.hour_column, &hour.data)? else {
        return Err(SchemaError::MissingColumn(composite.hour_column.clone()));
    };
    let mut values = Vec::with_capacity(table.row_count());
    for (row, hour) in hours.iter().enumerate() {
        let cell = match (cell_text(&date.data, row), hour) {
            (Some(day), Some(hour)) => Some(format!("{} {hour:02}:00:00", day.trim())),
            _ => None,
        };
        values.push(cell);
    }
    table.set_column(Column::utf8(composite.target.clone(), values))?;
    Ok(())
}

/// Lower-cases and remaps a categorical column.
fn remap_categorical(table: &mut Table, rule: &CategoricalRule) -> Result<(), SchemaError> {
    let column =
        table.column(&rule.column).ok_or_else(|| SchemaError::MissingColumn(rule.column.clone()))?;
    let ColumnData::Utf8(values) = &column.data else {
        return Err(SchemaError::Uncoercible {
            column: rule.column.clone(),
            value: column.data_type().to_string(),
            target: DataType::Utf8,
        });
    };
    let remapped = values
        .iter()
        .map(|value| {
            value.as_ref().map(|text| {
                let lowered = text.trim().to_lowercase();
                rule.mapping
                    .iter()
                    .find(|(from, _)| *from == lowered)
                    .map_or(lowered, |(_, to)| to.clone())
            })
        })
        .collect();
    table.set_column(Column::new(rule.column.clone(), ColumnData::Utf8(remapped)))?;
    Ok(())
}

/// Adds year, month, day, hour and weekday columns from a timestamp column.
fn derive_temporal_parts(table: &mut Table, source: &str) -> Result<(), SchemaError> {
    let column =
        table.column(source).ok_or_else(|| SchemaError::MissingColumn(source.to_string()))?;
    let ColumnData::Timestamp(moments) = coerce_timestamp(source, &column.data)? else {
        return Err(SchemaError::MissingColumn(source.to_string()));
    };
    let part = |extract: fn(&PrimitiveDateTime) -> i64| -> Vec<Option<i64>> {
        moments.iter().map(|moment| moment.as_ref().map(extract)).collect()
    };
    let derived = [
        part(|moment| i64::from(moment.year())),
        part(|moment| i64::from(u8::from(moment.month()))),
        part(|moment| i64::from(moment.day())),
        part(|moment| i64::from(moment.hour())),
        part(|moment| weekday_index(moment.date())),
    ];
    for (name, values) in TEMPORAL_PARTS.iter().zip(derived) {
        table.set_column(Column::int64(*name, values))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Coercions
// ============================================================================

/// Coerces a column to date-times.
fn coerce_timestamp(name: &str, data: &ColumnData) -> Result<ColumnData, SchemaError> {
    match data {
        ColumnData::Timestamp(_) => Ok(data.clone()),
        ColumnData::Utf8(values) => values
            .iter()
            .map(|value| match null_or_text(value.as_deref()) {
                None => Ok(None),
                Some(text) => parse_datetime(text).map(Some).ok_or_else(|| {
                    SchemaError::InvalidTimestamp {
                        column: name.to_string(),
                        value: text.to_string(),
                    }
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnData::Timestamp),
        other => Err(uncoercible(name, other.data_type().as_str(), DataType::Timestamp)),
    }
}

/// Coerces a column to nullable integers.
fn coerce_integer(name: &str, data: &ColumnData) -> Result<ColumnData, SchemaError> {
    match data {
        ColumnData::Int64(_) => Ok(data.clone()),
        ColumnData::Utf8(values) => values
            .iter()
            .map(|value| match null_or_text(value.as_deref()) {
                None => Ok(None),
                Some(text) => parse_integer(text)
                    .map(Some)
                    .ok_or_else(|| uncoercible(name, text, DataType::Int64)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnData::Int64),
        ColumnData::Float64(values) => values
            .iter()
            .map(|value| match value {
                None => Ok(None),
                Some(number) => integral(*number)
                    .map(Some)
                    .ok_or_else(|| uncoercible(name, &number.to_string(), DataType::Int64)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnData::Int64),
        ColumnData::Boolean(values) => {
            Ok(ColumnData::Int64(values.iter().map(|value| value.map(i64::from)).collect()))
        }
        ColumnData::Timestamp(_) => Err(uncoercible(name, "timestamp", DataType::Int64)),
    }
}

/// Coerces a column to nullable floats.
fn coerce_float(name: &str, data: &ColumnData) -> Result<ColumnData, SchemaError> {
    match data {
        ColumnData::Float64(_) => Ok(data.clone()),
        ColumnData::Utf8(values) => values
            .iter()
            .map(|value| match null_or_text(value.as_deref()) {
                None => Ok(None),
                Some(text) => text
                    .parse::<f64>()
                    .ok()
                    .filter(|number| number.is_finite())
                    .map(Some)
                    .ok_or_else(|| uncoercible(name, text, DataType::Float64)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnData::Float64),
        ColumnData::Int64(_) => Ok(ColumnData::Float64(
            (0 .. data.len()).map(|row| data.numeric(row)).collect(),
        )),
        other => Err(uncoercible(name, other.data_type().as_str(), DataType::Float64)),
    }
}

/// Returns trimmed text, or `None` for blank and null-token cells.
fn null_or_text(value: Option<&str>) -> Option<&str> {
    let text = value?.trim();
    if text.is_empty() || NULL_TOKENS.iter().any(|token| text.eq_ignore_ascii_case(token)) {
        return None;
    }
    Some(text)
}

/// Parses `"3"` or `"3.0"` as an integer.
fn parse_integer(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().or_else(|| text.parse::<f64>().ok().and_then(integral))
}

/// Converts an integral, in-range float to an integer.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "Range and fraction are checked before the cast."
)]
fn integral(number: f64) -> Option<i64> {
    let in_range = number >= i64::MIN as f64 && number < i64::MAX as f64;
    (number.is_finite() && number.fract() == 0.0 && in_range).then_some(number as i64)
}

/// Renders a cell as text for composite keys.
fn cell_text(data: &ColumnData, row: usize) -> Option<String> {
    match data.value(row) {
        Value::Null => None,
        Value::Utf8(text) => null_or_text(Some(&text)).map(str::to_string),
        Value::Int64(number) => Some(number.to_string()),
        Value::Float64(number) => Some(number.to_string()),
        Value::Boolean(flag) => Some(flag.to_string()),
        Value::Timestamp(moment) => Some(format_datetime(moment).chars().take(10).collect()),
    }
}

/// Builds an uncoercible-value error.
fn uncoercible(column: &str, value: &str, target: DataType) -> SchemaError {
    SchemaError::Uncoercible {
        column: column.to_string(),
        value: value.to_string(),
        target,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn integers_accept_integral_floats() {
        assert_eq!(parse_integer("3"), Some(3));
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("3.5"), None);
        assert_eq!(parse_integer("abc"), None);
    }

    #[test]
    fn null_tokens_are_case_insensitive() {
        assert_eq!(null_or_text(Some(" NaN ")), None);
        assert_eq!(null_or_text(Some("")), None);
        assert_eq!(null_or_text(Some(" 7 ")), Some("7"));
    }

    #[test]
    fn float_columns_widen_integers() {
        let data = ColumnData::Int64(vec![Some(2), None]);
        assert_eq!(coerce_float("x", &data).unwrap(), ColumnData::Float64(vec![Some(2.0), None]));
    }
}
