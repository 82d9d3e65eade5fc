// crates/mobility-lake-core/src/runtime/aggregate.rs
// ============================================================================
// Module: Table Aggregation
// Description: Group-by aggregation and left joins over tables.
// Purpose: Provide the relational primitives behind the access-zone views.
// Dependencies: crate::core::table, thiserror
// ============================================================================

//! ## Overview
//! [`group_by`] groups rows on key columns and evaluates aggregations per
//! group. Rows whose key holds a null are dropped and groups are emitted in
//! ascending key order. [`left_join`] keeps every left row, matching right
//! rows in their original order.
//!
//! # Invariants
//! - Means and standard deviations ignore nulls; an empty group yields null.
//! - Standard deviation is the sample estimator (n - 1 denominator).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::table::Column;
use crate::core::table::ColumnData;
use crate::core::table::DataType;
use crate::core::table::KeyValue;
use crate::core::table::Table;
use crate::core::table::TableError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Aggregation and join errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// Reshaping failed or a column is missing.
    #[error(transparent)]
    Table(#[from] TableError),
    /// A numeric aggregation targeted a non-numeric column.
    #[error("column `{column}` is {actual}, expected a numeric column")]
    NotNumeric {
        /// Column name.
        column: String,
        /// Actual column type.
        actual: DataType,
    },
}

// ============================================================================
// SECTION: Aggregations
// ============================================================================

/// Per-group reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Sum of non-null values; integer columns stay integers.
    Sum,
    /// Mean of non-null values.
    Mean,
    /// Sample standard deviation of non-null values.
    Std,
    /// Count of non-null values.
    Count,
    /// Count of distinct non-null values.
    NUnique,
}

/// One output column of a group-by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    /// Output column name.
    pub output: String,
    /// Input column name.
    pub input: String,
    /// Reduction applied to the input.
    pub aggregation: Aggregation,
}

impl AggregateSpec {
    /// Creates an aggregation writing to `output`.
    #[must_use]
    pub fn new(
        output: impl Into<String>,
        input: impl Into<String>,
        aggregation: Aggregation,
    ) -> Self {
        Self {
            output: output.into(),
            input: input.into(),
            aggregation,
        }
    }

    /// Creates an aggregation whose output keeps the input name.
    #[must_use]
    pub fn same(column: &str, aggregation: Aggregation) -> Self {
        Self::new(column, column, aggregation)
    }
}

/// Groups `table` on `keys` and evaluates `aggregates` per group.
///
/// The result holds the key columns followed by one column per aggregate.
///
/// # Errors
///
/// Returns [`AggregateError`] when a column is missing or a numeric
/// aggregation targets a text column.
pub fn group_by(
    table: &Table,
    keys: &[&str],
    aggregates: &[AggregateSpec],
) -> Result<Table, AggregateError> {
    let key_columns =
        keys.iter().map(|name| table.require(name)).collect::<Result<Vec<_>, TableError>>()?;
    let key_data: Vec<&ColumnData> = key_columns.iter().map(|column| &column.data).collect();
    let groups = group_rows(table.row_count(), &key_data);

    let firsts: Vec<Option<usize>> = groups.values().map(|rows| rows.first().copied()).collect();
    let mut columns: Vec<Column> = key_columns
        .iter()
        .map(|column| Column::new(column.name.clone(), column.data.gather(&firsts)))
        .collect();
    let members: Vec<&Vec<usize>> = groups.values().collect();
    for spec in aggregates {
        let input = table.require(&spec.input)?;
        columns.push(Column::new(spec.output.clone(), reduce(input, spec.aggregation, &members)?));
    }
    Ok(Table::new(columns)?)
}

/// Groups row indices by key, dropping rows with a null key cell.
pub(crate) fn group_rows(
    row_count: usize,
    keys: &[&ColumnData],
) -> BTreeMap<Vec<KeyValue>, Vec<usize>> {
    let mut groups: BTreeMap<Vec<KeyValue>, Vec<usize>> = BTreeMap::new();
    for row in 0 .. row_count {
        let key: Vec<KeyValue> = keys.iter().map(|data| data.key(row)).collect();
        if key.iter().any(KeyValue::is_null) {
            continue;
        }
        groups.entry(key).or_default().push(row);
    }
    groups
}

/// Evaluates one aggregation over every group.
fn reduce(
    input: &Column,
    aggregation: Aggregation,
    groups: &[&Vec<usize>],
) -> Result<ColumnData, AggregateError> {
    let data = &input.data;
    let numeric = || -> Result<(), AggregateError> {
        match data.data_type() {
            DataType::Int64 | DataType::Float64 => Ok(()),
            actual => Err(AggregateError::NotNumeric {
                column: input.name.clone(),
                actual,
            }),
        }
    };
    let counted = |rows: &Vec<usize>| {
        i64::try_from(rows.iter().filter(|row| !data.is_null(**row)).count()).unwrap_or(i64::MAX)
    };
    Ok(match aggregation {
        Aggregation::Sum => {
            numeric()?;
            if let ColumnData::Int64(values) = data {
                ColumnData::Int64(
                    groups
                        .iter()
                        .map(|rows| {
                            let total = rows
                                .iter()
                                .filter_map(|row| values.get(*row).copied().flatten())
                                .fold(0_i64, i64::saturating_add);
                            Some(total)
                        })
                        .collect(),
                )
            } else {
                ColumnData::Float64(
                    groups
                        .iter()
                        .map(|rows| Some(rows.iter().filter_map(|row| data.numeric(*row)).sum()))
                        .collect(),
                )
            }
        }
        Aggregation::Mean => {
            numeric()?;
            ColumnData::Float64(groups.iter().map(|rows| mean(&values_of(data, rows))).collect())
        }
        Aggregation::Std => {
            numeric()?;
            ColumnData::Float64(
                groups.iter().map(|rows| sample_std(&values_of(data, rows))).collect(),
            )
        }
        Aggregation::Count => {
            ColumnData::Int64(groups.iter().map(|rows| Some(counted(rows))).collect())
        }
        Aggregation::NUnique => ColumnData::Int64(
            groups
                .iter()
                .map(|rows| {
                    let distinct: BTreeSet<KeyValue> = rows
                        .iter()
                        .map(|row| data.key(*row))
                        .filter(|key| !key.is_null())
                        .collect();
                    Some(i64::try_from(distinct.len()).unwrap_or(i64::MAX))
                })
                .collect(),
        ),
    })
}

/// Collects non-null numeric values of a group.
fn values_of(data: &ColumnData, rows: &[usize]) -> Vec<f64> {
    rows.iter().filter_map(|row| data.numeric(*row)).collect()
}

/// Arithmetic mean; `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Group sizes are far below 2^52.")]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation; `None` below two values.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Group sizes are far below 2^52.")]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let center = mean(values)?;
    let squares: f64 = values.iter().map(|value| (value - center).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

// ============================================================================
// SECTION: Joins
// ============================================================================

/// Suffix applied to overlapping left-side column names.
pub const LEFT_SUFFIX: &str = "_x";
/// Suffix applied to overlapping right-side column names.
pub const RIGHT_SUFFIX: &str = "_y";

/// Left-joins `right` onto `left` on the column `on`.
///
/// Output columns are the left columns followed by the right columns except
/// the join key. Names present on both sides get `_x` and `_y` suffixes.
/// Left rows without a match are kept once with nulls on the right side;
/// null keys never match.
///
/// # Errors
///
/// Returns [`AggregateError`] when the join column is missing on either side.
pub fn left_join(left: &Table, right: &Table, on: &str) -> Result<Table, AggregateError> {
    let left_key = &left.require(on)?.data;
    let right_key = &right.require(on)?.data;

    let mut index: BTreeMap<KeyValue, Vec<usize>> = BTreeMap::new();
    for row in 0 .. right.row_count() {
        let key = right_key.key(row);
        if !key.is_null() {
            index.entry(key).or_default().push(row);
        }
    }

    let mut left_rows: Vec<Option<usize>> = Vec::new();
    let mut right_rows: Vec<Option<usize>> = Vec::new();
    for row in 0 .. left.row_count() {
        let key = left_key.key(row);
        match index.get(&key).filter(|_| !key.is_null()) {
            Some(matches) => {
                for matched in matches {
                    left_rows.push(Some(row));
                    right_rows.push(Some(*matched));
                }
            }
            None => {
                left_rows.push(Some(row));
                right_rows.push(None);
            }
        }
    }

    let overlap: BTreeSet<&str> = left
        .column_names()
        .into_iter()
        .filter(|name| *name != on && right.has_column(name))
        .collect();
    let mut columns = Vec::with_capacity(left.column_count() + right.column_count());
    for column in left.columns() {
        let name = if overlap.contains(column.name.as_str()) {
            format!("{}{LEFT_SUFFIX}", column.name)
        } else {
            column.name.clone()
        };
        columns.push(Column::new(name, column.data.gather(&left_rows)));
    }
    for column in right.columns().iter().filter(|column| column.name != on) {
        let name = if overlap.contains(column.name.as_str()) {
            format!("{}{RIGHT_SUFFIX}", column.name)
        } else {
            column.name.clone()
        };
        columns.push(Column::new(name, column.data.gather(&right_rows)));
    }
    Ok(Table::new(columns)?)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::table::Value;

    fn trips() -> Table {
        Table::new(vec![
            Column::utf8(
                "user_type",
                vec![Some("annual"), Some("annual"), None, Some("occasional")],
            ),
            Column::int64("user_id", vec![Some(7), Some(7), Some(9), None]),
            Column::float64("distance_km", vec![Some(1.0), Some(3.0), Some(2.0), None]),
        ])
        .unwrap()
    }

    #[test]
    fn groups_skip_null_keys_and_sort() {
        let result = group_by(
            &trips(),
            &["user_type"],
            &[
                AggregateSpec::new("trips", "user_id", Aggregation::Count),
                AggregateSpec::new("users", "user_id", Aggregation::NUnique),
                AggregateSpec::new("avg_km", "distance_km", Aggregation::Mean),
                AggregateSpec::new("std_km", "distance_km", Aggregation::Std),
            ],
        )
        .unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.row(0)[0], Value::Utf8("annual".to_string()));
        assert_eq!(result.row(0)[1], Value::Int64(2));
        assert_eq!(result.row(0)[2], Value::Int64(1));
        assert_eq!(result.row(0)[3], Value::Float64(2.0));
        let std = result.column("std_km").unwrap().data.numeric(0).unwrap();
        assert!((std - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(result.row(1)[1], Value::Int64(0));
        assert_eq!(result.row(1)[3], Value::Null);
    }

    #[test]
    fn sum_rejects_text_columns() {
        let specs = [AggregateSpec::same("user_type", Aggregation::Sum)];
        let err = group_by(&trips(), &["user_id"], &specs).unwrap_err();
        assert!(matches!(err, AggregateError::NotNumeric { .. }));
    }

    #[test]
    fn left_join_suffixes_overlapping_names() {
        let left = Table::new(vec![
            Column::int64("parking_id", vec![Some(1), Some(2)]),
            Column::utf8("name", vec![Some("left-a"), Some("left-b")]),
        ])
        .unwrap();
        let right = Table::new(vec![
            Column::int64("parking_id", vec![Some(1), Some(1)]),
            Column::utf8("name", vec![Some("r1"), Some("r2")]),
        ])
        .unwrap();
        let joined = left_join(&left, &right, "parking_id").unwrap();
        assert_eq!(joined.column_names(), vec!["parking_id", "name_x", "name_y"]);
        assert_eq!(joined.row_count(), 3);
        assert_eq!(
            joined.row(2),
            vec![Value::Int64(2), Value::Utf8("left-b".to_string()), Value::Null]
        );
    }
}
