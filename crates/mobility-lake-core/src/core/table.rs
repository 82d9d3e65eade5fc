// crates/mobility-lake-core/src/core/table.rs
// ============================================================================
// Module: Mobility Lake Tables
// Description: In-memory columnar tables with nullable typed columns.
// Purpose: Carry datasets between codecs, normalizers, gates and builders.
// Dependencies: thiserror, time
// ============================================================================

//! ## Overview
//! A [`Table`] is an ordered set of equally long, uniquely named columns.
//! Every column is nullable: a missing integer stays `None` and is never
//! folded into zero. [`KeyValue`] gives every cell a total order so rows can
//! be grouped, joined and checked for duplicates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::PrimitiveDateTime;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by table construction and reshaping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A column does not match the table's row count.
    #[error("column `{column}` has {actual} rows, expected {expected}")]
    LengthMismatch {
        /// Column name.
        column: String,
        /// Table row count.
        expected: usize,
        /// Column row count.
        actual: usize,
    },
    /// Two columns share a name.
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    /// A referenced column does not exist.
    #[error("missing column `{0}`")]
    MissingColumn(String),
}

// ============================================================================
// SECTION: Data Types
// ============================================================================

/// Logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// UTF-8 text.
    Utf8,
    /// Signed 64-bit integer.
    Int64,
    /// 64-bit float.
    Float64,
    /// Boolean.
    Boolean,
    /// Naive date-time with microsecond precision.
    Timestamp,
}

impl DataType {
    /// Returns the stable label for the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Cell Values
// ============================================================================

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// Text value.
    Utf8(String),
    /// Integer value.
    Int64(i64),
    /// Float value.
    Float64(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date-time value.
    Timestamp(PrimitiveDateTime),
}

/// Float wrapper ordered by [`f64::total_cmp`].
#[derive(Debug, Clone, Copy)]
pub struct TotalF64(pub f64);

impl PartialEq for TotalF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Totally ordered cell used for grouping, joins and duplicate detection.
///
/// # Invariants
/// - `Null` sorts before every other value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyValue {
    /// Missing value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Int64(i64),
    /// Float value.
    Float64(TotalF64),
    /// Text value.
    Utf8(String),
    /// Date-time value.
    Timestamp(PrimitiveDateTime),
}

impl KeyValue {
    /// Returns true for the null key.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// ============================================================================
// SECTION: Column Data
// ============================================================================

/// Typed, nullable column storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Text column.
    Utf8(Vec<Option<String>>),
    /// Integer column.
    Int64(Vec<Option<i64>>),
    /// Float column.
    Float64(Vec<Option<f64>>),
    /// Boolean column.
    Boolean(Vec<Option<bool>>),
    /// Date-time column.
    Timestamp(Vec<Option<PrimitiveDateTime>>),
}

impl ColumnData {
    /// Builds an all-null column of the given type.
    #[must_use]
    pub fn nulls(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Utf8 => Self::Utf8(vec![None; len]),
            DataType::Int64 => Self::Int64(vec![None; len]),
            DataType::Float64 => Self::Float64(vec![None; len]),
            DataType::Boolean => Self::Boolean(vec![None; len]),
            DataType::Timestamp => Self::Timestamp(vec![None; len]),
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Utf8(values) => values.len(),
            Self::Int64(values) => values.len(),
            Self::Float64(values) => values.len(),
            Self::Boolean(values) => values.len(),
            Self::Timestamp(values) => values.len(),
        }
    }

    /// Returns true when the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the logical type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Utf8(_) => DataType::Utf8,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Boolean(_) => DataType::Boolean,
            Self::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Returns true when the cell at `row` is null or out of range.
    #[must_use]
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Self::Utf8(values) => values.get(row).is_none_or(Option::is_none),
            Self::Int64(values) => values.get(row).is_none_or(Option::is_none),
            Self::Float64(values) => values.get(row).is_none_or(Option::is_none),
            Self::Boolean(values) => values.get(row).is_none_or(Option::is_none),
            Self::Timestamp(values) => values.get(row).is_none_or(Option::is_none),
        }
    }

    /// Counts null cells.
    #[must_use]
    pub fn null_count(&self) -> usize {
        (0 .. self.len()).filter(|row| self.is_null(*row)).count()
    }

    /// Returns the cell at `row`.
    #[must_use]
    pub fn value(&self, row: usize) -> Value {
        match self {
            Self::Utf8(values) => {
                values.get(row).cloned().flatten().map_or(Value::Null, Value::Utf8)
            }
            Self::Int64(values) => {
                values.get(row).copied().flatten().map_or(Value::Null, Value::Int64)
            }
            Self::Float64(values) => {
                values.get(row).copied().flatten().map_or(Value::Null, Value::Float64)
            }
            Self::Boolean(values) => {
                values.get(row).copied().flatten().map_or(Value::Null, Value::Boolean)
            }
            Self::Timestamp(values) => {
                values.get(row).copied().flatten().map_or(Value::Null, Value::Timestamp)
            }
        }
    }

    /// Returns the totally ordered key for the cell at `row`.
    #[must_use]
    pub fn key(&self, row: usize) -> KeyValue {
        match self.value(row) {
            Value::Null => KeyValue::Null,
            Value::Utf8(value) => KeyValue::Utf8(value),
            Value::Int64(value) => KeyValue::Int64(value),
            Value::Float64(value) => KeyValue::Float64(TotalF64(value)),
            Value::Boolean(value) => KeyValue::Boolean(value),
            Value::Timestamp(value) => KeyValue::Timestamp(value),
        }
    }

    /// Returns the cell at `row` as a float when the column is numeric.
    #[must_use]
    pub fn numeric(&self, row: usize) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss, reason = "Aggregates operate on f64.")]
            Self::Int64(values) => values.get(row).copied().flatten().map(|value| value as f64),
            Self::Float64(values) => values.get(row).copied().flatten(),
            _ => None,
        }
    }

    /// Gathers rows by index; `None` produces a null cell.
    #[must_use]
    pub fn gather(&self, indices: &[Option<usize>]) -> Self {
        /// Picks one optional cell from a column vector.
        fn pick<T: Clone>(values: &[Option<T>], index: Option<usize>) -> Option<T> {
            index.and_then(|row| values.get(row).cloned().flatten())
        }
        match self {
            Self::Utf8(values) => Self::Utf8(indices.iter().map(|i| pick(values, *i)).collect()),
            Self::Int64(values) => Self::Int64(indices.iter().map(|i| pick(values, *i)).collect()),
            Self::Float64(values) => {
                Self::Float64(indices.iter().map(|i| pick(values, *i)).collect())
            }
            Self::Boolean(values) => {
                Self::Boolean(indices.iter().map(|i| pick(values, *i)).collect())
            }
            Self::Timestamp(values) => {
                Self::Timestamp(indices.iter().map(|i| pick(values, *i)).collect())
            }
        }
    }
}

// ============================================================================
// SECTION: Columns
// ============================================================================

/// Named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column values.
    pub data: ColumnData,
}

impl Column {
    /// Creates a column from typed data.
    #[must_use]
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Creates a text column.
    #[must_use]
    pub fn utf8<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        let values = values.into_iter().map(|value| value.map(Into::into)).collect();
        Self::new(name, ColumnData::Utf8(values))
    }

    /// Creates an integer column.
    #[must_use]
    pub fn int64(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self::new(name, ColumnData::Int64(values))
    }

    /// Creates a float column.
    #[must_use]
    pub fn float64(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float64(values))
    }

    /// Creates a boolean column.
    #[must_use]
    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self::new(name, ColumnData::Boolean(values))
    }

    /// Creates a date-time column.
    #[must_use]
    pub fn timestamp(name: impl Into<String>, values: Vec<Option<PrimitiveDateTime>>) -> Self {
        Self::new(name, ColumnData::Timestamp(values))
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the logical type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data.data_type()
    }
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Ordered collection of equally long, uniquely named columns.
///
/// # Invariants
/// - Every column has exactly `row_count` rows.
/// - Column names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Columns in display order.
    columns: Vec<Column>,
    /// Shared row count.
    row_count: usize,
}

impl Table {
    /// Builds a table, checking lengths and name uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when columns disagree on length or share a name.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map_or(0, Column::len);
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            row_count,
        };
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Returns true when a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Looks up a column by name, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] when no column has that name.
    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name).ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Removes and returns a column.
    pub fn take_column(&mut self, name: &str) -> Option<Column> {
        let position = self.position(name)?;
        Some(self.columns.remove(position))
    }

    /// Appends a new column.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] on a length mismatch or duplicate name.
    pub fn push_column(&mut self, column: Column) -> Result<(), TableError> {
        if self.has_column(&column.name) {
            return Err(TableError::DuplicateColumn(column.name));
        }
        self.check_length(&column)?;
        if self.columns.is_empty() {
            self.row_count = column.len();
        }
        self.columns.push(column);
        Ok(())
    }

    /// Replaces a column in place, or appends it when the name is new.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LengthMismatch`] when the column length differs.
    pub fn set_column(&mut self, column: Column) -> Result<(), TableError> {
        match self.position(&column.name) {
            Some(position) => {
                self.check_length(&column)?;
                self.columns[position] = column;
                Ok(())
            }
            None => self.push_column(column),
        }
    }

    /// Renames a column; absent sources are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateColumn`] when the new name is taken.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), TableError> {
        if from == to {
            return Ok(());
        }
        let Some(position) = self.position(from) else {
            return Ok(());
        };
        if self.has_column(to) {
            return Err(TableError::DuplicateColumn(to.to_string()));
        }
        self.columns[position].name = to.to_string();
        Ok(())
    }

    /// Returns a table holding only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] for an unknown name.
    pub fn project(&self, names: &[&str]) -> Result<Self, TableError> {
        let columns = names
            .iter()
            .map(|name| self.require(name).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let mut projected = Self::new(columns)?;
        projected.row_count = self.row_count;
        Ok(projected)
    }

    /// Returns a table with rows gathered by index; `None` yields a null row.
    #[must_use]
    pub fn gather(&self, indices: &[Option<usize>]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|column| Column::new(column.name.clone(), column.data.gather(indices)))
                .collect(),
            row_count: indices.len(),
        }
    }

    /// Returns a table without rows that hold a null in any column.
    #[must_use]
    pub fn drop_nulls(&self) -> Self {
        let keep: Vec<Option<usize>> = (0 .. self.row_count)
            .filter(|row| self.columns.iter().all(|column| !column.data.is_null(*row)))
            .map(Some)
            .collect();
        self.gather(&keep)
    }

    /// Returns the cells of one row.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|column| column.data.value(row)).collect()
    }

    /// Returns the position of a column.
    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Checks a column against the table row count.
    fn check_length(&self, column: &Column) -> Result<(), TableError> {
        if !self.columns.is_empty() && column.len() != self.row_count {
            return Err(TableError::LengthMismatch {
                column: column.name.clone(),
                expected: self.row_count,
                actual: column.len(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::int64("id", vec![Some(1), None, Some(3)]),
            Column::utf8("name", vec![Some("a"), Some("b"), None]),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = Table::new(vec![
            Column::int64("id", vec![Some(1)]),
            Column::int64("other", vec![Some(1), Some(2)]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn rename_ignores_absent_source() {
        let mut table = sample();
        table.rename("missing", "other").unwrap();
        table.rename("name", "label").unwrap();
        assert_eq!(table.column_names(), vec!["id", "label"]);
        assert!(table.rename("id", "label").is_err());
    }

    #[test]
    fn drop_nulls_keeps_complete_rows() {
        let table = sample().drop_nulls();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.row(0), vec![Value::Int64(1), Value::Utf8("a".to_string())]);
    }

    #[test]
    fn gather_fills_missing_rows_with_nulls() {
        let table = sample().gather(&[Some(2), None]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(1), vec![Value::Null, Value::Null]);
    }

    #[test]
    fn null_keys_sort_first() {
        let column = ColumnData::Float64(vec![Some(-3.5), None, Some(1.0)]);
        let mut keys: Vec<KeyValue> = (0 .. 3).map(|row| column.key(row)).collect();
        keys.sort();
        assert_eq!(keys[0], KeyValue::Null);
        assert_eq!(keys[1], KeyValue::Float64(TotalF64(-3.5)));
    }
}
