//! Result set handling.
//!
//! A `ResultSet` is built fresh for every fetch from the page of rows the
//! server returned and the schema reported by `GetResultSetMetadata`.
//! Both row-oriented and column-oriented row sets decode into the same
//! row-major form.

use std::fmt;
use std::sync::Arc;

use arrow::array::RecordBatch;

use crate::arrow_conversion::ArrowConverter;
use crate::error::ConversionError;
use crate::rpc::messages::{ColumnData, ColumnValue, RowSet, TableSchema};

/// A single typed value of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as `f64`. Integers convert, possibly losing precision.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// SQL type name matching the value's variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "VOID",
            Value::Boolean(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INT",
            Value::BigInt(_) => "BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::String(_) => "STRING",
            Value::Binary(_) => "BINARY",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::TinyInt(v) => write!(f, "{}", v),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Binary(v) => write!(f, "{}", hex::encode(v)),
        }
    }
}

impl From<&ColumnValue> for Value {
    fn from(value: &ColumnValue) -> Self {
        match value {
            ColumnValue::Bool(Some(v)) => Value::Boolean(*v),
            ColumnValue::Byte(Some(v)) => Value::TinyInt(*v),
            ColumnValue::I16(Some(v)) => Value::SmallInt(*v),
            ColumnValue::I32(Some(v)) => Value::Int(*v),
            ColumnValue::I64(Some(v)) => Value::BigInt(*v),
            ColumnValue::Double(Some(v)) => Value::Double(*v),
            ColumnValue::String(Some(v)) => Value::String(v.clone()),
            _ => Value::Null,
        }
    }
}

/// Name and server type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Server type name, e.g. `INT` or `STRING`
    pub type_name: String,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One result row, addressable by column name or position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Value of the named column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A schema paired with one page of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Build a result set from column definitions and row-major values.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::SchemaMismatch` if a row's width differs
    /// from the number of columns.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self, ConversionError> {
        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, values)| {
                if values.len() != names.len() {
                    return Err(ConversionError::SchemaMismatch(format!(
                        "Row {} has {} values, expected {}",
                        idx,
                        values.len(),
                        names.len()
                    )));
                }
                Ok(Row {
                    names: Arc::clone(&names),
                    values,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns, rows })
    }

    /// Decode a fetched page.
    ///
    /// Columns come from `schema`. Without server metadata they are derived
    /// from the first row as `_c0`, `_c1`, ... typed after its values.
    pub(crate) fn from_row_set(
        schema: Option<&TableSchema>,
        row_set: Option<&RowSet>,
    ) -> Result<Self, ConversionError> {
        let rows = match row_set {
            Some(row_set) => decode_rows(row_set)?,
            None => Vec::new(),
        };

        let columns: Vec<Column> = match schema {
            Some(schema) if !schema.columns.is_empty() => schema
                .columns
                .iter()
                .map(|desc| Column::new(desc.column_name.clone(), desc.type_name()))
                .collect(),
            _ => rows
                .first()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .map(|(idx, value)| Column::new(format!("_c{}", idx), value.type_name()))
                        .collect()
                })
                .unwrap_or_default(),
        };

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Convert the page to an Arrow `RecordBatch`.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ConversionError> {
        ArrowConverter::new(&self.columns)?.convert(&self.rows)
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Ordered lines of an `EXPLAIN` plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplainResult {
    lines: Vec<String>,
}

impl ExplainResult {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl fmt::Display for ExplainResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

fn decode_rows(row_set: &RowSet) -> Result<Vec<Vec<Value>>, ConversionError> {
    match &row_set.columns {
        Some(columns) if !columns.is_empty() => transpose_columns(columns),
        _ => Ok(row_set
            .rows
            .iter()
            .map(|row| row.iter().map(Value::from).collect())
            .collect()),
    }
}

fn transpose_columns(columns: &[ColumnData]) -> Result<Vec<Vec<Value>>, ConversionError> {
    let num_rows = columns.first().map(ColumnData::len).unwrap_or(0);
    if let Some((idx, column)) = columns
        .iter()
        .enumerate()
        .find(|(_, c)| c.len() != num_rows)
    {
        return Err(ConversionError::SchemaMismatch(format!(
            "Column {} has {} values, expected {}",
            idx,
            column.len(),
            num_rows
        )));
    }

    Ok((0..num_rows)
        .map(|row| columns.iter().map(|c| column_value(c, row)).collect())
        .collect())
}

fn column_value(column: &ColumnData, idx: usize) -> Value {
    if column.is_null(idx) {
        return Value::Null;
    }
    match column {
        ColumnData::Bool { values, .. } => Value::Boolean(values[idx]),
        ColumnData::Byte { values, .. } => Value::TinyInt(values[idx]),
        ColumnData::I16 { values, .. } => Value::SmallInt(values[idx]),
        ColumnData::I32 { values, .. } => Value::Int(values[idx]),
        ColumnData::I64 { values, .. } => Value::BigInt(values[idx]),
        ColumnData::Double { values, .. } => Value::Double(values[idx]),
        ColumnData::String { values, .. } => Value::String(values[idx].clone()),
        ColumnData::Binary { values, .. } => Value::Binary(values[idx].clone()),
    }
}
