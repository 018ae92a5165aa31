//! Array builders for converting result values to Arrow arrays.
//!
//! Each builder walks one column of values and appends them with proper
//! NULL handling. Integer values widen into wider integer columns.

use crate::error::ConversionError;
use crate::query::Value;
use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Float64Builder, Int16Builder, Int32Builder,
    Int64Builder, Int8Builder, StringBuilder,
};
use arrow::datatypes::DataType;
use std::sync::Arc;

/// Arrow representation chosen for a server column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float64,
    Binary,
    Utf8,
}

impl ColumnKind {
    /// Map a server type name. Types without a native mapping become UTF-8.
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name.to_ascii_uppercase().as_str() {
            "BOOLEAN" => ColumnKind::Boolean,
            "TINYINT" => ColumnKind::Int8,
            "SMALLINT" => ColumnKind::Int16,
            "INT" => ColumnKind::Int32,
            "BIGINT" => ColumnKind::Int64,
            "FLOAT" | "DOUBLE" => ColumnKind::Float64,
            "BINARY" => ColumnKind::Binary,
            _ => ColumnKind::Utf8,
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            ColumnKind::Boolean => DataType::Boolean,
            ColumnKind::Int8 => DataType::Int8,
            ColumnKind::Int16 => DataType::Int16,
            ColumnKind::Int32 => DataType::Int32,
            ColumnKind::Int64 => DataType::Int64,
            ColumnKind::Float64 => DataType::Float64,
            ColumnKind::Binary => DataType::Binary,
            ColumnKind::Utf8 => DataType::Utf8,
        }
    }
}

/// Build an Arrow array from one column of values.
///
/// # Arguments
/// * `kind` - Target representation
/// * `values` - Column of values (one per row)
/// * `column` - Column index for error reporting
pub fn build_array(
    kind: ColumnKind,
    values: &[&Value],
    column: usize,
) -> Result<ArrayRef, ConversionError> {
    match kind {
        ColumnKind::Boolean => build_boolean_array(values, column),
        ColumnKind::Int8 => build_int8_array(values, column),
        ColumnKind::Int16 => build_int16_array(values, column),
        ColumnKind::Int32 => build_int32_array(values, column),
        ColumnKind::Int64 => build_int64_array(values, column),
        ColumnKind::Float64 => build_double_array(values, column),
        ColumnKind::Binary => build_binary_array(values, column),
        ColumnKind::Utf8 => Ok(build_string_array(values)),
    }
}

fn mismatch(expected: &str, value: &Value, row: usize, column: usize) -> ConversionError {
    ConversionError::ValueConversionFailed {
        row,
        column,
        message: format!("Expected {}, got: {:?}", expected, value),
    }
}

fn build_boolean_array(values: &[&Value], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = BooleanBuilder::with_capacity(values.len());

    for (row, value) in values.iter().enumerate() {
        if value.is_null() {
            builder.append_null();
        } else if let Some(b) = value.as_bool() {
            builder.append_value(b);
        } else {
            return Err(mismatch("boolean", value, row, column));
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_int8_array(values: &[&Value], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = Int8Builder::with_capacity(values.len());

    for (row, value) in values.iter().enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::TinyInt(v) => builder.append_value(*v),
            other => return Err(mismatch("tinyint", other, row, column)),
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_int16_array(values: &[&Value], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = Int16Builder::with_capacity(values.len());

    for (row, value) in values.iter().enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::TinyInt(v) => builder.append_value(i16::from(*v)),
            Value::SmallInt(v) => builder.append_value(*v),
            other => return Err(mismatch("smallint", other, row, column)),
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_int32_array(values: &[&Value], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = Int32Builder::with_capacity(values.len());

    for (row, value) in values.iter().enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::TinyInt(v) => builder.append_value(i32::from(*v)),
            Value::SmallInt(v) => builder.append_value(i32::from(*v)),
            Value::Int(v) => builder.append_value(*v),
            other => return Err(mismatch("int", other, row, column)),
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_int64_array(values: &[&Value], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = Int64Builder::with_capacity(values.len());

    for (row, value) in values.iter().enumerate() {
        if value.is_null() {
            builder.append_null();
        } else if let Some(v) = value.as_i64() {
            builder.append_value(v);
        } else {
            return Err(mismatch("bigint", value, row, column));
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_double_array(values: &[&Value], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = Float64Builder::with_capacity(values.len());

    for (row, value) in values.iter().enumerate() {
        if value.is_null() {
            builder.append_null();
        } else if let Some(v) = value.as_f64() {
            builder.append_value(v);
        } else {
            return Err(mismatch("double", value, row, column));
        }
    }

    Ok(Arc::new(builder.finish()))
}

fn build_binary_array(values: &[&Value], column: usize) -> Result<ArrayRef, ConversionError> {
    let mut builder = BinaryBuilder::with_capacity(values.len(), values.len() * 16);

    for (row, value) in values.iter().enumerate() {
        match value {
            Value::Null => builder.append_null(),
            Value::Binary(bytes) => builder.append_value(bytes),
            // Row-based pages carry binary columns as strings
            Value::String(s) => builder.append_value(s.as_bytes()),
            other => return Err(mismatch("binary", other, row, column)),
        }
    }

    Ok(Arc::new(builder.finish()))
}

/// Any non-null value renders to its text form.
fn build_string_array(values: &[&Value]) -> ArrayRef {
    let mut builder = StringBuilder::with_capacity(values.len(), values.len() * 32);

    for value in values {
        match value {
            Value::Null => builder.append_null(),
            Value::String(s) => builder.append_value(s),
            other => builder.append_value(other.to_string()),
        }
    }

    Arc::new(builder.finish())
}
