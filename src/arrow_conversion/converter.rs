//! Main converter for transforming fetched rows to an Arrow RecordBatch.
//!
//! Takes row-major values and builds one columnar array per result column.

use crate::error::ConversionError;
use crate::query::{Column, Row, Value};
use arrow::array::RecordBatch;
use arrow::datatypes::{Field, Schema};
use std::sync::Arc;

use super::builders::{build_array, ColumnKind};

/// Converter from result rows to Arrow RecordBatch.
#[derive(Debug, Clone)]
pub struct ArrowConverter {
    schema: Arc<Schema>,
    kinds: Vec<ColumnKind>,
}

impl ArrowConverter {
    /// Create a converter from result column definitions.
    ///
    /// All fields are nullable.
    pub fn new(columns: &[Column]) -> Result<Self, ConversionError> {
        let kinds: Vec<ColumnKind> = columns
            .iter()
            .map(|c| ColumnKind::from_type_name(&c.type_name))
            .collect();

        let fields: Vec<Field> = columns
            .iter()
            .zip(&kinds)
            .map(|(c, kind)| Field::new(&c.name, kind.data_type(), true))
            .collect();

        Ok(Self {
            schema: Arc::new(Schema::new(fields)),
            kinds,
        })
    }

    /// Get the Arrow schema for this converter.
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Convert rows to an Arrow RecordBatch.
    ///
    /// # Errors
    /// Returns `ConversionError` if a row's width differs from the schema or
    /// a value does not fit its column type.
    pub fn convert(&self, rows: &[Row]) -> Result<RecordBatch, ConversionError> {
        if rows.is_empty() {
            return Ok(RecordBatch::new_empty(Arc::clone(&self.schema)));
        }

        let num_columns = self.kinds.len();
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != num_columns {
                return Err(ConversionError::SchemaMismatch(format!(
                    "Row {} has {} columns, expected {}",
                    row_idx,
                    row.len(),
                    num_columns
                )));
            }
        }

        let arrays = self
            .kinds
            .iter()
            .enumerate()
            .map(|(col_idx, kind)| {
                let values: Vec<&Value> = rows
                    .iter()
                    .map(|row| row.get_index(col_idx).unwrap_or(&Value::Null))
                    .collect();
                build_array(*kind, &values, col_idx)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordBatch::try_new(Arc::clone(&self.schema), arrays)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ResultSet;
    use arrow::array::{Array, Int32Array, StringArray};
    use arrow::datatypes::DataType;

    fn result_set() -> ResultSet {
        ResultSet::new(
            vec![Column::new("id", "INT"), Column::new("name", "VARCHAR")],
            vec![
                vec![Value::Int(1), Value::String("alice".into())],
                vec![Value::Int(2), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_schema() {
        let converter = ArrowConverter::new(result_set().columns()).unwrap();
        let schema = converter.schema();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(0).data_type(), &DataType::Int32);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert!(schema.field(1).is_nullable());
    }

    #[test]
    fn test_convert() {
        let batch = result_set().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 2);

        let ids = batch.column(0).as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(ids.value(1), 2);
        let names = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(0), "alice");
        assert!(names.is_null(1));
    }

    #[test]
    fn test_convert_empty() {
        let rs = ResultSet::new(vec![Column::new("x", "BIGINT")], Vec::new()).unwrap();
        let batch = rs.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);
    }
}
