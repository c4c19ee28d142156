//! Conversions from upload formats into a [`Dataset`].
//!
//! Uploads reach the pipeline as JSON rows, Arrow record batches, or tables
//! registered in a DataFusion session. Every path ends in the same
//! record-oriented [`Dataset`].

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion::prelude::DataFrame;
use tracing::{debug, instrument};

use super::{CellValue, DataRecord, Dataset};
use crate::error::{Result, TabstatError};

impl Dataset {
    /// Parses a JSON array of objects.
    ///
    /// ```rust
    /// use tabstat::data::Dataset;
    ///
    /// let ds = Dataset::from_json_rows(r#"[{"score": 1.5, "arm": "a"}]"#).unwrap();
    /// assert_eq!(ds.len(), 1);
    /// ```
    pub fn from_json_rows(json: &str) -> Result<Self> {
        let records: Vec<DataRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    /// Converts Arrow record batches, in order, into records.
    ///
    /// Numeric columns become numbers, booleans stay booleans, and every
    /// other type is rendered as text. Nulls become [`CellValue::Empty`].
    #[instrument(skip(batches), fields(batch_count = batches.len()))]
    pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Self> {
        let mut records = Vec::new();
        for batch in batches {
            let schema = batch.schema();
            let mut columns = Vec::with_capacity(batch.num_columns());
            for (field, array) in schema.fields().iter().zip(batch.columns()) {
                columns.push((field.name().clone(), convert_column(array)?));
            }
            for row in 0..batch.num_rows() {
                let mut record = DataRecord::new();
                for (name, values) in &columns {
                    let value = values.get(row).cloned().unwrap_or_default();
                    record.insert(name.clone(), value);
                }
                records.push(record);
            }
        }
        debug!(rows = records.len(), "Converted record batches into dataset");
        Ok(Self::new(records))
    }

    /// Collects a DataFusion data frame into a dataset.
    #[instrument(skip(df))]
    pub async fn from_dataframe(df: DataFrame) -> Result<Self> {
        let batches = df.collect().await?;
        Self::from_record_batches(&batches)
    }
}

fn convert_column(array: &ArrayRef) -> Result<Vec<CellValue>> {
    match array.data_type() {
        DataType::Boolean => {
            let bools = downcast::<BooleanArray>(array)?;
            Ok((0..bools.len())
                .map(|i| {
                    if bools.is_null(i) {
                        CellValue::Empty
                    } else {
                        CellValue::Bool(bools.value(i))
                    }
                })
                .collect())
        }
        dt if dt.is_numeric() => {
            let casted = cast(array, &DataType::Float64)?;
            let floats = downcast::<Float64Array>(&casted)?;
            Ok((0..floats.len())
                .map(|i| {
                    if floats.is_null(i) {
                        CellValue::Empty
                    } else {
                        CellValue::Number(floats.value(i))
                    }
                })
                .collect())
        }
        _ => {
            let casted = cast(array, &DataType::Utf8)?;
            let strings = downcast::<StringArray>(&casted)?;
            Ok((0..strings.len())
                .map(|i| {
                    if strings.is_null(i) {
                        CellValue::Empty
                    } else {
                        CellValue::Text(strings.value(i).to_string())
                    }
                })
                .collect())
        }
    }
}

fn downcast<T: 'static>(array: &ArrayRef) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        TabstatError::Serialization(format!(
            "unexpected Arrow array type {}",
            array.data_type()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{Field, Schema};
    use datafusion::prelude::SessionContext;
    use std::sync::Arc;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("score", DataType::Int64, true),
            Field::new("arm", DataType::Utf8, true),
            Field::new("event", DataType::Boolean, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![Some(3), None, Some(5)])),
                Arc::new(StringArray::from(vec![Some("a"), Some("b"), None])),
                Arc::new(BooleanArray::from(vec![Some(true), Some(false), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_record_batches() {
        let ds = Dataset::from_record_batches(&[sample_batch()]).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.cell(0, "score"), Some(&CellValue::Number(3.0)));
        assert_eq!(ds.cell(1, "score"), Some(&CellValue::Empty));
        assert_eq!(ds.cell(1, "arm"), Some(&CellValue::Text("b".into())));
        assert_eq!(ds.cell(2, "arm"), Some(&CellValue::Empty));
        assert_eq!(ds.cell(0, "event"), Some(&CellValue::Bool(true)));
    }

    #[test]
    fn test_from_json_rows_rejects_non_array() {
        assert!(Dataset::from_json_rows(r#"{"x": 1}"#).is_err());
    }

    #[tokio::test]
    async fn test_from_dataframe() {
        let ctx = SessionContext::new();
        ctx.register_batch("uploads", sample_batch()).unwrap();
        let df = ctx
            .sql("SELECT score, arm FROM uploads WHERE score IS NOT NULL")
            .await
            .unwrap();

        let ds = Dataset::from_dataframe(df).await.unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.cell(1, "score"), Some(&CellValue::Number(5.0)));
    }
}
