//! Records and datasets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CellValue;

/// One uploaded row: column name to cell value.
pub type DataRecord = BTreeMap<String, CellValue>;

/// An ordered, read-only sequence of records supplied once per analysis.
///
/// Record order only matters for alignment; the extractor reports positions
/// as 1-based row numbers into this sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<DataRecord>,
}

impl Dataset {
    /// Creates a dataset from records.
    pub fn new(records: Vec<DataRecord>) -> Self {
        Self { records }
    }

    /// Creates an empty dataset, used by methods that take no data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a dataset from named columns of equal or ragged length.
    ///
    /// Shorter columns leave their trailing cells empty.
    pub fn from_columns<I, S, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<V>)>,
        S: Into<String>,
        V: Into<CellValue>,
    {
        let mut records: Vec<DataRecord> = Vec::new();
        for (name, values) in columns {
            let name = name.into();
            for (idx, value) in values.into_iter().enumerate() {
                if records.len() <= idx {
                    records.resize_with(idx + 1, DataRecord::new);
                }
                records[idx].insert(name.clone(), value.into());
            }
        }
        Self { records }
    }

    pub fn records(&self) -> &[DataRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the cell at `row` for `column`, or `None` when the record has
    /// no such key.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.records.get(row).and_then(|r| r.get(column))
    }

    /// Returns true if any record carries the column.
    pub fn has_column(&self, column: &str) -> bool {
        self.records.iter().any(|r| r.contains_key(column))
    }

    /// Returns the union of column names in first-seen order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for record in &self.records {
            for key in record.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }
        names
    }
}

impl From<Vec<DataRecord>> for Dataset {
    fn from(records: Vec<DataRecord>) -> Self {
        Self::new(records)
    }
}
