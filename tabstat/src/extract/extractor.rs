//! Column extraction and row alignment.
//!
//! The extractor turns raw records into parallel arrays. Whatever the mode,
//! the arrays it returns are index-aligned: position `i` of every array comes
//! from the same source record, recorded in [`AlignedColumns::source_rows`].

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::data::{CellValue, Dataset, Role};
use crate::error::{CellProblem, Result, TabstatError};
use crate::logging::LogConfig;

/// How the extractor treats invalid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractionMode {
    /// The first invalid cell aborts extraction with a row/column error.
    Strict,
    /// Records with any invalid requested cell are dropped from every array.
    Filtering,
}

/// The kind of value a requested column must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    /// Finite number; numeric strings are parsed.
    Numeric,
    /// Any non-blank value, rendered as a label.
    Categorical,
    /// Exactly 0 or 1. Any other present value is always an error.
    Binary,
}

impl ColumnKind {
    fn expected(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "number",
            ColumnKind::Categorical => "category",
            ColumnKind::Binary => "0/1",
        }
    }
}

/// One `(role, column, kind)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRequest {
    pub role: Role,
    pub column: String,
    pub kind: ColumnKind,
}

impl ColumnRequest {
    pub fn new(role: Role, column: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            role,
            column: column.into(),
            kind,
        }
    }

    pub fn numeric(role: Role, column: impl Into<String>) -> Self {
        Self::new(role, column, ColumnKind::Numeric)
    }

    pub fn categorical(role: Role, column: impl Into<String>) -> Self {
        Self::new(role, column, ColumnKind::Categorical)
    }

    pub fn binary(role: Role, column: impl Into<String>) -> Self {
        Self::new(role, column, ColumnKind::Binary)
    }
}

/// Values of one aligned column. Binary columns are stored as 0.0 / 1.0.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single extracted column.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedColumn {
    pub role: Role,
    pub name: String,
    pub kind: ColumnKind,
    pub values: ColumnValues,
}

/// Equal-length, index-aligned columns produced by one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedColumns {
    columns: Vec<AlignedColumn>,
    source_rows: Vec<usize>,
}

impl AlignedColumns {
    /// Common length of every column.
    pub fn len(&self) -> usize {
        self.source_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_rows.is_empty()
    }

    /// 0-based index of the source record behind each aligned position.
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    /// Columns in request order.
    pub fn columns(&self) -> &[AlignedColumn] {
        &self.columns
    }

    /// Looks up the first column extracted under `role` with `name`.
    pub fn find(&self, role: Role, name: &str) -> Option<&AlignedColumn> {
        self.columns
            .iter()
            .find(|c| c.role == role && c.name == name)
    }

    /// Numeric values of the column at request position `index`.
    pub fn numbers(&self, index: usize) -> Result<&[f64]> {
        match self.columns.get(index).map(|c| (&c.name, &c.values)) {
            Some((_, ColumnValues::Numeric(v))) => Ok(v),
            Some((name, ColumnValues::Categorical(_))) => Err(TabstatError::validation(
                format!("column '{name}' is categorical, expected numeric values"),
            )),
            None => Err(TabstatError::validation(format!(
                "no extracted column at position {index}"
            ))),
        }
    }

    /// Labels of the column at request position `index`.
    pub fn labels(&self, index: usize) -> Result<&[String]> {
        match self.columns.get(index).map(|c| (&c.name, &c.values)) {
            Some((_, ColumnValues::Categorical(v))) => Ok(v),
            Some((name, ColumnValues::Numeric(_))) => Err(TabstatError::validation(format!(
                "column '{name}' is numeric, expected categories"
            ))),
            None => Err(TabstatError::validation(format!(
                "no extracted column at position {index}"
            ))),
        }
    }

    /// Fails unless at least `min` aligned rows are present.
    pub fn require_rows(&self, min: usize, context: &str) -> Result<()> {
        if self.len() < min {
            return Err(TabstatError::insufficient(
                format!("{context} (complete observations)"),
                min,
                self.len(),
            ));
        }
        Ok(())
    }
}

enum Coerced {
    Number(f64),
    Label(String),
    Invalid(CellProblem),
    NonBinary(String),
}

fn coerce(cell: Option<&CellValue>, kind: ColumnKind) -> Coerced {
    let cell = match cell {
        Some(c) if !c.is_missing() => c,
        _ => return Coerced::Invalid(CellProblem::Missing),
    };

    match kind {
        ColumnKind::Numeric => match cell {
            CellValue::Number(n) if n.is_finite() => Coerced::Number(*n),
            CellValue::Number(n) => Coerced::Invalid(CellProblem::NotANumber {
                value: n.to_string(),
            }),
            CellValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Coerced::Number(n),
                _ => Coerced::Invalid(CellProblem::NotANumber { value: s.clone() }),
            },
            other => Coerced::Invalid(CellProblem::UnexpectedType {
                expected: kind.expected().to_string(),
                found: other.type_name().to_string(),
            }),
        },
        ColumnKind::Categorical => match cell.as_label() {
            Some(label) => Coerced::Label(label),
            None => Coerced::Invalid(CellProblem::Missing),
        },
        ColumnKind::Binary => {
            let number = match cell {
                CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                CellValue::Number(n) => Some(*n),
                CellValue::Text(s) => {
                    let trimmed = s.trim();
                    if trimmed.eq_ignore_ascii_case("true") {
                        Some(1.0)
                    } else if trimmed.eq_ignore_ascii_case("false") {
                        Some(0.0)
                    } else {
                        trimmed.parse::<f64>().ok()
                    }
                }
                CellValue::Empty => None,
            };
            match number {
                Some(n) if n == 0.0 || n == 1.0 => Coerced::Number(n),
                _ => Coerced::NonBinary(cell.to_string()),
            }
        }
    }
}

/// Extracts and aligns requested columns from a dataset.
///
/// # Examples
///
/// ```rust
/// use tabstat::data::{CellValue, Dataset, Role};
/// use tabstat::extract::{ColumnRequest, ExtractionMode, Extractor};
///
/// let ds = Dataset::from_columns(vec![
///     ("x", vec![CellValue::from(1.0), CellValue::Empty, CellValue::from(3.0)]),
///     ("y", vec![CellValue::from(2.0), CellValue::from(4.0), CellValue::from(6.0)]),
/// ]);
/// let aligned = Extractor::new(ExtractionMode::Filtering)
///     .extract(&ds, &[
///         ColumnRequest::numeric(Role::Variables, "x"),
///         ColumnRequest::numeric(Role::Variables, "y"),
///     ])
///     .unwrap();
/// assert_eq!(aligned.numbers(1).unwrap(), &[2.0, 6.0]);
/// assert_eq!(aligned.source_rows(), &[0, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    mode: ExtractionMode,
    min_rows: usize,
    log: LogConfig,
}

impl Extractor {
    pub fn new(mode: ExtractionMode) -> Self {
        Self {
            mode,
            min_rows: 1,
            log: LogConfig::default(),
        }
    }

    /// Sets the minimum number of aligned rows the call must yield.
    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows.max(1);
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Extracts every requested column, aligned row-for-row.
    #[instrument(skip(self, dataset, requests), fields(mode = ?self.mode, rows = dataset.len(), columns = requests.len()))]
    pub fn extract(&self, dataset: &Dataset, requests: &[ColumnRequest]) -> Result<AlignedColumns> {
        if dataset.is_empty() {
            return Err(TabstatError::EmptyDataset);
        }
        if requests.is_empty() {
            return Err(TabstatError::validation("no columns requested"));
        }
        for request in requests {
            if !dataset.has_column(&request.column) {
                return Err(TabstatError::ColumnNotFound {
                    column: request.column.clone(),
                });
            }
        }

        let mut buffers: Vec<ColumnValues> = requests
            .iter()
            .map(|r| match r.kind {
                ColumnKind::Categorical => ColumnValues::Categorical(Vec::new()),
                ColumnKind::Numeric | ColumnKind::Binary => ColumnValues::Numeric(Vec::new()),
            })
            .collect();
        let mut source_rows = Vec::new();
        let mut row_values: Vec<Coerced> = Vec::with_capacity(requests.len());

        for (row_idx, record) in dataset.records().iter().enumerate() {
            row_values.clear();
            let mut row_valid = true;

            for request in requests {
                let coerced = coerce(record.get(&request.column), request.kind);
                match coerced {
                    Coerced::NonBinary(value) => {
                        return Err(TabstatError::NonBinary {
                            row: row_idx + 1,
                            column: request.column.clone(),
                            value,
                        });
                    }
                    Coerced::Invalid(problem) => {
                        if self.mode == ExtractionMode::Strict {
                            return Err(TabstatError::InvalidCell {
                                row: row_idx + 1,
                                column: request.column.clone(),
                                problem,
                            });
                        }
                        // Keep scanning so a non-binary value later in a
                        // dropped row is still reported.
                        row_valid = false;
                    }
                    valid => row_values.push(valid),
                }
            }

            if !row_valid {
                crate::log_extraction!(self.log, row = row_idx + 1, "Dropping row with invalid values");
                continue;
            }

            for (buffer, value) in buffers.iter_mut().zip(row_values.drain(..)) {
                match (buffer, value) {
                    (ColumnValues::Numeric(v), Coerced::Number(n)) => v.push(n),
                    (ColumnValues::Categorical(v), Coerced::Label(l)) => v.push(l),
                    _ => {
                        return Err(TabstatError::validation(
                            "extracted value does not match its column kind",
                        ))
                    }
                }
            }
            source_rows.push(row_idx);
        }

        if source_rows.is_empty() {
            return Err(TabstatError::NoValidRows {
                total: dataset.len(),
                columns: requests
                    .iter()
                    .map(|r| r.column.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let dropped = dataset.len() - source_rows.len();
        debug!(kept = source_rows.len(), dropped, "Extraction complete");

        if source_rows.len() < self.min_rows {
            return Err(TabstatError::insufficient(
                "analysis (complete observations)",
                self.min_rows,
                source_rows.len(),
            ));
        }

        let columns = requests
            .iter()
            .zip(buffers)
            .map(|(request, values)| AlignedColumn {
                role: request.role,
                name: request.column.clone(),
                kind: request.kind,
                values,
            })
            .collect();

        Ok(AlignedColumns {
            columns,
            source_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn dataset() -> Dataset {
        Dataset::from_columns(vec![
            (
                "x",
                vec![
                    CellValue::from(1.0),
                    CellValue::from("2.5"),
                    CellValue::from("abc"),
                    CellValue::Empty,
                    CellValue::from(5.0),
                ],
            ),
            (
                "g",
                vec![
                    CellValue::from("a"),
                    CellValue::from("b"),
                    CellValue::from("a"),
                    CellValue::from("b"),
                    CellValue::from(""),
                ],
            ),
        ])
    }

    #[test]
    fn test_filtering_drops_rows_from_every_column() {
        let aligned = Extractor::new(ExtractionMode::Filtering)
            .extract(
                &dataset(),
                &[
                    ColumnRequest::numeric(Role::Dependent, "x"),
                    ColumnRequest::categorical(Role::Group, "g"),
                ],
            )
            .unwrap();

        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.numbers(0).unwrap(), &[1.0, 2.5]);
        assert_eq!(aligned.labels(1).unwrap(), &["a".to_string(), "b".to_string()]);
        assert_eq!(aligned.source_rows(), &[0, 1]);
    }

    #[test]
    fn test_strict_reports_row_and_column() {
        let err = Extractor::new(ExtractionMode::Strict)
            .extract(&dataset(), &[ColumnRequest::numeric(Role::Dependent, "x")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Row 3, column 'x': value 'abc' is not a number"
        );
    }

    #[test]
    fn test_strict_missing_and_unexpected_type() {
        let ds = Dataset::from_columns(vec![(
            "x",
            vec![CellValue::from(1.0), CellValue::Empty, CellValue::from(true)],
        )]);
        let err = Extractor::new(ExtractionMode::Strict)
            .extract(&ds, &[ColumnRequest::numeric(Role::Dependent, "x")])
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 2, column 'x': value is missing");

        let ds = Dataset::from_columns(vec![("x", vec![CellValue::from(true)])]);
        let err = Extractor::new(ExtractionMode::Strict)
            .extract(&ds, &[ColumnRequest::numeric(Role::Dependent, "x")])
            .unwrap_err();
        assert!(err.to_string().contains("unexpected type"));
    }

    #[test]
    fn test_non_binary_is_error_in_both_modes() {
        let ds = Dataset::from_columns(vec![
            ("t", vec![CellValue::from(1.0), CellValue::from(f64::NAN)]),
            ("e", vec![CellValue::from(1.0), CellValue::from(2.0)]),
        ]);
        let requests = [
            ColumnRequest::binary(Role::Event, "e"),
            ColumnRequest::numeric(Role::Time, "t"),
        ];
        for mode in [ExtractionMode::Strict, ExtractionMode::Filtering] {
            let err = Extractor::new(mode).extract(&ds, &requests).unwrap_err();
            assert!(matches!(err, TabstatError::NonBinary { row: 2, .. }), "{err}");
            assert!(err.to_string().contains("binary"));
        }

        // A filtered row still has its event value checked.
        let err = Extractor::new(ExtractionMode::Filtering)
            .extract(&ds, &[requests[1].clone(), requests[0].clone()])
            .unwrap_err();
        assert!(err.to_string().contains("binary"));
    }

    #[test]
    fn test_binary_coercions() {
        let ds = Dataset::from_columns(vec![(
            "e",
            vec![
                CellValue::from(true),
                CellValue::from("0"),
                CellValue::from(" TRUE "),
                CellValue::from(1.0),
            ],
        )]);
        let aligned = Extractor::new(ExtractionMode::Strict)
            .extract(&ds, &[ColumnRequest::binary(Role::Event, "e")])
            .unwrap();
        assert_eq!(aligned.numbers(0).unwrap(), &[1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_dataset_and_zero_valid_rows() {
        let err = Extractor::new(ExtractionMode::Filtering)
            .extract(&Dataset::empty(), &[ColumnRequest::numeric(Role::Dependent, "x")])
            .unwrap_err();
        assert!(matches!(err, TabstatError::EmptyDataset));

        let ds = Dataset::from_columns(vec![("x", vec![CellValue::from("a"), CellValue::Empty])]);
        let err = Extractor::new(ExtractionMode::Filtering)
            .extract(&ds, &[ColumnRequest::numeric(Role::Dependent, "x")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Alignment);
        assert!(err.to_string().contains("0 of 2"));
    }

    #[test]
    fn test_unknown_column() {
        let err = Extractor::new(ExtractionMode::Filtering)
            .extract(&dataset(), &[ColumnRequest::numeric(Role::Dependent, "nope")])
            .unwrap_err();
        assert!(matches!(err, TabstatError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_duplicate_requests_are_identical() {
        let aligned = Extractor::new(ExtractionMode::Filtering)
            .extract(
                &dataset(),
                &[
                    ColumnRequest::numeric(Role::Dependent, "x"),
                    ColumnRequest::numeric(Role::Variables, "x"),
                ],
            )
            .unwrap();
        assert_eq!(aligned.numbers(0).unwrap(), aligned.numbers(1).unwrap());
    }

    #[test]
    fn test_min_rows() {
        let err = Extractor::new(ExtractionMode::Filtering)
            .with_min_rows(4)
            .extract(&dataset(), &[ColumnRequest::numeric(Role::Dependent, "x")])
            .unwrap_err();
        assert!(matches!(
            err,
            TabstatError::InsufficientData {
                required: 4,
                found: 3,
                ..
            }
        ));
    }
}
