//! Error types for the tabstat pipeline.
//!
//! Every failure the pipeline can produce is a [`TabstatError`]. Errors are
//! grouped into an [`ErrorKind`] so that callers (and the router, which turns
//! errors into structured failures) can distinguish local validation problems
//! from alignment problems and from failures of the computation engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::engine::EngineError;

/// Broad classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Missing or invalid parameters, malformed cells, too few observations.
    Validation,
    /// No valid rows remain after filtering.
    Alignment,
    /// The computation engine failed or returned an unusable payload.
    Engine,
    /// The computation engine has not completed initialization.
    EngineNotReady,
    /// The method identifier is not registered.
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Alignment => "alignment",
            ErrorKind::Engine => "engine",
            ErrorKind::EngineNotReady => "engine not ready",
            ErrorKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// What was wrong with a single cell during strict extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellProblem {
    /// The value is present but does not parse as a finite number.
    NotANumber { value: String },
    /// The cell is absent, null or blank.
    Missing,
    /// The value has a type that cannot be coerced to the requested kind.
    UnexpectedType { expected: String, found: String },
}

impl fmt::Display for CellProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellProblem::NotANumber { value } => write!(f, "value '{value}' is not a number"),
            CellProblem::Missing => f.write_str("value is missing"),
            CellProblem::UnexpectedType { expected, found } => {
                write!(f, "unexpected type (expected {expected}, found {found})")
            }
        }
    }
}

/// The main error type for the tabstat pipeline.
#[derive(Error, Debug)]
pub enum TabstatError {
    /// A parameter or precondition check failed.
    #[error("{message}")]
    Validation { message: String },

    /// A cell failed validation in strict extraction mode.
    #[error("Row {row}, column '{column}': {problem}")]
    InvalidCell {
        /// 1-based row number in the uploaded dataset
        row: usize,
        column: String,
        problem: CellProblem,
    },

    /// A binary-role column held something other than 0 or 1.
    #[error("Column '{column}' must be binary (0/1); row {row} has value '{value}'")]
    NonBinary {
        row: usize,
        column: String,
        value: String,
    },

    /// A requested column does not appear in any record.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// The dataset has no records at all.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Fewer observations (or groups) remain than the method needs.
    #[error("Insufficient data: {context} requires at least {required}, found {found}")]
    InsufficientData {
        context: String,
        required: usize,
        found: usize,
    },

    /// Every row was dropped by filtering.
    #[error("No valid rows: 0 of {total} rows have usable values for columns [{columns}]")]
    NoValidRows { total: usize, columns: String },

    /// The computation engine has not been initialized.
    #[error("Computation engine is not initialized")]
    EngineNotReady,

    /// The computation engine failed.
    #[error("Engine error: {0}")]
    Engine(EngineError),

    /// The method identifier is not registered.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Error from Arrow while converting uploaded batches.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from DataFusion while collecting an uploaded table.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error parsing a JSON payload.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A type alias for `Result<T, TabstatError>`.
pub type Result<T> = std::result::Result<T, TabstatError>;

impl TabstatError {
    /// Creates a validation error with a domain-phrased message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an insufficient-data error.
    pub fn insufficient(context: impl Into<String>, required: usize, found: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            found,
        }
    }

    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TabstatError::Validation { .. }
            | TabstatError::InvalidCell { .. }
            | TabstatError::NonBinary { .. }
            | TabstatError::ColumnNotFound { .. }
            | TabstatError::EmptyDataset
            | TabstatError::InsufficientData { .. }
            | TabstatError::Arrow(_)
            | TabstatError::DataFusion(_)
            | TabstatError::Serialization(_) => ErrorKind::Validation,
            TabstatError::NoValidRows { .. } => ErrorKind::Alignment,
            TabstatError::EngineNotReady => ErrorKind::EngineNotReady,
            TabstatError::Engine(EngineError::NotInitialized) => ErrorKind::EngineNotReady,
            TabstatError::Engine(_) => ErrorKind::Engine,
            TabstatError::UnsupportedMethod(_) => ErrorKind::Unsupported,
        }
    }
}

impl From<EngineError> for TabstatError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotInitialized => TabstatError::EngineNotReady,
            other => TabstatError::Engine(other),
        }
    }
}

impl From<serde_json::Error> for TabstatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to validation errors.
pub trait ErrorContext<T> {
    /// Prefixes the message of a validation error with `msg`.
    fn context(self, msg: &str) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e {
            TabstatError::Validation { message } => TabstatError::Validation {
                message: format!("{msg}: {message}"),
            },
            other => other,
        })
    }
}
