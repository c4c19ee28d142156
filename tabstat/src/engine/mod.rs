//! The computation engine boundary.
//!
//! The numeric algorithms live outside this crate behind
//! [`ComputationEngine`]. Handlers never talk to an engine directly; they go
//! through [`EngineHandle`], which checks every argument list against the
//! routine's declared signature, refuses to call an engine that has not been
//! initialized, and serializes access so only one call is in flight.

mod handle;
mod output;
mod scripted;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::extract::{Matrix, Orientation};
use crate::methods::ArgKind;

pub use handle::EngineHandle;
pub use output::EngineOutput;
pub use scripted::{RecordedCall, ScriptedEngine};

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors raised at the engine boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine was called before initialization finished.
    #[error("Computation engine is not initialized")]
    NotInitialized,

    /// Initialization itself failed.
    #[error("Engine initialization failed: {0}")]
    Initialization(String),

    /// A routine raised an error.
    #[error("Routine '{routine}' failed: {message}")]
    Routine { routine: String, message: String },

    /// A field the pipeline needs is absent from the routine's output.
    #[error("Routine '{routine}' returned no '{field}' field")]
    MissingField { routine: String, field: String },

    /// A field is present but has the wrong shape.
    #[error("Routine '{routine}' returned '{field}' that is not {expected}")]
    InvalidField {
        routine: String,
        field: String,
        expected: String,
    },

    /// Arguments do not match the routine's declared signature.
    #[error("Routine '{routine}' argument {position}: expected {expected:?}, found {found}")]
    SignatureMismatch {
        routine: String,
        position: usize,
        expected: Option<ArgKind>,
        found: String,
    },
}

impl EngineError {
    pub fn routine(routine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Routine {
            routine: routine.into(),
            message: message.into(),
        }
    }
}

/// One positional argument of an engine routine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum EngineArg {
    Numbers(Vec<f64>),
    Labels(Vec<String>),
    /// One numeric array per group, groups in first-seen order.
    Groups(Vec<Vec<f64>>),
    Matrix(Matrix),
    Scalar(f64),
    Text(String),
}

impl EngineArg {
    /// The [`ArgKind`] this argument satisfies.
    pub fn kind(&self) -> ArgKind {
        match self {
            EngineArg::Numbers(_) => ArgKind::Numbers,
            EngineArg::Labels(_) => ArgKind::Labels,
            EngineArg::Groups(_) => ArgKind::Groups,
            EngineArg::Matrix(m) => match m.orientation() {
                Orientation::RowMajor => ArgKind::RowMajor,
                Orientation::ColumnMajor => ArgKind::ColumnMajor,
            },
            EngineArg::Scalar(_) => ArgKind::Scalar,
            EngineArg::Text(_) => ArgKind::Text,
        }
    }

    /// Number of scalar values carried, for logging.
    pub fn size(&self) -> usize {
        match self {
            EngineArg::Numbers(v) => v.len(),
            EngineArg::Labels(v) => v.len(),
            EngineArg::Groups(g) => g.iter().map(Vec::len).sum(),
            EngineArg::Matrix(m) => m.data().iter().map(Vec::len).sum(),
            EngineArg::Scalar(_) | EngineArg::Text(_) => 1,
        }
    }
}

/// A numerical computation engine.
///
/// Implementations are stateful and must be initialized once before any
/// routine is called. Routines take positional [`EngineArg`]s and return a
/// flat object of named fields.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use serde_json::json;
/// use tabstat::engine::{ComputationEngine, EngineArg, EngineOutput, EngineResult};
///
/// #[derive(Debug)]
/// struct MeanEngine;
///
/// #[async_trait]
/// impl ComputationEngine for MeanEngine {
///     async fn initialize(&self) -> EngineResult<()> {
///         Ok(())
///     }
///
///     fn is_initialized(&self) -> bool {
///         true
///     }
///
///     async fn call(&self, routine: &str, args: Vec<EngineArg>) -> EngineResult<EngineOutput> {
///         let EngineArg::Numbers(values) = &args[0] else { unreachable!() };
///         let mean = values.iter().sum::<f64>() / values.len() as f64;
///         EngineOutput::from_value(routine, json!({ "mean": mean }))
///     }
/// }
/// ```
#[async_trait]
pub trait ComputationEngine: Send + Sync + std::fmt::Debug {
    /// Loads whatever the engine needs. Called at most once by
    /// [`EngineHandle::initialize`] unless it fails.
    async fn initialize(&self) -> EngineResult<()>;

    /// Whether [`initialize`](Self::initialize) has completed successfully.
    fn is_initialized(&self) -> bool;

    /// Runs one routine.
    async fn call(&self, routine: &str, args: Vec<EngineArg>) -> EngineResult<EngineOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Role};
    use crate::extract::{ColumnRequest, ExtractionMode, Extractor, MatrixBuilder};

    #[test]
    fn test_arg_kind_follows_matrix_orientation() {
        let ds = Dataset::from_columns(vec![("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0])]);
        let aligned = Extractor::new(ExtractionMode::Strict)
            .extract(
                &ds,
                &[
                    ColumnRequest::numeric(Role::Variables, "a"),
                    ColumnRequest::numeric(Role::Variables, "b"),
                ],
            )
            .unwrap();
        let builder = MatrixBuilder::new(&aligned);
        let rows = EngineArg::Matrix(builder.row_major(&["a", "b"]).unwrap());
        let cols = EngineArg::Matrix(builder.column_major(&["a", "b"]).unwrap());
        assert_eq!(rows.kind(), ArgKind::RowMajor);
        assert_eq!(cols.kind(), ArgKind::ColumnMajor);
        assert_eq!(rows.size(), 4);
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::MissingField {
            routine: "pca".to_string(),
            field: "loadings".to_string(),
        };
        assert_eq!(err.to_string(), "Routine 'pca' returned no 'loadings' field");
        assert_eq!(
            EngineError::routine("icc", "singular matrix").to_string(),
            "Routine 'icc' failed: singular matrix"
        );
    }
}
