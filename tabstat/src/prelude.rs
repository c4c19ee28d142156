//! Prelude for commonly used types and traits in tabstat.

pub use crate::config::PipelineConfig;
pub use crate::data::{AnalysisOptions, AnalysisParams, CellValue, Dataset, Role, VariableRoles};
pub use crate::engine::{ComputationEngine, EngineArg, EngineError, EngineOutput, ScriptedEngine};
pub use crate::error::{ErrorContext, ErrorKind, Result, TabstatError};
pub use crate::extract::ExtractionMode;
pub use crate::logging::LogConfig;
pub use crate::methods::{Category, MethodId};
pub use crate::result::{AnalysisOutput, CalculatorResult, ResultField};
pub use crate::router::Router;
pub use crate::validator::{ResultSchemaValidator, SchemaValidation};
