//! Input data model: cells, records, datasets, roles and options.
//!
//! A [`Dataset`] is supplied once per analysis request and is never mutated
//! by the pipeline. Callers describe which columns play which part in an
//! analysis through [`VariableRoles`], and tune individual methods through
//! [`AnalysisOptions`].

mod dataset;
mod params;
mod sources;
mod value;

pub use dataset::{DataRecord, Dataset};
pub use params::{AnalysisOptions, AnalysisParams, Alternative, Role, VariableRoles};
pub use value::CellValue;
