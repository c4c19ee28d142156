//! # tabstat - from tabular uploads to structured statistical results
//!
//! tabstat sits between user-uploaded tables and a numerical computation
//! engine. It pulls the columns an analysis needs out of loosely typed
//! records, aligns them row by row, shapes them into the arrays or matrices
//! the engine expects, dispatches one of 55 registered methods and turns the
//! engine's raw fields into formatted metrics, tables and an interpretation.
//! A separate validator scores how complete a produced result is.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use tabstat::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Any ComputationEngine works; the scripted one serves canned outputs.
//! let engine = ScriptedEngine::ready().with_response(
//!     "one_way_anova",
//!     json!({
//!         "fStatistic": 12.5, "pValue": 0.001,
//!         "dfBetween": 2, "dfWithin": 6, "dfTotal": 8,
//!         "ssBetween": 24.0, "ssWithin": 5.76, "ssTotal": 29.76,
//!         "msBetween": 12.0, "msWithin": 0.96, "etaSquared": 0.806
//!     }),
//! );
//! let router = Router::new(Arc::new(engine));
//!
//! let dataset = Dataset::from_json_rows(r#"[
//!     {"score": 1, "arm": "a"}, {"score": 2, "arm": "a"}, {"score": 3, "arm": "a"},
//!     {"score": 4, "arm": "b"}, {"score": 5, "arm": "b"}, {"score": 6, "arm": "b"},
//!     {"score": 7, "arm": "c"}, {"score": 8, "arm": "c"}, {"score": 9, "arm": "c"}
//! ]"#).unwrap();
//! let params = AnalysisParams::new(
//!     VariableRoles::new().with(Role::Dependent, "score").with(Role::Group, "arm"),
//! );
//!
//! let result = router.dispatch("one-way-anova", &dataset, &params).await;
//! let output = result.output().unwrap();
//! assert!(output.find_table("ANOVA").is_some());
//!
//! let report = ResultSchemaValidator::new().validate(output, "one-way-anova");
//! assert!(report.valid);
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`data`**: cells, records, datasets, variable roles and per-call options
//! - **`extract`**: the column extractor and aligner, grouping and the matrix builder
//! - **`methods`**: the closed registry of method ids, their roles and routine signatures
//! - **`engine`**: the [`engine::ComputationEngine`] seam and the single-flight handle
//! - **`handlers`**: one category handler per method family
//! - **`router`**: dispatch and error-to-failure conversion
//! - **`result`**: result types, formatting and interpretation bands
//! - **`validator`**: result schema validation and completeness scoring
//! - **`logging`** and **`config`**: the ambient stack

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod logging;
pub mod methods;
pub mod prelude;
pub mod result;
pub mod router;
pub mod validator;
