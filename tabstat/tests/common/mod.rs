//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use tabstat::prelude::*;

/// A ready scripted engine serving the given routines.
pub fn scripted(responses: Vec<(&str, Value)>) -> Arc<ScriptedEngine> {
    let engine = responses
        .into_iter()
        .fold(ScriptedEngine::ready(), |engine, (routine, output)| {
            engine.with_response(routine, output)
        });
    Arc::new(engine)
}

/// A router over `engine` with the default configuration.
pub fn router(engine: &Arc<ScriptedEngine>) -> Router {
    Router::new(engine.clone())
}

/// Nine scores in three arms of three.
pub fn three_arm_dataset() -> Dataset {
    Dataset::from_json_rows(
        r#"[
            {"score": 1, "arm": "a"}, {"score": 2, "arm": "a"}, {"score": 3, "arm": "a"},
            {"score": 4, "arm": "b"}, {"score": 5, "arm": "b"}, {"score": 6, "arm": "b"},
            {"score": 7, "arm": "c"}, {"score": 8, "arm": "c"}, {"score": 9, "arm": "c"}
        ]"#,
    )
    .unwrap()
}

/// Follow-up data whose second row carries an unusable time.
pub fn survival_dataset() -> Dataset {
    Dataset::from_json_rows(
        r#"[
            {"time": 5, "died": 1, "age": 60, "dose": 1},
            {"time": "n/a", "died": 1, "age": 70, "dose": 2},
            {"time": 8, "died": 0, "age": 50, "dose": 3},
            {"time": 3, "died": 1, "age": 65, "dose": 4},
            {"time": 9, "died": 1, "age": 55, "dose": 5}
        ]"#,
    )
    .unwrap()
}

pub fn params(roles: VariableRoles) -> AnalysisParams {
    AnalysisParams::new(roles)
}
