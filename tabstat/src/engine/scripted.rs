//! A substitute engine that replays canned outputs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{ComputationEngine, EngineArg, EngineError, EngineOutput, EngineResult};

/// One call the engine received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub routine: String,
    pub args: Vec<EngineArg>,
}

#[derive(Debug, Clone)]
enum Script {
    Respond(Value),
    Fail(String),
}

/// Serves a fixed JSON object per routine and records every call.
///
/// Useful for deterministic tests and for running the pipeline without the
/// real numerical backend.
///
/// ```rust
/// use serde_json::json;
/// use tabstat::engine::ScriptedEngine;
///
/// let engine = ScriptedEngine::ready()
///     .with_response("pearson_correlation", json!({"r": 0.8, "pValue": 0.01}));
/// assert!(engine.has_script("pearson_correlation"));
/// ```
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    scripts: HashMap<String, Script>,
    initialized: AtomicBool,
    fail_initialization: Option<String>,
    latency: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedEngine {
    /// An engine that still needs [`initialize`](ComputationEngine::initialize).
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that is already initialized.
    pub fn ready() -> Self {
        let engine = Self::default();
        engine.initialized.store(true, Ordering::SeqCst);
        engine
    }

    pub fn with_response(mut self, routine: impl Into<String>, output: Value) -> Self {
        self.scripts.insert(routine.into(), Script::Respond(output));
        self
    }

    pub fn with_failure(mut self, routine: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts
            .insert(routine.into(), Script::Fail(message.into()));
        self
    }

    /// Makes [`initialize`](ComputationEngine::initialize) fail.
    pub fn with_failing_initialization(mut self, message: impl Into<String>) -> Self {
        self.fail_initialization = Some(message.into());
        self
    }

    /// Delays every call, to make overlapping calls observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn has_script(&self, routine: &str) -> bool {
        self.scripts.contains_key(routine)
    }

    /// Calls received so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Highest number of calls that were ever running at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputationEngine for ScriptedEngine {
    async fn initialize(&self) -> EngineResult<()> {
        if let Some(ref message) = self.fail_initialization {
            return Err(EngineError::Initialization(message.clone()));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn call(&self, routine: &str, args: Vec<EngineArg>) -> EngineResult<EngineOutput> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        self.calls.lock().await.push(RecordedCall {
            routine: routine.to_string(),
            args,
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let result = match self.scripts.get(routine) {
            Some(Script::Respond(value)) => EngineOutput::from_value(routine, value.clone()),
            Some(Script::Fail(message)) => Err(EngineError::routine(routine, message.clone())),
            None => Err(EngineError::routine(routine, "no scripted response")),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_and_records() {
        let engine = ScriptedEngine::ready().with_response("shapiro_wilk", json!({"w": 0.97}));
        let out = engine
            .call("shapiro_wilk", vec![EngineArg::Numbers(vec![1.0, 2.0, 3.0])])
            .await
            .unwrap();
        assert_eq!(out.number("w").unwrap(), 0.97);

        let calls = engine.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].routine, "shapiro_wilk");
    }

    #[tokio::test]
    async fn test_unscripted_and_failing_routines() {
        let engine = ScriptedEngine::ready().with_failure("icc", "singular matrix");
        let err = engine.call("icc", vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "Routine 'icc' failed: singular matrix");

        let err = engine.call("pca", vec![]).await.unwrap_err();
        assert!(err.to_string().contains("no scripted response"));
    }

    #[tokio::test]
    async fn test_initialization() {
        let engine = ScriptedEngine::new();
        assert!(!engine.is_initialized());
        engine.initialize().await.unwrap();
        assert!(engine.is_initialized());

        let broken = ScriptedEngine::new().with_failing_initialization("missing runtime");
        assert!(matches!(
            broken.initialize().await,
            Err(EngineError::Initialization(_))
        ));
        assert!(!broken.is_initialized());
    }
}
