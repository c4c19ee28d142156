//! Method dispatch.
//!
//! The [`Router`] resolves a method id, hands the call to the category
//! handler and converts every error into a structured
//! [`CalculatorResult::Failure`]. Dispatch never panics and never lets an
//! error escape.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::data::{AnalysisParams, Dataset};
use crate::engine::{ComputationEngine, EngineHandle, EngineResult};
use crate::error::{Result, TabstatError};
use crate::handlers::{
    CategoryHandler, ClusteringHandler, ComparisonHandler, CorrelationHandler,
    DescriptiveHandler, DimensionReductionHandler, GoodnessOfFitHandler, HandlerContext,
    PostHocHandler, PowerHandler, RegressionHandler, ReliabilityHandler, SurvivalHandler,
};
use crate::methods::{MethodDescriptor, MethodId};
use crate::result::{AnalysisOutput, CalculatorResult};

/// Entry point of the pipeline.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use serde_json::json;
/// use tabstat::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let engine = ScriptedEngine::ready().with_response(
///     "descriptive_stats",
///     json!({"mean": 2.0, "stdDev": 1.0}),
/// );
/// let router = Router::new(Arc::new(engine));
///
/// let dataset = Dataset::from_columns(vec![("x", vec![1.0, 2.0, 3.0])]);
/// let params = AnalysisParams::new(VariableRoles::new().with(Role::Variables, "x"));
/// let result = router.dispatch("descriptive-stats", &dataset, &params).await;
/// assert!(result.is_success());
///
/// let result = router.dispatch("no-such-test", &dataset, &params).await;
/// assert_eq!(result.error(), Some("unsupported method: no-such-test"));
/// # }
/// ```
#[derive(Debug)]
pub struct Router {
    engine: EngineHandle,
    config: PipelineConfig,
}

impl Router {
    pub fn new(engine: Arc<dyn ComputationEngine>) -> Self {
        Self::with_config(engine, PipelineConfig::default())
    }

    pub fn with_config(engine: Arc<dyn ComputationEngine>, config: PipelineConfig) -> Self {
        Self {
            engine: EngineHandle::new(engine).with_log_config(config.log.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Initializes the engine. Dispatches made before this fail with
    /// an engine-not-ready error.
    pub async fn initialize(&self) -> EngineResult<()> {
        self.engine.initialize().await
    }

    /// Every registered method id.
    pub fn supported_methods(&self) -> Vec<&'static str> {
        MethodId::all().into_iter().map(|m| m.id()).collect()
    }

    pub fn descriptor(&self, method_id: &str) -> Option<MethodDescriptor> {
        MethodId::from_id(method_id).map(|m| m.descriptor())
    }

    /// Runs one analysis.
    #[instrument(skip(self, dataset, params), fields(rows = dataset.len()))]
    pub async fn dispatch(
        &self,
        method_id: &str,
        dataset: &Dataset,
        params: &AnalysisParams,
    ) -> CalculatorResult {
        let result = match MethodId::from_id(method_id) {
            Some(method) => self.run(method, dataset, params).await,
            None => Err(TabstatError::UnsupportedMethod(method_id.to_string())),
        };
        match &result {
            Ok(_) => info!(method = method_id, "Analysis completed"),
            Err(e) => warn!(method = method_id, kind = %e.kind(), error = %e, "Analysis failed"),
        }
        result.into()
    }

    async fn run(
        &self,
        method: MethodId,
        dataset: &Dataset,
        params: &AnalysisParams,
    ) -> Result<AnalysisOutput> {
        let ctx = HandlerContext::new(dataset, params, &self.engine, &self.config);
        match method {
            MethodId::Descriptive(m) => DescriptiveHandler.handle(m, &ctx).await,
            MethodId::Comparison(m) => ComparisonHandler.handle(m, &ctx).await,
            MethodId::PostHoc(m) => PostHocHandler.handle(m, &ctx).await,
            MethodId::Regression(m) => RegressionHandler.handle(m, &ctx).await,
            MethodId::Correlation(m) => CorrelationHandler.handle(m, &ctx).await,
            MethodId::DimensionReduction(m) => DimensionReductionHandler.handle(m, &ctx).await,
            MethodId::Clustering(m) => ClusteringHandler.handle(m, &ctx).await,
            MethodId::GoodnessOfFit(m) => GoodnessOfFitHandler.handle(m, &ctx).await,
            MethodId::Reliability(m) => ReliabilityHandler.handle(m, &ctx).await,
            MethodId::PowerAnalysis(m) => PowerHandler.handle(m, &ctx).await,
            MethodId::Survival(m) => SurvivalHandler.handle(m, &ctx).await,
        }
    }
}
