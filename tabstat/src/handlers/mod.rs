//! Category handlers.
//!
//! One handler per method family. Every handler follows the same contract:
//!
//! 1. check the declared roles and method-specific preconditions,
//! 2. extract aligned arrays or matrices in the layout the routine expects,
//! 3. invoke the engine through the [`EngineHandle`],
//! 4. map the routine's named fields into metrics, tables, an interpretation
//!    and the category's details.
//!
//! Steps 1 and 2 never touch the engine, so a request that is going to fail
//! locally fails before any engine call. Errors are returned, not caught; the
//! router turns them into structured failures.

mod clustering;
mod comparison;
mod correlation;
mod descriptive;
mod dimension;
mod goodness_of_fit;
mod posthoc;
mod power;
mod regression;
mod reliability;
mod survival;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::data::{AnalysisOptions, AnalysisParams, Dataset, Role, VariableRoles};
use crate::engine::{EngineArg, EngineHandle, EngineOutput};
use crate::error::{Result, TabstatError};
use crate::extract::{AlignedColumns, ColumnRequest, ExtractionMode, Extractor, GroupedValues};
use crate::methods::{Category, MethodId};
use crate::result::{AnalysisOutput, GroupStat, NumberFormat};

pub use clustering::ClusteringHandler;
pub use comparison::ComparisonHandler;
pub use correlation::CorrelationHandler;
pub use descriptive::DescriptiveHandler;
pub use dimension::DimensionReductionHandler;
pub use goodness_of_fit::GoodnessOfFitHandler;
pub use posthoc::PostHocHandler;
pub use power::PowerHandler;
pub use regression::RegressionHandler;
pub use reliability::ReliabilityHandler;
pub use survival::SurvivalHandler;

/// The shared handler contract.
#[async_trait]
pub trait CategoryHandler: Send + Sync + std::fmt::Debug {
    /// The family enum this handler serves.
    type Method: Copy + Send + Sync;

    fn category(&self) -> Category;

    /// Runs one method of the family end to end.
    async fn handle(&self, method: Self::Method, ctx: &HandlerContext<'_>)
        -> Result<AnalysisOutput>;
}

/// Everything a handler may read during one dispatch.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub dataset: &'a Dataset,
    pub params: &'a AnalysisParams,
    pub engine: &'a EngineHandle,
    pub config: &'a PipelineConfig,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        dataset: &'a Dataset,
        params: &'a AnalysisParams,
        engine: &'a EngineHandle,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            dataset,
            params,
            engine,
            config,
        }
    }

    pub fn roles(&self) -> &'a VariableRoles {
        &self.params.roles
    }

    pub fn options(&self) -> &'a AnalysisOptions {
        &self.params.options
    }

    /// Significance level for this call.
    pub fn alpha(&self) -> f64 {
        self.options()
            .alpha
            .filter(|a| *a > 0.0 && *a < 1.0)
            .unwrap_or(self.config.alpha)
    }

    pub fn confidence_level(&self) -> f64 {
        self.options()
            .confidence_level
            .filter(|c| *c > 0.0 && *c < 1.0)
            .unwrap_or(1.0 - self.alpha())
    }

    pub fn format(&self) -> NumberFormat {
        NumberFormat::from(self.config)
    }

    /// First column assigned to `role`; the role's domain message otherwise.
    pub fn column(&self, role: Role) -> Result<&'a str> {
        self.roles()
            .first(role)
            .ok_or_else(|| TabstatError::validation(role.missing_message()))
    }

    pub fn columns(&self, role: Role) -> Vec<&'a str> {
        self.roles().get(role)
    }

    /// The extraction policy for `method`, honouring a per-call override.
    pub fn extraction_mode(&self, method: MethodId) -> ExtractionMode {
        self.options()
            .extraction_mode
            .unwrap_or_else(|| method.extraction_mode())
    }

    pub fn extract(&self, method: MethodId, requests: &[ColumnRequest]) -> Result<AlignedColumns> {
        Extractor::new(self.extraction_mode(method))
            .with_log_config(self.config.log.clone())
            .extract(self.dataset, requests)
    }

    /// Calls the method's routine.
    pub async fn invoke(&self, method: MethodId, args: Vec<EngineArg>) -> Result<EngineOutput> {
        Ok(self.engine.invoke(method.routine(), args).await?)
    }
}

/// Numeric requests for every column in `columns`, all under `role`.
pub(crate) fn numeric_requests(role: Role, columns: &[&str]) -> Vec<ColumnRequest> {
    columns
        .iter()
        .map(|c| ColumnRequest::numeric(role, *c))
        .collect()
}

/// Size, mean and (if the engine reported them) standard deviations per group.
pub(crate) fn group_stats(
    grouped: &GroupedValues,
    std_devs: Option<Vec<f64>>,
) -> Vec<GroupStat> {
    grouped
        .names()
        .iter()
        .zip(grouped.groups())
        .enumerate()
        .map(|(i, (name, values))| GroupStat {
            name: name.clone(),
            n: values.len(),
            mean: mean(values),
            std_dev: std_devs.as_ref().and_then(|sd| sd.get(i).copied()),
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Fails unless `value` is a finite number strictly inside `(low, high)`.
pub(crate) fn require_open_range(name: &str, value: f64, low: f64, high: f64) -> Result<f64> {
    if value.is_finite() && value > low && value < high {
        Ok(value)
    } else {
        Err(TabstatError::validation(format!(
            "{name} must be between {low} and {high} (got {value})"
        )))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::engine::ScriptedEngine;

    /// Builds a ready engine handle serving `responses`.
    pub fn engine(responses: Vec<(&str, Value)>) -> (Arc<ScriptedEngine>, EngineHandle) {
        let scripted = responses
            .into_iter()
            .fold(ScriptedEngine::ready(), |e, (routine, value)| {
                e.with_response(routine, value)
            });
        let scripted = Arc::new(scripted);
        let handle = EngineHandle::new(scripted.clone());
        (scripted, handle)
    }
}
