//! A-priori power and sample size.
//!
//! These methods read no data. When `sample_size` is given the engine
//! solves for power; otherwise it solves for the sample size that reaches
//! the target `power` (0.80 when unset).

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{require_open_range, CategoryHandler, HandlerContext};
use crate::engine::EngineArg;
use crate::error::{Result, TabstatError};
use crate::methods::{Category, MethodId, PowerMethod};
use crate::result::{AnalysisOutput, CategoryDetails, PowerDetails};

const DEFAULT_POWER: f64 = 0.8;

/// What the engine is asked to solve for.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SolveFor {
    Power { sample_size: usize },
    SampleSize { power: f64 },
}

impl SolveFor {
    fn as_str(&self) -> &'static str {
        match self {
            SolveFor::Power { .. } => "power",
            SolveFor::SampleSize { .. } => "sampleSize",
        }
    }

    fn given(&self) -> f64 {
        match self {
            SolveFor::Power { sample_size } => *sample_size as f64,
            SolveFor::SampleSize { power } => *power,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PowerHandler;

#[async_trait]
impl CategoryHandler for PowerHandler {
    type Method = PowerMethod;

    fn category(&self) -> Category {
        Category::PowerAnalysis
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(&self, method: PowerMethod, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
        let id = MethodId::PowerAnalysis(method);
        id.check_roles(ctx.roles())?;
        let options = ctx.options();

        let effect = options
            .effect_size
            .ok_or_else(|| TabstatError::validation("effect size required"))?;
        let effect = match method {
            PowerMethod::Correlation => require_open_range("effect size", effect.abs(), 0.0, 1.0)?,
            _ if effect.is_finite() && effect > 0.0 => effect,
            _ => {
                return Err(TabstatError::validation(format!(
                    "effect size must be positive (got {effect})"
                )))
            }
        };
        let alpha = require_open_range("alpha", ctx.alpha(), 0.0, 1.0)?;
        let minimum_n = match method {
            PowerMethod::Correlation => 4,
            _ => 2,
        };
        let solve = match options.sample_size {
            Some(n) if n < minimum_n => {
                return Err(TabstatError::insufficient("sample size", minimum_n, n))
            }
            Some(n) => SolveFor::Power { sample_size: n },
            None => SolveFor::SampleSize {
                power: require_open_range(
                    "power",
                    options.power.unwrap_or(DEFAULT_POWER),
                    0.0,
                    1.0,
                )?,
            },
        };

        let args = match method {
            PowerMethod::TTest => vec![
                EngineArg::Scalar(effect),
                EngineArg::Scalar(alpha),
                EngineArg::Text(options.alternative.as_str().to_string()),
                EngineArg::Scalar(solve.given()),
                EngineArg::Text(solve.as_str().to_string()),
            ],
            PowerMethod::Anova => {
                let groups = options
                    .groups
                    .ok_or_else(|| TabstatError::validation("number of groups required"))?;
                if groups < 2 {
                    return Err(TabstatError::validation(format!(
                        "minimum 2 groups required (found {groups})"
                    )));
                }
                vec![
                    EngineArg::Scalar(effect),
                    EngineArg::Scalar(alpha),
                    EngineArg::Scalar(groups as f64),
                    EngineArg::Text(solve.as_str().to_string()),
                    EngineArg::Scalar(solve.given()),
                ]
            }
            PowerMethod::Correlation => vec![
                EngineArg::Scalar(effect),
                EngineArg::Scalar(alpha),
                EngineArg::Text(solve.as_str().to_string()),
                EngineArg::Scalar(solve.given()),
            ],
        };
        let raw = ctx.invoke(id, args).await?;
        let power = raw.number("power")?;
        let sample_size = raw.count("sampleSize")?;
        debug!(power, sample_size, solve_for = solve.as_str(), "Power solved");

        let fmt = ctx.format();
        let mut out = AnalysisOutput::new(
            id,
            CategoryDetails::PowerAnalysis(PowerDetails {
                power: Some(power),
                sample_size: Some(sample_size),
                alpha: Some(alpha),
                solve_for: Some(solve.as_str().to_string()),
            }),
        );
        out.effect_size = Some(effect);
        let effect_label = match method {
            PowerMethod::TTest => "d",
            PowerMethod::Anova => "f",
            PowerMethod::Correlation => "r",
        };
        let per = match method {
            PowerMethod::TTest | PowerMethod::Anova => " per group",
            PowerMethod::Correlation => "",
        };
        out.metric("Effect size", format!("{effect_label} = {}", fmt.number(effect)));
        out.metric("α", fmt.number(alpha));
        out.metric("Power", fmt.percent(power));
        out.metric(format!("Sample size{per}"), fmt.integer(sample_size));

        out.interpretation = match solve {
            SolveFor::Power { .. } => {
                let adequacy = if power >= DEFAULT_POWER {
                    "adequate"
                } else {
                    "below the conventional 80%"
                };
                format!(
                    "With {sample_size} participants{per}, the power to detect {effect_label} = {} at α = {alpha} is {} ({adequacy}).",
                    fmt.number(effect),
                    fmt.percent(power)
                )
            }
            SolveFor::SampleSize { power: target } => format!(
                "{sample_size} participants{per} are needed to detect {effect_label} = {} with {} power at α = {alpha}.",
                fmt.number(effect),
                fmt.percent(target)
            ),
        };
        Ok(out)
    }
}
