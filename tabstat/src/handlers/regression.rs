//! Linear, generalized linear and penalized regression.

use async_trait::async_trait;
use tracing::instrument;

use super::{numeric_requests, CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineOutput};
use crate::error::{Result, TabstatError};
use crate::extract::{AlignedColumns, ColumnRequest, MatrixBuilder};
use crate::methods::{Category, MethodId, RegressionMethod};
use crate::result::{
    interpret, AnalysisOutput, CategoryDetails, Coefficient, RegressionDetails, ResultTable,
};

const INTERCEPT: &str = "(Intercept)";

#[derive(Debug, Default, Clone, Copy)]
pub struct RegressionHandler;

#[async_trait]
impl CategoryHandler for RegressionHandler {
    type Method = RegressionMethod;

    fn category(&self) -> Category {
        Category::Regression
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: RegressionMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::Regression(method);
        id.check_roles(ctx.roles())?;

        match method {
            RegressionMethod::SimpleRegression => simple(id, ctx).await,
            RegressionMethod::PolynomialRegression => polynomial(id, ctx).await,
            _ => multivariable(id, method, ctx).await,
        }
    }
}

/// Dependent and predictors, aligned; the dependent is request 0.
fn extract_model<'a>(
    id: MethodId,
    ctx: &HandlerContext<'a>,
    binary_outcome: bool,
) -> Result<(String, Vec<&'a str>, AlignedColumns)> {
    let dependent = ctx.column(Role::Dependent)?;
    let predictors = ctx.columns(Role::Independent);
    let outcome = if binary_outcome {
        ColumnRequest::binary(Role::Dependent, dependent)
    } else {
        ColumnRequest::numeric(Role::Dependent, dependent)
    };
    let mut requests = vec![outcome];
    requests.extend(numeric_requests(Role::Independent, &predictors));
    let aligned = ctx.extract(id, &requests)?;
    Ok((dependent.to_string(), predictors, aligned))
}

/// Terms in engine order: intercept first, then `names`.
fn coefficients(raw: &EngineOutput, names: &[String]) -> Result<Vec<Coefficient>> {
    let estimates = raw.numbers("coefficients")?;
    if estimates.len() != names.len() {
        return Err(TabstatError::Engine(crate::engine::EngineError::InvalidField {
            routine: raw.routine().to_string(),
            field: "coefficients".to_string(),
            expected: format!("{} values", names.len()),
        }));
    }
    let errors = raw.optional_numbers("standardErrors")?;
    let statistics = raw.optional_numbers("statistics")?;
    let p_values = raw.optional_numbers("pValues")?;
    let at = |v: &Option<Vec<f64>>, i: usize| v.as_ref().and_then(|v| v.get(i).copied());
    Ok(names
        .iter()
        .zip(estimates)
        .enumerate()
        .map(|(i, (term, estimate))| Coefficient {
            term: term.clone(),
            estimate,
            std_error: at(&errors, i),
            statistic: at(&statistics, i),
            p_value: at(&p_values, i),
        })
        .collect())
}

fn coefficient_table(ctx: &HandlerContext<'_>, coefficients: &[Coefficient]) -> ResultTable {
    let fmt = ctx.format();
    let cell = |v: Option<f64>| v.map(|x| fmt.number(x)).unwrap_or_default();
    let mut table = ResultTable::new("Coefficients", ["Term", "Estimate", "SE", "Statistic", "p"]);
    for c in coefficients {
        table.push_row([
            c.term.clone(),
            fmt.number(c.estimate),
            cell(c.std_error),
            cell(c.statistic),
            c.p_value.map(|p| fmt.p_value(p)).unwrap_or_default(),
        ]);
    }
    table
}

/// Shared result assembly once coefficients and fit are known.
fn assemble(
    id: MethodId,
    ctx: &HandlerContext<'_>,
    raw: &EngineOutput,
    details: RegressionDetails,
    r_squared_label: &str,
) -> Result<AnalysisOutput> {
    let fmt = ctx.format();
    let r2 = details.r_squared;
    let n = details.n;
    let table = details
        .coefficients
        .as_deref()
        .map(|c| coefficient_table(ctx, c));
    let adjusted = details.adjusted_r_squared;

    let mut out = AnalysisOutput::new(id, CategoryDetails::Regression(details));
    if let Some(r2) = r2 {
        out.metric(r_squared_label, fmt.number(r2));
        out.effect_size = Some(r2);
    }
    if let Some(adj) = adjusted {
        out.metric("Adjusted R²", fmt.number(adj));
    }
    for (field, label) in [("fStatistic", "F"), ("chiSquare", "χ²")] {
        if let Some(stat) = raw.optional_number(field)? {
            out.statistic = Some(stat);
            out.metric(label, fmt.number(stat));
            break;
        }
    }
    if let Some(df) = raw.optional_number("df")? {
        out.df = Some(df);
        out.metric("df", fmt.df(df));
    }
    if let Some(p) = raw.optional_number("pValue")? {
        out.p_value = Some(p);
        out.metric("p-value", fmt.p_value(p));
    }
    if let Some(n) = n {
        out.metric("N", fmt.integer(n));
    }
    if let Some(table) = table {
        out.table(table);
    }

    let fit = match r2 {
        Some(r2) => format!(
            "The model explains {} of the variance ({r_squared_label} = {}), a {} fit",
            fmt.percent(r2),
            fmt.number(r2),
            interpret::r_squared(r2)
        ),
        None => "The model was fitted".to_string(),
    };
    let overall = match out.p_value {
        Some(p) => format!(
            "; the overall model is {} (p = {})",
            interpret::significance(p, ctx.alpha()),
            fmt.p_value(p)
        ),
        None => String::new(),
    };
    out.interpretation = format!("{fit}{overall}.");
    Ok(out)
}

async fn simple(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let (dependent, predictors, aligned) = extract_model(id, ctx, false)?;
    aligned.require_rows(3, id.display_name())?;

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(aligned.numbers(1)?.to_vec()),
                EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
            ],
        )
        .await?;
    let slope = raw.number("slope")?;
    let intercept = raw.number("intercept")?;
    let r2 = raw.number("rSquared")?;
    let coefficients = vec![
        Coefficient {
            term: INTERCEPT.to_string(),
            estimate: intercept,
            std_error: raw.optional_number("interceptStdError")?,
            statistic: None,
            p_value: raw.optional_number("interceptPValue")?,
        },
        Coefficient {
            term: predictors[0].to_string(),
            estimate: slope,
            std_error: raw.optional_number("slopeStdError")?,
            statistic: None,
            p_value: raw.optional_number("slopePValue")?,
        },
    ];
    let mut out = assemble(
        id,
        ctx,
        &raw,
        RegressionDetails {
            r_squared: Some(r2),
            adjusted_r_squared: raw.optional_number("adjustedRSquared")?,
            coefficients: Some(coefficients),
            n: Some(aligned.len()),
            ..Default::default()
        },
        "R²",
    )?;
    let fmt = ctx.format();
    out.metric("Slope", fmt.number(slope));
    out.metric("Intercept", fmt.number(intercept));
    out.interpretation = format!(
        "Each unit increase in {} changes {dependent} by {}. {}",
        predictors[0],
        fmt.number(slope),
        out.interpretation
    );
    Ok(out)
}

async fn polynomial(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let degree = ctx.options().degree.unwrap_or(2);
    if !(1..=10).contains(&degree) {
        return Err(TabstatError::validation(format!(
            "polynomial degree must be between 1 and 10 (got {degree})"
        )));
    }
    let (_, predictors, aligned) = extract_model(id, ctx, false)?;
    aligned.require_rows(degree + 2, id.display_name())?;

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(aligned.numbers(1)?.to_vec()),
                EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
                EngineArg::Scalar(degree as f64),
            ],
        )
        .await?;
    let x = predictors[0];
    let mut names = vec![INTERCEPT.to_string(), x.to_string()];
    names.extend((2..=degree).map(|power| format!("{x}^{power}")));
    let coefficients = coefficients(&raw, &names)?;

    let mut out = assemble(
        id,
        ctx,
        &raw,
        RegressionDetails {
            r_squared: Some(raw.number("rSquared")?),
            adjusted_r_squared: raw.optional_number("adjustedRSquared")?,
            coefficients: Some(coefficients),
            n: Some(aligned.len()),
            ..Default::default()
        },
        "R²",
    )?;
    out.metric("Degree", degree.to_string());
    Ok(out)
}

async fn multivariable(
    id: MethodId,
    method: RegressionMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let binary = method == RegressionMethod::LogisticRegression;
    let (dependent, predictors, aligned) = extract_model(id, ctx, binary)?;
    let k = predictors.len();
    let outcome = aligned.numbers(0)?;

    match method {
        RegressionMethod::LogisticRegression => {
            aligned.require_rows(2, id.display_name())?;
            let events = outcome.iter().filter(|v| **v == 1.0).count();
            if events == 0 || events == outcome.len() {
                return Err(TabstatError::validation(format!(
                    "outcome '{dependent}' must contain both 0 and 1"
                )));
            }
        }
        RegressionMethod::PoissonRegression => {
            aligned.require_rows(k + 1, id.display_name())?;
            if let Some(bad) = outcome.iter().find(|v| **v < 0.0 || v.fract() != 0.0) {
                return Err(TabstatError::validation(format!(
                    "outcome '{dependent}' must hold non-negative whole counts (found {bad})"
                )));
            }
        }
        RegressionMethod::RidgeRegression => aligned.require_rows(2, id.display_name())?,
        _ => aligned.require_rows(k + 1, id.display_name())?,
    }

    let matrix = MatrixBuilder::new(&aligned).row_major(&predictors)?;
    let mut args = vec![
        EngineArg::Matrix(matrix),
        EngineArg::Numbers(outcome.to_vec()),
    ];
    match method {
        RegressionMethod::StepwiseRegression => {
            let p_enter = ctx.options().p_enter.unwrap_or(0.05);
            let p_remove = ctx.options().p_remove.unwrap_or(0.10);
            if p_enter >= p_remove {
                return Err(TabstatError::validation(format!(
                    "entry threshold ({p_enter}) must be below removal threshold ({p_remove})"
                )));
            }
            args.push(EngineArg::Labels(
                predictors.iter().map(|p| p.to_string()).collect(),
            ));
            args.push(EngineArg::Scalar(p_enter));
            args.push(EngineArg::Scalar(p_remove));
        }
        RegressionMethod::RidgeRegression => {
            let lambda = ctx.options().ridge_lambda.unwrap_or(1.0);
            if !lambda.is_finite() || lambda < 0.0 {
                return Err(TabstatError::validation(format!(
                    "ridge penalty must be a non-negative number (got {lambda})"
                )));
            }
            args.push(EngineArg::Scalar(lambda));
        }
        _ => {}
    }

    let raw = ctx.invoke(id, args).await?;

    let selected = if method == RegressionMethod::StepwiseRegression {
        Some(raw.strings("selectedPredictors")?)
    } else {
        None
    };
    let mut names = vec![INTERCEPT.to_string()];
    match &selected {
        Some(selected) => names.extend(selected.iter().cloned()),
        None => names.extend(predictors.iter().map(|p| p.to_string())),
    }
    let coefficients = coefficients(&raw, &names)?;

    let generalized = matches!(
        method,
        RegressionMethod::LogisticRegression | RegressionMethod::PoissonRegression
    );
    let (r_squared, label) = if generalized {
        (raw.number("pseudoRSquared")?, "Pseudo R²")
    } else {
        (raw.number("rSquared")?, "R²")
    };
    let accuracy = raw.optional_number("accuracy")?;
    let aic = raw.optional_number("aic")?;

    let mut out = assemble(
        id,
        ctx,
        &raw,
        RegressionDetails {
            r_squared: Some(r_squared),
            adjusted_r_squared: raw.optional_number("adjustedRSquared")?,
            coefficients: Some(coefficients),
            n: Some(aligned.len()),
            selected_predictors: selected.clone(),
            accuracy,
            aic,
        },
        label,
    )?;
    let fmt = ctx.format();
    if let Some(accuracy) = accuracy {
        out.metric("Classification accuracy", fmt.percent(accuracy));
    }
    if let Some(aic) = aic {
        out.metric("AIC", fmt.number(aic));
    }
    if let Some(selected) = selected {
        out.metric("Selected predictors", selected.join(", "));
        out.interpretation = if selected.is_empty() {
            format!("No predictor of {dependent} met the entry criterion. {}", out.interpretation)
        } else {
            format!(
                "Stepwise selection retained {} of {k} predictors ({}). {}",
                selected.len(),
                selected.join(", "),
                out.interpretation
            )
        };
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::data::{AnalysisParams, CellValue, Dataset, VariableRoles};
    use crate::extract::Orientation;
    use crate::handlers::test_support::engine;
    use crate::result::ResultField;
    use serde_json::json;

    fn column(values: &[f64]) -> Vec<CellValue> {
        values.iter().copied().map(CellValue::from).collect()
    }

    #[tokio::test]
    async fn test_simple_regression_needs_three_rows() {
        let (scripted, handle) = engine(vec![]);
        let dataset = Dataset::from_columns(vec![
            ("x", column(&[1.0, 2.0])),
            ("y", column(&[2.0, 4.0])),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Dependent, "y")
                .with(Role::Independent, "x"),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let err = RegressionHandler
            .handle(RegressionMethod::SimpleRegression, &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("requires at least 3, found 2"));
        assert!(scripted.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_regression_layout() {
        let (scripted, handle) = engine(vec![(
            "multiple_regression",
            json!({
                "coefficients": [0.5, 1.0, -2.0],
                "pValues": [0.4, 0.01, 0.02],
                "rSquared": 0.81, "adjustedRSquared": 0.75,
                "fStatistic": 14.2, "pValue": 0.003
            }),
        )]);
        let dataset = Dataset::from_columns(vec![
            ("y", column(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("a", column(&[1.0, 1.5, 2.0, 2.5, 3.0])),
            ("b", column(&[0.0, 1.0, 0.0, 1.0, 0.0])),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Dependent, "y")
                .with_all(Role::Independent, ["a", "b"]),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = RegressionHandler
            .handle(RegressionMethod::MultipleRegression, &ctx)
            .await
            .unwrap();
        assert!(out.has_field(ResultField::RSquared));
        assert!(out.has_field(ResultField::Coefficients));
        assert_eq!(out.statistic, Some(14.2));
        let table = out.find_table("Coefficients").unwrap();
        assert_eq!(table.row("b").unwrap()[1], "-2.0000");

        let calls = scripted.calls().await;
        match &calls[0].args[0] {
            EngineArg::Matrix(m) => {
                assert_eq!(m.orientation(), Orientation::RowMajor);
                assert_eq!(m.data()[1], vec![1.5, 1.0]);
            }
            other => panic!("unexpected argument {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_logistic_requires_binary_outcome() {
        let (_, handle) = engine(vec![]);
        let dataset = Dataset::from_columns(vec![
            ("passed", column(&[0.0, 1.0, 2.0])),
            ("hours", column(&[1.0, 2.0, 3.0])),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Dependent, "passed")
                .with(Role::Independent, "hours"),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let err = RegressionHandler
            .handle(RegressionMethod::LogisticRegression, &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("binary"));

        let dataset = Dataset::from_columns(vec![
            ("passed", column(&[1.0, 1.0, 1.0])),
            ("hours", column(&[1.0, 2.0, 3.0])),
        ]);
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);
        let err = RegressionHandler
            .handle(RegressionMethod::LogisticRegression, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "outcome 'passed' must contain both 0 and 1");
    }

    #[tokio::test]
    async fn test_stepwise_uses_selected_terms() {
        let (_, handle) = engine(vec![(
            "stepwise_regression",
            json!({
                "selectedPredictors": ["b"],
                "coefficients": [1.0, 0.7],
                "rSquared": 0.4
            }),
        )]);
        let dataset = Dataset::from_columns(vec![
            ("y", column(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("a", column(&[5.0, 3.0, 4.0, 1.0, 2.0])),
            ("b", column(&[1.0, 2.0, 2.0, 4.0, 5.0])),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Dependent, "y")
                .with_all(Role::Independent, ["a", "b"]),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = RegressionHandler
            .handle(RegressionMethod::StepwiseRegression, &ctx)
            .await
            .unwrap();
        assert_eq!(out.metric_value("Selected predictors"), Some("b"));
        assert!(out.find_table("Coefficients").unwrap().row("b").is_some());
        assert!(out.interpretation.starts_with("Stepwise selection retained 1 of 2"));
    }
}
