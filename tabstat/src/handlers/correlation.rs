//! Bivariate, partial and matrix correlations.

use async_trait::async_trait;
use tracing::instrument;

use super::{numeric_requests, CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineOutput};
use crate::error::{Result, TabstatError};
use crate::extract::MatrixBuilder;
use crate::methods::{Category, CorrelationMethod, MethodId};
use crate::result::{
    interpret, AnalysisOutput, CategoryDetails, ConfidenceInterval, CorrelationDetails,
    ResultTable,
};

const MATRIX_METHODS: [&str; 3] = ["pearson", "spearman", "kendall"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationHandler;

#[async_trait]
impl CategoryHandler for CorrelationHandler {
    type Method = CorrelationMethod;

    fn category(&self) -> Category {
        Category::Correlation
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: CorrelationMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::Correlation(method);
        id.check_roles(ctx.roles())?;

        match method {
            CorrelationMethod::Matrix => matrix(id, ctx).await,
            _ => pairwise(id, method, ctx).await,
        }
    }
}

fn coefficient_name(method: CorrelationMethod) -> (&'static str, &'static str) {
    match method {
        CorrelationMethod::Spearman => ("rho", "ρ"),
        CorrelationMethod::Kendall => ("tau", "τ"),
        _ => ("r", "r"),
    }
}

fn confidence(raw: &EngineOutput, level: f64) -> Result<Option<ConfidenceInterval>> {
    Ok(match (raw.optional_number("ciLower")?, raw.optional_number("ciUpper")?) {
        (Some(lower), Some(upper)) => Some(ConfidenceInterval {
            lower,
            upper,
            level,
        }),
        _ => None,
    })
}

async fn pairwise(
    id: MethodId,
    method: CorrelationMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let variables = ctx.columns(Role::Variables);
    let covariates = ctx.columns(Role::Covariates);
    let mut requests = numeric_requests(Role::Variables, &variables);
    requests.extend(numeric_requests(Role::Covariates, &covariates));
    let aligned = ctx.extract(id, &requests)?;
    aligned.require_rows(3 + covariates.len(), id.display_name())?;

    let mut args = vec![
        EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
        EngineArg::Numbers(aligned.numbers(1)?.to_vec()),
    ];
    if method == CorrelationMethod::Partial {
        args.push(EngineArg::Matrix(
            MatrixBuilder::new(&aligned).column_major(&covariates)?,
        ));
    }
    let raw = ctx.invoke(id, args).await?;

    let (field, symbol) = coefficient_name(method);
    let coefficient = raw.number(field)?;
    let p = raw.number("pValue")?;
    let fmt = ctx.format();

    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::Correlation(CorrelationDetails {
            n: Some(aligned.len()),
            variables: Some(variables.iter().map(|v| v.to_string()).collect()),
            controlled_for: (!covariates.is_empty())
                .then(|| covariates.iter().map(|c| c.to_string()).collect()),
            ..Default::default()
        }),
    );
    out.statistic = Some(coefficient);
    out.effect_size = Some(coefficient);
    out.p_value = Some(p);
    out.df = raw.optional_number("df")?;
    out.metric(symbol, fmt.number(coefficient));
    out.metric("p-value", fmt.p_value(p));
    out.metric("N", fmt.integer(aligned.len()));
    if let Some(ci) = confidence(&raw, ctx.confidence_level())? {
        out.metric(
            format!("{:.0}% CI", ci.level * 100.0),
            fmt.interval(ci.lower, ci.upper),
        );
        out.confidence = Some(ci);
    }

    let control = if covariates.is_empty() {
        String::new()
    } else {
        format!(", controlling for {}", covariates.join(", "))
    };
    out.interpretation = format!(
        "There is a {} {} relationship between {} and {}{control} ({symbol} = {}); it is {} (p = {}).",
        interpret::correlation(coefficient),
        interpret::direction(coefficient),
        variables[0],
        variables[1],
        fmt.number(coefficient),
        interpret::significance(p, ctx.alpha()),
        fmt.p_value(p),
    );
    Ok(out)
}

async fn matrix(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let method = ctx
        .options()
        .correlation_method
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| "pearson".to_string());
    if !MATRIX_METHODS.contains(&method.as_str()) {
        return Err(TabstatError::validation(format!(
            "unknown correlation method '{method}' (expected one of {})",
            MATRIX_METHODS.join(", ")
        )));
    }
    let variables = ctx.columns(Role::Variables);
    let aligned = ctx.extract(id, &numeric_requests(Role::Variables, &variables))?;
    aligned.require_rows(3, id.display_name())?;
    let block = MatrixBuilder::new(&aligned).column_major(&variables)?;

    let raw = ctx
        .invoke(id, vec![EngineArg::Matrix(block), EngineArg::Text(method.clone())])
        .await?;
    let k = variables.len();
    let coefficients = raw.matrix("matrix")?;
    if coefficients.len() != k || coefficients.iter().any(|row| row.len() != k) {
        return Err(crate::engine::EngineError::InvalidField {
            routine: raw.routine().to_string(),
            field: "matrix".to_string(),
            expected: format!("a {k}×{k} matrix"),
        }
        .into());
    }
    let p_values = raw.optional_matrix("pValues")?;

    // Strongest off-diagonal pair becomes the headline.
    let mut strongest = (0, 1);
    for i in 0..k {
        for j in (i + 1)..k {
            if coefficients[i][j].abs() > coefficients[strongest.0][strongest.1].abs() {
                strongest = (i, j);
            }
        }
    }
    let (a, b) = strongest;
    let r = coefficients[a][b];
    let p = p_values.as_ref().and_then(|m| m.get(a)?.get(b).copied());

    let fmt = ctx.format();
    let mut header = vec![String::new()];
    header.extend(variables.iter().map(|v| v.to_string()));
    let mut table = ResultTable::new("Correlation Matrix", header);
    for (name, row) in variables.iter().zip(&coefficients) {
        let mut cells = vec![name.to_string()];
        cells.extend(row.iter().map(|v| fmt.number(*v)));
        table.push_row(cells);
    }

    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::Correlation(CorrelationDetails {
            n: Some(aligned.len()),
            variables: Some(variables.iter().map(|v| v.to_string()).collect()),
            matrix: Some(coefficients.clone()),
            p_values: p_values.clone(),
            controlled_for: None,
        }),
    );
    out.statistic = Some(r);
    out.effect_size = Some(r);
    out.p_value = p;
    out.metric("Method", method);
    out.metric("Strongest pair", format!("{} / {}", variables[a], variables[b]));
    out.metric("Strongest coefficient", fmt.number(r));
    if let Some(p) = p {
        out.metric("p-value", fmt.p_value(p));
    }
    out.metric("N", fmt.integer(aligned.len()));
    out.table(table);

    let significance = p
        .map(|p| format!(", {} (p = {})", interpret::significance(p, ctx.alpha()), fmt.p_value(p)))
        .unwrap_or_default();
    out.interpretation = format!(
        "Across {k} variables the strongest association is a {} {} correlation between {} and {} ({}){significance}.",
        interpret::correlation(r),
        interpret::direction(r),
        variables[a],
        variables[b],
        fmt.number(r),
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::data::{AnalysisOptions, AnalysisParams, CellValue, Dataset, VariableRoles};
    use crate::extract::Orientation;
    use crate::handlers::test_support::engine;
    use crate::result::ResultField;
    use serde_json::json;

    fn column(values: &[f64]) -> Vec<CellValue> {
        values.iter().copied().map(CellValue::from).collect()
    }

    fn dataset() -> Dataset {
        Dataset::from_columns(vec![
            ("a", column(&[1.0, 2.0, 3.0, 4.0])),
            ("b", column(&[2.0, 1.0, 4.0, 3.0])),
            ("c", column(&[4.0, 3.0, 2.0, 1.0])),
        ])
    }

    #[tokio::test]
    async fn test_pearson() {
        let (_, handle) = engine(vec![(
            "pearson_correlation",
            json!({"r": 0.6, "pValue": 0.4, "ciLower": -0.8, "ciUpper": 0.99}),
        )]);
        let dataset = dataset();
        let params = AnalysisParams::new(VariableRoles::new().with_all(Role::Variables, ["a", "b"]));
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = CorrelationHandler
            .handle(CorrelationMethod::Pearson, &ctx)
            .await
            .unwrap();
        assert_eq!(out.statistic, Some(0.6));
        assert!(out.has_field(ResultField::Confidence));
        assert!(out.has_field(ResultField::N));
        assert!(out.interpretation.contains("strong positive"));
    }

    #[tokio::test]
    async fn test_partial_sends_column_major_covariates() {
        let (scripted, handle) = engine(vec![(
            "partial_correlation",
            json!({"r": -0.2, "pValue": 0.7}),
        )]);
        let dataset = dataset();
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with_all(Role::Variables, ["a", "b"])
                .with(Role::Covariates, "c"),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = CorrelationHandler
            .handle(CorrelationMethod::Partial, &ctx)
            .await
            .unwrap();
        assert!(out.interpretation.contains("controlling for c"));
        let calls = scripted.calls().await;
        match &calls[0].args[2] {
            EngineArg::Matrix(m) => {
                assert_eq!(m.orientation(), Orientation::ColumnMajor);
                assert_eq!(m.data(), &[vec![4.0, 3.0, 2.0, 1.0]]);
            }
            other => panic!("unexpected argument {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_matrix_headline_is_strongest_pair() {
        let (_, handle) = engine(vec![(
            "correlation_matrix",
            json!({
                "matrix": [[1.0, 0.4, -0.9], [0.4, 1.0, -0.3], [-0.9, -0.3, 1.0]],
                "pValues": [[0.0, 0.6, 0.01], [0.6, 0.0, 0.7], [0.01, 0.7, 0.0]]
            }),
        )]);
        let dataset = dataset();
        let params = AnalysisParams::new(
            VariableRoles::new().with_all(Role::Variables, ["a", "b", "c"]),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = CorrelationHandler
            .handle(CorrelationMethod::Matrix, &ctx)
            .await
            .unwrap();
        assert_eq!(out.statistic, Some(-0.9));
        assert_eq!(out.p_value, Some(0.01));
        assert_eq!(out.metric_value("Strongest pair"), Some("a / c"));
        assert_eq!(out.find_table("Correlation Matrix").unwrap().rows.len(), 3);
    }

    #[tokio::test]
    async fn test_matrix_rejects_unknown_method() {
        let (_, handle) = engine(vec![]);
        let dataset = dataset();
        let params = AnalysisParams::new(
            VariableRoles::new().with_all(Role::Variables, ["a", "b"]),
        )
        .with_options(AnalysisOptions {
            correlation_method: Some("distance".to_string()),
            ..Default::default()
        });
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let err = CorrelationHandler
            .handle(CorrelationMethod::Matrix, &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("unknown correlation method 'distance'"));
    }
}
