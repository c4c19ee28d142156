//! Principal components and exploratory factor analysis.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{numeric_requests, CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineError};
use crate::error::{Result, TabstatError};
use crate::extract::MatrixBuilder;
use crate::methods::{Category, DimensionReductionMethod, MethodId};
use crate::result::{
    interpret, AnalysisOutput, CategoryDetails, DimensionReductionDetails, ResultTable,
};

const ROTATIONS: [&str; 4] = ["none", "varimax", "promax", "oblimin"];
const DEFAULT_ROTATION: &str = "varimax";

#[derive(Debug, Default, Clone, Copy)]
pub struct DimensionReductionHandler;

#[async_trait]
impl CategoryHandler for DimensionReductionHandler {
    type Method = DimensionReductionMethod;

    fn category(&self) -> Category {
        Category::DimensionReduction
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: DimensionReductionMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::DimensionReduction(method);
        id.check_roles(ctx.roles())?;

        let variables = ctx.columns(Role::Variables);
        let k = variables.len();
        let components = match ctx.options().n_components {
            Some(n) if n == 0 || n > k => {
                return Err(TabstatError::validation(format!(
                    "number of components must be between 1 and {k} (got {n})"
                )))
            }
            Some(n) => n,
            None if method == DimensionReductionMethod::FactorAnalysis => 1,
            None => k,
        };
        let rotation = match method {
            DimensionReductionMethod::Pca => None,
            DimensionReductionMethod::FactorAnalysis => Some(rotation(ctx)?),
        };

        let aligned = ctx.extract(id, &numeric_requests(Role::Variables, &variables))?;
        aligned.require_rows(k + 1, id.display_name())?;
        let matrix = MatrixBuilder::new(&aligned).row_major(&variables)?;
        let n = matrix.n_samples();

        let mut args = vec![EngineArg::Matrix(matrix), EngineArg::Scalar(components as f64)];
        if let Some(rotation) = &rotation {
            args.push(EngineArg::Text(rotation.clone()));
        }
        let raw = ctx.invoke(id, args).await?;

        let explained = raw.numbers("explainedVariance")?;
        let loadings = raw.matrix("loadings")?;
        if loadings.len() != k {
            return Err(EngineError::InvalidField {
                routine: raw.routine().to_string(),
                field: "loadings".to_string(),
                expected: format!("one row per variable ({k})"),
            }
            .into());
        }
        let eigenvalues = raw.optional_numbers("eigenvalues")?;
        let kmo = raw.optional_number("kmo")?;
        let bartlett_p = raw.optional_number("bartlettPValue")?;
        let retained = explained.len();
        debug!(n, retained, "Decomposition complete");

        let fmt = ctx.format();
        let mut variance = ResultTable::new(
            "Explained Variance",
            ["Component", "Eigenvalue", "Variance", "Cumulative"],
        );
        let mut cumulative = 0.0;
        for (i, share) in explained.iter().enumerate() {
            cumulative += share;
            let eigen = eigenvalues
                .as_ref()
                .and_then(|e| e.get(i))
                .map(|e| fmt.number(*e))
                .unwrap_or_default();
            variance.push_row([
                component_label(method, i),
                eigen,
                fmt.percent(*share),
                fmt.percent(cumulative),
            ]);
        }

        let mut header = vec!["Variable".to_string()];
        header.extend((0..retained).map(|i| component_label(method, i)));
        let mut loading_table = ResultTable::new("Loadings", header);
        for (variable, row) in variables.iter().zip(&loadings) {
            let mut cells = vec![variable.to_string()];
            cells.extend(row.iter().map(|l| fmt.number(*l)));
            loading_table.push_row(cells);
        }

        let mut out = AnalysisOutput::new(
            id,
            CategoryDetails::DimensionReduction(DimensionReductionDetails {
                explained_variance: Some(explained.clone()),
                loadings: Some(loadings),
                eigenvalues,
                kmo,
                bartlett_p_value: bartlett_p,
                n_components: Some(retained),
                rotation: rotation.clone(),
            }),
        );
        out.metric("N", fmt.integer(n));
        out.metric("Components", fmt.integer(retained));
        out.metric("Cumulative variance", fmt.percent(cumulative));
        if let Some(kmo) = kmo {
            out.metric("KMO", fmt.number(kmo));
        }
        if let Some(p) = bartlett_p {
            out.metric("Bartlett p", fmt.p_value(p));
        }
        if let Some(rotation) = &rotation {
            out.metric("Rotation", rotation.clone());
        }
        out.table(variance);
        out.table(loading_table);

        let mut interpretation = format!(
            "{retained} {} explain {} of the variance in {k} variables.",
            if method == DimensionReductionMethod::Pca {
                "components"
            } else {
                "factors"
            },
            fmt.percent(cumulative),
        );
        if let Some(kmo) = kmo {
            interpretation.push_str(&format!(
                " Sampling adequacy is {} (KMO = {}).",
                interpret::sampling_adequacy(kmo),
                fmt.number(kmo)
            ));
        }
        if let Some(p) = bartlett_p {
            let verdict = if p < ctx.alpha() {
                "supports"
            } else {
                "does not support"
            };
            interpretation.push_str(&format!(
                " Bartlett's test {verdict} factorability (p = {}).",
                fmt.p_value(p)
            ));
        }
        out.interpretation = interpretation;
        Ok(out)
    }
}

fn component_label(method: DimensionReductionMethod, index: usize) -> String {
    match method {
        DimensionReductionMethod::Pca => format!("PC{}", index + 1),
        DimensionReductionMethod::FactorAnalysis => format!("F{}", index + 1),
    }
}

fn rotation(ctx: &HandlerContext<'_>) -> Result<String> {
    let rotation = ctx
        .options()
        .rotation
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_ROTATION.to_string());
    if ROTATIONS.contains(&rotation.as_str()) {
        Ok(rotation)
    } else {
        Err(TabstatError::validation(format!(
            "unknown rotation '{rotation}' (expected one of: {})",
            ROTATIONS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::data::{AnalysisOptions, AnalysisParams, CellValue, Dataset, VariableRoles};
    use crate::error::ErrorKind;
    use crate::extract::Orientation;
    use crate::handlers::test_support::engine;
    use crate::result::ResultField;
    use serde_json::json;

    fn dataset() -> Dataset {
        Dataset::from_columns(vec![
            ("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            ("b", vec![2.0, 1.0, 4.0, 3.0, 6.0]),
            ("c", vec![5.0, 3.0, 4.0, 1.0, 2.0]),
        ])
    }

    fn params_with(options: AnalysisOptions) -> AnalysisParams {
        AnalysisParams::new(VariableRoles::new().with_all(Role::Variables, ["a", "b", "c"]))
            .with_options(options)
    }

    #[tokio::test]
    async fn test_pca_sends_row_major_matrix() {
        let (scripted, handle) = engine(vec![(
            "pca",
            json!({
                "explainedVariance": [0.7, 0.2],
                "loadings": [[0.9, 0.1], [0.8, -0.2], [-0.7, 0.5]],
                "eigenvalues": [2.1, 0.6],
                "kmo": 0.82,
                "bartlettPValue": 0.001
            }),
        )]);
        let dataset = dataset();
        let params = params_with(AnalysisOptions {
            n_components: Some(2),
            ..Default::default()
        });
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = DimensionReductionHandler
            .handle(DimensionReductionMethod::Pca, &ctx)
            .await
            .unwrap();
        assert!(out.has_field(ResultField::ExplainedVariance));
        assert!(out.has_field(ResultField::Loadings));
        assert!(out.has_field(ResultField::Kmo));
        assert_eq!(out.metric_value("Cumulative variance"), Some("90.00%"));
        assert!(out.interpretation.contains("meritorious"));

        let calls = scripted.calls().await;
        match &calls[0].args[0] {
            EngineArg::Matrix(m) => {
                assert_eq!(m.orientation(), Orientation::RowMajor);
                assert_eq!(m.data()[0], vec![1.0, 2.0, 5.0]);
            }
            other => panic!("unexpected argument {other:?}"),
        }
        assert_eq!(calls[0].args[1], EngineArg::Scalar(2.0));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_missing_cells() {
        let (scripted, handle) = engine(vec![]);
        let dataset = Dataset::from_columns(vec![
            ("a", vec![CellValue::from(1.0), CellValue::from(2.0)]),
            ("b", vec![CellValue::from(1.0), CellValue::Empty]),
            ("c", vec![CellValue::from(1.0), CellValue::from(2.0)]),
        ]);
        let params = params_with(AnalysisOptions::default());
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let err = DimensionReductionHandler
            .handle(DimensionReductionMethod::FactorAnalysis, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 2, column 'b': value is missing");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(scripted.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unknown_rotation_and_component_count() {
        let (_, handle) = engine(vec![]);
        let dataset = dataset();
        let config = PipelineConfig::default();

        let params = params_with(AnalysisOptions {
            rotation: Some("spin".to_string()),
            ..Default::default()
        });
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);
        let err = DimensionReductionHandler
            .handle(DimensionReductionMethod::FactorAnalysis, &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("unknown rotation 'spin'"));

        let params = params_with(AnalysisOptions {
            n_components: Some(4),
            ..Default::default()
        });
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);
        let err = DimensionReductionHandler
            .handle(DimensionReductionMethod::Pca, &ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "number of components must be between 1 and 3 (got 4)"
        );
    }
}
