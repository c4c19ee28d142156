//! Time-to-event analysis.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineError};
use crate::error::{Result, TabstatError};
use crate::extract::{levels, AlignedColumns, ColumnRequest, MatrixBuilder};
use crate::methods::{Category, MethodId, SurvivalMethod};
use crate::result::{
    interpret, AnalysisOutput, CategoryDetails, HazardRatio, ResultTable, SurvivalDetails,
};

/// Label sent for every row when Kaplan-Meier runs without a group column.
const SINGLE_GROUP: &str = "all";

#[derive(Debug, Default, Clone, Copy)]
pub struct SurvivalHandler;

#[async_trait]
impl CategoryHandler for SurvivalHandler {
    type Method = SurvivalMethod;

    fn category(&self) -> Category {
        Category::Survival
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: SurvivalMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::Survival(method);
        id.check_roles(ctx.roles())?;

        let time = ctx.column(Role::Time)?;
        let event = ctx.column(Role::Event)?;
        let mut requests = vec![
            ColumnRequest::numeric(Role::Time, time),
            ColumnRequest::binary(Role::Event, event),
        ];
        let group = ctx.roles().first(Role::Group);
        let covariates = ctx.columns(Role::Covariates);
        match method {
            SurvivalMethod::CoxRegression => {
                requests.extend(covariates.iter().map(|c| ColumnRequest::numeric(Role::Covariates, *c)))
            }
            _ => {
                if let Some(group) = group {
                    requests.push(ColumnRequest::categorical(Role::Group, group));
                }
            }
        }
        let aligned = ctx.extract(id, &requests)?;
        let times = aligned.numbers(0)?;
        if let Some(row) = times.iter().position(|t| *t < 0.0) {
            return Err(TabstatError::validation(format!(
                "survival times must be non-negative (row {} has {})",
                aligned.source_rows()[row] + 1,
                times[row]
            )));
        }
        let events = aligned.numbers(1)?;
        let event_count = events.iter().filter(|e| **e == 1.0).count();
        if event_count == 0 {
            return Err(TabstatError::validation(format!(
                "no events observed in '{event}'"
            )));
        }

        match method {
            SurvivalMethod::KaplanMeier | SurvivalMethod::LogRank => {
                let labels = match group {
                    Some(_) => aligned.labels(2)?.to_vec(),
                    None => vec![SINGLE_GROUP.to_string(); aligned.len()],
                };
                estimate(id, method, ctx, &aligned, labels, event_count).await
            }
            SurvivalMethod::CoxRegression => {
                cox(id, ctx, &aligned, &covariates, event_count).await
            }
        }
    }
}

async fn estimate(
    id: MethodId,
    method: SurvivalMethod,
    ctx: &HandlerContext<'_>,
    aligned: &AlignedColumns,
    labels: Vec<String>,
    events: usize,
) -> Result<AnalysisOutput> {
    let groups = levels(&labels);
    if method == SurvivalMethod::LogRank && groups.len() < 2 {
        return Err(TabstatError::validation(format!(
            "minimum 2 groups required (found {})",
            groups.len()
        )));
    }

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
                EngineArg::Numbers(aligned.numbers(1)?.to_vec()),
                EngineArg::Labels(labels),
            ],
        )
        .await?;

    let fmt = ctx.format();
    let n = aligned.len();
    let median = raw.optional_number("medianSurvival")?;
    let statistic = match method {
        SurvivalMethod::LogRank => Some(raw.number("chiSquare")?),
        _ => raw.optional_number("chiSquare")?,
    };
    let p = match method {
        SurvivalMethod::LogRank => Some(raw.number("pValue")?),
        _ => raw.optional_number("pValue")?,
    };
    let df = raw.optional_number("df")?;

    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::Survival(SurvivalDetails {
            events: Some(events),
            n: Some(n),
            median_survival: median,
            hazard_ratios: None,
            groups: (groups.len() > 1).then(|| groups.clone()),
        }),
    );
    out.statistic = statistic;
    out.p_value = p;
    out.df = df;
    out.metric("N", fmt.integer(n));
    out.metric("Events", fmt.integer(events));
    out.metric("Censored", fmt.integer(n - events));
    if let Some(median) = median {
        out.metric("Median survival", fmt.number(median));
    }
    if let Some(statistic) = statistic {
        out.metric("χ²", fmt.number(statistic));
    }
    if let Some(p) = p {
        out.metric("p", fmt.p_value(p));
    }

    if let Some(group_medians) = raw.optional_numbers("groupMedians")? {
        let mut table = ResultTable::new("Median Survival by Group", ["Group", "Median"]);
        for (name, median) in groups.iter().zip(group_medians) {
            table.push_row([name.clone(), fmt.number(median)]);
        }
        out.table(table);
    }
    if let Some(steps) = raw.optional_nested("survivalTable")? {
        let mut table = ResultTable::new(
            "Survival Table",
            ["Time", "At risk", "Events", "Survival"],
        );
        for step in steps {
            table.push_row([
                fmt.number(step.number("time")?),
                fmt.integer(step.count("atRisk")?),
                fmt.integer(step.count("events")?),
                fmt.number(step.number("survival")?),
            ]);
        }
        out.table(table);
    }

    let median_text = match median {
        Some(m) => format!("median survival time is {}", fmt.number(m)),
        None => "median survival was not reached".to_string(),
    };
    let mut interpretation = format!("{events} events among {n} subjects; {median_text}.");
    if let (Some(p), true) = (p, groups.len() > 1) {
        interpretation.push_str(&format!(
            " Survival differs between groups: the difference is {} (p = {}).",
            interpret::significance(p, ctx.alpha()),
            fmt.p_value(p)
        ));
    }
    out.interpretation = interpretation;
    Ok(out)
}

async fn cox(
    id: MethodId,
    ctx: &HandlerContext<'_>,
    aligned: &AlignedColumns,
    covariates: &[&str],
    events: usize,
) -> Result<AnalysisOutput> {
    if events <= covariates.len() {
        return Err(TabstatError::insufficient(
            format!("{} (events)", id.display_name()),
            covariates.len() + 1,
            events,
        ));
    }
    let matrix = MatrixBuilder::new(aligned).column_major(covariates)?;
    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
                EngineArg::Numbers(aligned.numbers(1)?.to_vec()),
                EngineArg::Matrix(matrix),
            ],
        )
        .await?;

    let ratios = raw.numbers("hazardRatios")?;
    if ratios.len() != covariates.len() {
        return Err(EngineError::InvalidField {
            routine: raw.routine().to_string(),
            field: "hazardRatios".to_string(),
            expected: format!("one value per covariate ({})", covariates.len()),
        }
        .into());
    }
    let p_values = raw.optional_numbers("pValues")?;
    let coefficients = raw.optional_numbers("coefficients")?;
    let hazard_ratios: Vec<HazardRatio> = covariates
        .iter()
        .zip(&ratios)
        .enumerate()
        .map(|(i, (term, ratio))| HazardRatio {
            term: term.to_string(),
            ratio: *ratio,
            p_value: p_values.as_ref().and_then(|p| p.get(i).copied()),
        })
        .collect();
    let statistic = raw.optional_number("likelihoodRatio")?;
    let p = raw.optional_number("pValue")?;
    let concordance = raw.optional_number("concordance")?;
    debug!(events, covariates = covariates.len(), "Cox model fitted");

    let fmt = ctx.format();
    let n = aligned.len();
    let mut table = ResultTable::new("Hazard Ratios", ["Covariate", "B", "HR", "p"]);
    let cell = |v: Option<f64>, p: bool| match v {
        Some(x) if p => fmt.p_value(x),
        Some(x) => fmt.number(x),
        None => String::new(),
    };
    for (i, hr) in hazard_ratios.iter().enumerate() {
        table.push_row([
            hr.term.clone(),
            cell(coefficients.as_ref().and_then(|c| c.get(i).copied()), false),
            fmt.number(hr.ratio),
            cell(hr.p_value, true),
        ]);
    }

    let alpha = ctx.alpha();
    let notable: Vec<String> = hazard_ratios
        .iter()
        .filter(|hr| hr.p_value.is_some_and(|p| p < alpha))
        .map(|hr| {
            let change = if hr.ratio > 1.0 { "raises" } else { "lowers" };
            format!("{} {change} the hazard (HR = {})", hr.term, fmt.number(hr.ratio))
        })
        .collect();

    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::Survival(SurvivalDetails {
            events: Some(events),
            n: Some(n),
            median_survival: None,
            hazard_ratios: Some(hazard_ratios),
            groups: None,
        }),
    );
    out.statistic = statistic;
    out.p_value = p;
    out.df = Some(covariates.len() as f64);
    out.metric("N", fmt.integer(n));
    out.metric("Events", fmt.integer(events));
    if let Some(statistic) = statistic {
        out.metric("Likelihood ratio χ²", fmt.number(statistic));
    }
    if let Some(p) = p {
        out.metric("p", fmt.p_value(p));
    }
    if let Some(c) = concordance {
        out.metric("Concordance", fmt.number(c));
    }
    out.table(table);

    out.interpretation = if notable.is_empty() {
        format!(
            "Cox model on {n} subjects with {events} events; no covariate has a significant effect on the hazard at α = {alpha}."
        )
    } else {
        format!(
            "Cox model on {n} subjects with {events} events: {}.",
            notable.join("; ")
        )
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::data::{AnalysisParams, CellValue, Dataset, VariableRoles};
    use crate::error::ErrorKind;
    use crate::extract::Orientation;
    use crate::handlers::test_support::engine;
    use crate::result::ResultField;
    use serde_json::json;

    #[tokio::test]
    async fn test_cox_drops_nan_time_row_everywhere() {
        let (scripted, handle) = engine(vec![(
            "cox_regression",
            json!({"hazardRatios": [1.8, 0.9], "pValues": [0.01, 0.6], "likelihoodRatio": 7.2, "pValue": 0.03}),
        )]);
        let dataset = Dataset::from_columns(vec![
            (
                "time",
                vec![
                    CellValue::from(5.0),
                    CellValue::from(f64::NAN),
                    CellValue::from(8.0),
                    CellValue::from(3.0),
                    CellValue::from(9.0),
                ],
            ),
            ("died", vec![1.0, 1.0, 0.0, 1.0, 1.0].into_iter().map(CellValue::from).collect()),
            ("age", vec![60.0, 70.0, 50.0, 65.0, 55.0].into_iter().map(CellValue::from).collect()),
            ("dose", vec![1.0, 2.0, 3.0, 4.0, 5.0].into_iter().map(CellValue::from).collect()),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Time, "time")
                .with(Role::Event, "died")
                .with_all(Role::Covariates, ["age", "dose"]),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = SurvivalHandler
            .handle(SurvivalMethod::CoxRegression, &ctx)
            .await
            .unwrap();
        assert!(out.has_field(ResultField::HazardRatios));
        assert!(out.has_field(ResultField::Events));
        assert!(out.interpretation.contains("age raises the hazard"));

        let calls = scripted.calls().await;
        let args = &calls[0].args;
        assert_eq!(args[0], EngineArg::Numbers(vec![5.0, 8.0, 3.0, 9.0]));
        assert_eq!(args[1], EngineArg::Numbers(vec![1.0, 0.0, 1.0, 1.0]));
        match &args[2] {
            EngineArg::Matrix(m) => {
                assert_eq!(m.orientation(), Orientation::ColumnMajor);
                assert_eq!(
                    m.data(),
                    &[vec![60.0, 50.0, 65.0, 55.0], vec![1.0, 3.0, 4.0, 5.0]]
                );
            }
            other => panic!("unexpected argument {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_kaplan_meier_rejects_non_binary_event() {
        let (scripted, handle) = engine(vec![]);
        let dataset = Dataset::from_columns(vec![
            ("time", vec![1.0, 2.0, 3.0]),
            ("event", vec![1.0, 0.0, 2.0]),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Time, "time")
                .with(Role::Event, "event"),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let err = SurvivalHandler
            .handle(SurvivalMethod::KaplanMeier, &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("binary"));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(scripted.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_kaplan_meier_without_group() {
        let (scripted, handle) = engine(vec![(
            "kaplan_meier",
            json!({
                "medianSurvival": 4.0,
                "survivalTable": [
                    {"time": 2.0, "atRisk": 4, "events": 1, "survival": 0.75},
                    {"time": 4.0, "atRisk": 3, "events": 1, "survival": 0.5}
                ]
            }),
        )]);
        let dataset = Dataset::from_columns(vec![
            ("time", vec![2.0, 4.0, 6.0, 7.0]),
            ("event", vec![1.0, 1.0, 0.0, 0.0]),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Time, "time")
                .with(Role::Event, "event"),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = SurvivalHandler
            .handle(SurvivalMethod::KaplanMeier, &ctx)
            .await
            .unwrap();
        assert!(out.has_field(ResultField::MedianSurvival));
        assert_eq!(out.metric_value("Censored"), Some("2"));
        assert_eq!(out.find_table("Survival Table").unwrap().rows.len(), 2);

        let calls = scripted.calls().await;
        assert_eq!(calls[0].args[2], EngineArg::Labels(vec!["all".to_string(); 4]));
    }

    #[tokio::test]
    async fn test_log_rank_needs_two_groups() {
        let (_, handle) = engine(vec![]);
        let dataset = Dataset::from_columns(vec![
            ("time", vec![CellValue::from(2.0), CellValue::from(4.0)]),
            ("event", vec![CellValue::from(1.0), CellValue::from(1.0)]),
            ("arm", vec![CellValue::from("a"), CellValue::from("a")]),
        ]);
        let params = AnalysisParams::new(
            VariableRoles::new()
                .with(Role::Time, "time")
                .with(Role::Event, "event")
                .with(Role::Group, "arm"),
        );
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let err = SurvivalHandler
            .handle(SurvivalMethod::LogRank, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "minimum 2 groups required (found 1)");
    }
}
