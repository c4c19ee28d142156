//! Summaries, frequency tables and cross tabulations.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineError};
use crate::error::Result;
use crate::extract::ColumnRequest;
use crate::methods::{Category, DescriptiveMethod, MethodId};
use crate::result::{AnalysisOutput, CategoryDetails, DescriptiveDetails, ResultTable, VariableSummary};

#[derive(Debug, Default, Clone, Copy)]
pub struct DescriptiveHandler;

#[async_trait]
impl CategoryHandler for DescriptiveHandler {
    type Method = DescriptiveMethod;

    fn category(&self) -> Category {
        Category::Descriptive
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: DescriptiveMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::Descriptive(method);
        id.check_roles(ctx.roles())?;

        match method {
            DescriptiveMethod::DescriptiveStats => summaries(id, ctx).await,
            DescriptiveMethod::FrequencyTable => frequencies(id, ctx).await,
            DescriptiveMethod::Crosstab => crosstab(id, ctx).await,
        }
    }
}

/// Each variable is extracted on its own so one sparse column does not
/// shorten the others.
async fn summaries(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let variables = ctx.columns(Role::Variables);
    let mut columns = Vec::with_capacity(variables.len());
    for variable in &variables {
        let aligned = ctx.extract(id, &[ColumnRequest::numeric(Role::Variables, *variable)])?;
        columns.push(aligned.numbers(0)?.to_vec());
    }

    let fmt = ctx.format();
    let mut table = ResultTable::new(
        "Descriptive Statistics",
        ["Variable", "N", "Mean", "SD", "Median", "Min", "Max"],
    );
    let mut summaries = Vec::with_capacity(variables.len());
    for (variable, values) in variables.iter().zip(columns) {
        let n = values.len();
        let raw = ctx.invoke(id, vec![EngineArg::Numbers(values)]).await?;
        let summary = VariableSummary {
            variable: variable.to_string(),
            n,
            mean: raw.number("mean")?,
            std_dev: raw.number("stdDev")?,
            median: raw.optional_number("median")?,
            min: raw.optional_number("min")?,
            max: raw.optional_number("max")?,
        };
        let cell = |v: Option<f64>| v.map(|x| fmt.number(x)).unwrap_or_default();
        table.push_row([
            summary.variable.clone(),
            fmt.integer(n),
            fmt.number(summary.mean),
            fmt.number(summary.std_dev),
            cell(summary.median),
            cell(summary.min),
            cell(summary.max),
        ]);
        debug!(variable = %variable, n, "Summarized variable");
        summaries.push(summary);
    }

    let first = summaries[0].clone();
    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::Descriptive(DescriptiveDetails {
            n: Some(first.n),
            mean: Some(first.mean),
            std_dev: Some(first.std_dev),
            variables: Some(summaries.clone()),
            ..Default::default()
        }),
    );
    out.metric("N", fmt.integer(first.n));
    out.metric("Mean", fmt.number(first.mean));
    out.metric("SD", fmt.number(first.std_dev));
    out.table(table);
    out.interpretation = summaries
        .iter()
        .map(|s| {
            format!(
                "{} has a mean of {} (SD = {}) over {} observations.",
                s.variable,
                fmt.number(s.mean),
                fmt.number(s.std_dev),
                s.n
            )
        })
        .collect::<Vec<_>>()
        .join(" ");
    Ok(out)
}

async fn frequencies(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let variable = ctx.column(Role::Variables)?;
    let aligned = ctx.extract(id, &[ColumnRequest::categorical(Role::Variables, variable)])?;
    let raw = ctx
        .invoke(id, vec![EngineArg::Labels(aligned.labels(0)?.to_vec())])
        .await?;
    let categories = raw.strings("categories")?;
    let counts = raw.numbers("counts")?;
    if categories.len() != counts.len() {
        return Err(EngineError::InvalidField {
            routine: raw.routine().to_string(),
            field: "counts".to_string(),
            expected: format!("{} values", categories.len()),
        }
        .into());
    }
    let n = aligned.len();
    let total: f64 = counts.iter().sum();

    let fmt = ctx.format();
    let mut table = ResultTable::new("Frequencies", ["Category", "Count", "Percent"]);
    for (category, count) in categories.iter().zip(&counts) {
        let share = if total > 0.0 { count / total } else { f64::NAN };
        table.push_row([category.clone(), fmt.df(*count), fmt.percent(share)]);
    }
    let mode = categories
        .iter()
        .zip(&counts)
        .fold(None::<(&String, f64)>, |best, (c, n)| match best {
            Some((_, m)) if m >= *n => best,
            _ => Some((c, *n)),
        });

    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::Descriptive(DescriptiveDetails {
            n: Some(n),
            categories: Some(categories.clone()),
            counts: Some(counts.clone()),
            ..Default::default()
        }),
    );
    out.metric("N", fmt.integer(n));
    out.metric("Categories", fmt.integer(categories.len()));
    out.table(table);
    out.interpretation = match mode {
        Some((category, count)) => format!(
            "{variable} takes {} distinct values across {n} observations; the most frequent is '{category}' ({}).",
            categories.len(),
            fmt.percent(count / total),
        ),
        None => format!("{variable} has no categories to tabulate."),
    };
    Ok(out)
}

async fn crosstab(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let row = ctx.column(Role::Row)?;
    let column = ctx.column(Role::Column)?;
    let aligned = ctx.extract(
        id,
        &[
            ColumnRequest::categorical(Role::Row, row),
            ColumnRequest::categorical(Role::Column, column),
        ],
    )?;
    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Labels(aligned.labels(0)?.to_vec()),
                EngineArg::Labels(aligned.labels(1)?.to_vec()),
            ],
        )
        .await?;
    let row_levels = raw.strings("rowLevels")?;
    let column_levels = raw.strings("columnLevels")?;
    let counts = raw.matrix("counts")?;
    if counts.len() != row_levels.len() {
        return Err(EngineError::InvalidField {
            routine: raw.routine().to_string(),
            field: "counts".to_string(),
            expected: format!("{} rows", row_levels.len()),
        }
        .into());
    }

    let fmt = ctx.format();
    let mut header = vec![format!("{row} \\ {column}")];
    header.extend(column_levels.iter().cloned());
    header.push("Total".to_string());
    let mut table = ResultTable::new("Crosstab", header);
    for (level, cells) in row_levels.iter().zip(&counts) {
        let mut values = vec![level.clone()];
        values.extend(cells.iter().map(|c| fmt.df(*c)));
        values.push(fmt.df(cells.iter().sum()));
        table.push_row(values);
    }

    let n = aligned.len();
    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::Descriptive(DescriptiveDetails {
            n: Some(n),
            categories: Some(row_levels.clone()),
            ..Default::default()
        }),
    );
    out.metric("N", fmt.integer(n));
    out.metric("Rows", fmt.integer(row_levels.len()));
    out.metric("Columns", fmt.integer(column_levels.len()));
    out.table(table);
    out.interpretation = format!(
        "Cross tabulation of {row} ({} levels) by {column} ({} levels) over {n} observations.",
        row_levels.len(),
        column_levels.len(),
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::data::{AnalysisParams, CellValue, Dataset, VariableRoles};
    use crate::handlers::test_support::engine;
    use crate::result::ResultField;
    use serde_json::json;

    #[tokio::test]
    async fn test_each_variable_keeps_its_own_rows() {
        let (scripted, handle) = engine(vec![(
            "descriptive_stats",
            json!({"mean": 2.0, "stdDev": 1.0, "median": 2.0}),
        )]);
        let dataset = Dataset::from_columns(vec![
            ("a", vec![CellValue::from(1.0), CellValue::from(2.0), CellValue::from(3.0)]),
            ("b", vec![CellValue::from(4.0), CellValue::Empty, CellValue::from("x")]),
        ]);
        let params = AnalysisParams::new(VariableRoles::new().with_all(Role::Variables, ["a", "b"]));
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = DescriptiveHandler
            .handle(DescriptiveMethod::DescriptiveStats, &ctx)
            .await
            .unwrap();
        assert!(out.has_field(ResultField::N));
        assert!(out.has_field(ResultField::Mean));
        let table = out.find_table("Descriptive Statistics").unwrap();
        assert_eq!(table.row("a").unwrap()[1], "3");
        assert_eq!(table.row("b").unwrap()[1], "1");

        let calls = scripted.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].args, vec![EngineArg::Numbers(vec![4.0])]);
    }

    #[tokio::test]
    async fn test_frequency_table() {
        let (_, handle) = engine(vec![(
            "frequency_table",
            json!({"categories": ["red", "blue"], "counts": [3, 1]}),
        )]);
        let dataset = Dataset::from_columns(vec![(
            "colour",
            vec!["red", "red", "blue", "red"],
        )]);
        let params = AnalysisParams::new(VariableRoles::new().with(Role::Variables, "colour"));
        let config = PipelineConfig::default();
        let ctx = HandlerContext::new(&dataset, &params, &handle, &config);

        let out = DescriptiveHandler
            .handle(DescriptiveMethod::FrequencyTable, &ctx)
            .await
            .unwrap();
        let table = out.find_table("Frequencies").unwrap();
        assert_eq!(table.row("red").unwrap()[2], "75.00%");
        assert!(out.interpretation.contains("'red'"));
    }
}
