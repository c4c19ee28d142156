//! Scale reliability: Cronbach's alpha and intraclass correlation.

use async_trait::async_trait;
use tracing::instrument;

use super::{numeric_requests, CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::EngineArg;
use crate::error::{Result, TabstatError};
use crate::extract::MatrixBuilder;
use crate::methods::{Category, MethodId, ReliabilityMethod};
use crate::result::{
    interpret, AnalysisOutput, CategoryDetails, ConfidenceInterval, ItemStatistic,
    ReliabilityDetails, ResultTable,
};

const ICC_MODELS: [&str; 6] = ["ICC1", "ICC2", "ICC3", "ICC1k", "ICC2k", "ICC3k"];
const DEFAULT_ICC_MODEL: &str = "ICC2";

#[derive(Debug, Default, Clone, Copy)]
pub struct ReliabilityHandler;

#[async_trait]
impl CategoryHandler for ReliabilityHandler {
    type Method = ReliabilityMethod;

    fn category(&self) -> Category {
        Category::Reliability
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: ReliabilityMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::Reliability(method);
        id.check_roles(ctx.roles())?;

        let model = match method {
            ReliabilityMethod::CronbachAlpha => None,
            ReliabilityMethod::Icc => Some(icc_model(ctx)?),
        };
        let items = ctx.columns(Role::Items);
        let aligned = ctx.extract(id, &numeric_requests(Role::Items, &items))?;
        aligned.require_rows(2, id.display_name())?;
        let n = aligned.len();
        let matrix = MatrixBuilder::new(&aligned).row_major(&items)?;

        let mut args = vec![EngineArg::Matrix(matrix)];
        if let Some(model) = &model {
            args.push(EngineArg::Text(model.clone()));
        }
        let raw = ctx.invoke(id, args).await?;
        let coefficient = raw.number("coefficient")?;

        let fmt = ctx.format();
        let mut item_statistics = Vec::new();
        for (item, stats) in items
            .iter()
            .zip(raw.optional_nested("itemStatistics")?.unwrap_or_default())
        {
            item_statistics.push(ItemStatistic {
                item: item.to_string(),
                mean: stats.number("mean")?,
                std_dev: stats.optional_number("stdDev")?,
                item_total_correlation: stats.optional_number("itemTotalCorrelation")?,
                alpha_if_deleted: stats.optional_number("alphaIfDeleted")?,
            });
        }

        let mut out = AnalysisOutput::new(
            id,
            CategoryDetails::Reliability(ReliabilityDetails {
                coefficient: Some(coefficient),
                item_statistics: (!item_statistics.is_empty()).then(|| item_statistics.clone()),
                n_items: Some(items.len()),
                n: Some(n),
                model: model.clone(),
            }),
        );
        if let (Some(lower), Some(upper)) =
            (raw.optional_number("ciLower")?, raw.optional_number("ciUpper")?)
        {
            out.confidence = Some(ConfidenceInterval {
                lower,
                upper,
                level: ctx.confidence_level(),
            });
        }
        out.statistic = raw.optional_number("fStatistic")?;
        out.p_value = raw.optional_number("pValue")?;

        let label = match method {
            ReliabilityMethod::CronbachAlpha => "α",
            ReliabilityMethod::Icc => "ICC",
        };
        out.metric(label, fmt.number(coefficient));
        out.metric("Items", fmt.integer(items.len()));
        out.metric("N", fmt.integer(n));
        if let Some(ci) = out.confidence {
            out.metric("CI", fmt.interval(ci.lower, ci.upper));
        }
        if let Some(model) = &model {
            out.metric("Model", model.clone());
        }

        if !item_statistics.is_empty() {
            let mut table = ResultTable::new(
                "Item Statistics",
                ["Item", "Mean", "SD", "Item-total r", "α if deleted"],
            );
            let cell = |v: Option<f64>| v.map(|x| fmt.number(x)).unwrap_or_default();
            for stat in &item_statistics {
                table.push_row([
                    stat.item.clone(),
                    fmt.number(stat.mean),
                    cell(stat.std_dev),
                    cell(stat.item_total_correlation),
                    cell(stat.alpha_if_deleted),
                ]);
            }
            out.table(table);
        }

        out.interpretation = match method {
            ReliabilityMethod::CronbachAlpha => {
                let mut text = format!(
                    "Internal consistency across {} items is {} (α = {}).",
                    items.len(),
                    interpret::internal_consistency(coefficient),
                    fmt.number(coefficient)
                );
                let improving: Vec<&str> = item_statistics
                    .iter()
                    .filter(|s| s.alpha_if_deleted.is_some_and(|a| a > coefficient))
                    .map(|s| s.item.as_str())
                    .collect();
                if !improving.is_empty() {
                    text.push_str(&format!(
                        " Dropping {} would raise alpha.",
                        improving.join(", ")
                    ));
                }
                text
            }
            ReliabilityMethod::Icc => format!(
                "Agreement across {} raters is {} ({} = {}).",
                items.len(),
                interpret::agreement(coefficient),
                model.as_deref().unwrap_or(DEFAULT_ICC_MODEL),
                fmt.number(coefficient)
            ),
        };
        Ok(out)
    }
}

fn icc_model(ctx: &HandlerContext<'_>) -> Result<String> {
    let requested = ctx.options().icc_model.as_deref().unwrap_or(DEFAULT_ICC_MODEL);
    ICC_MODELS
        .iter()
        .find(|m| m.eq_ignore_ascii_case(requested))
        .map(|m| m.to_string())
        .ok_or_else(|| {
            TabstatError::validation(format!(
                "unknown ICC model '{requested}' (expected one of: {})",
                ICC_MODELS.join(", ")
            ))
        })
}
