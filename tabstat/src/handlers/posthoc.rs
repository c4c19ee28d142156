//! Pairwise follow-up comparisons.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{group_stats, CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::EngineArg;
use crate::error::Result;
use crate::extract::{ColumnRequest, GroupedValues};
use crate::methods::{Category, MethodId, PostHocMethod};
use crate::result::{
    AnalysisOutput, CategoryDetails, PairwiseComparison, PostHocDetails, ResultTable,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct PostHocHandler;

fn default_adjustment(method: PostHocMethod) -> &'static str {
    match method {
        PostHocMethod::TukeyHsd => "Tukey HSD",
        PostHocMethod::GamesHowell => "Games-Howell",
        PostHocMethod::Bonferroni | PostHocMethod::DunnTest => "Bonferroni",
        PostHocMethod::Scheffe => "Scheffé",
    }
}

#[async_trait]
impl CategoryHandler for PostHocHandler {
    type Method = PostHocMethod;

    fn category(&self) -> Category {
        Category::PostHoc
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(&self, method: PostHocMethod, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
        let id = MethodId::PostHoc(method);
        id.check_roles(ctx.roles())?;

        let dependent = ctx.column(Role::Dependent)?;
        let group = ctx.column(Role::Group)?;
        let aligned = ctx.extract(
            id,
            &[
                ColumnRequest::numeric(Role::Dependent, dependent),
                ColumnRequest::categorical(Role::Group, group),
            ],
        )?;
        let grouped = GroupedValues::split(aligned.numbers(0)?, aligned.labels(1)?)?;
        let min_size = if method == PostHocMethod::DunnTest { 1 } else { 2 };
        grouped.require_groups(3)?.require_group_size(min_size)?;

        let alpha = ctx.alpha();
        let raw = ctx
            .invoke(
                id,
                vec![
                    EngineArg::Groups(grouped.groups().to_vec()),
                    EngineArg::Labels(grouped.names().to_vec()),
                    EngineArg::Scalar(alpha),
                ],
            )
            .await?;

        let mut comparisons = Vec::new();
        for pair in raw.nested("comparisons")? {
            let p_value = pair.number("pValue")?;
            comparisons.push(PairwiseComparison {
                group_a: pair.text("groupA")?,
                group_b: pair.text("groupB")?,
                difference: pair.number("difference")?,
                p_value,
                ci_lower: pair.optional_number("ciLower")?,
                ci_upper: pair.optional_number("ciUpper")?,
                significant: p_value < alpha,
            });
        }
        let expected = grouped.len() * (grouped.len() - 1) / 2;
        if comparisons.len() != expected {
            debug!(
                expected,
                returned = comparisons.len(),
                "Engine returned an unexpected number of pairs"
            );
        }
        let significant = comparisons.iter().filter(|c| c.significant).count();
        let adjustment = raw
            .optional_text("adjustment")?
            .unwrap_or_else(|| default_adjustment(method).to_string());

        let fmt = ctx.format();
        let mut table = ResultTable::new(
            "Pairwise Comparisons",
            ["Comparison", "Difference", "p", "CI", "Significant"],
        );
        for c in &comparisons {
            let ci = match (c.ci_lower, c.ci_upper) {
                (Some(lower), Some(upper)) => fmt.interval(lower, upper),
                _ => String::new(),
            };
            table.push_row([
                format!("{} vs {}", c.group_a, c.group_b),
                fmt.number(c.difference),
                fmt.p_value(c.p_value),
                ci,
                if c.significant { "yes" } else { "no" }.to_string(),
            ]);
        }

        let significant_names: Vec<String> = comparisons
            .iter()
            .filter(|c| c.significant)
            .map(|c| format!("{} vs {}", c.group_a, c.group_b))
            .collect();
        let total = comparisons.len();
        let mut out = AnalysisOutput::new(
            id,
            CategoryDetails::PostHoc(PostHocDetails {
                comparisons: Some(comparisons),
                adjustment: Some(adjustment.clone()),
                significant_pairs: Some(significant),
            }),
        );
        out.metric("Comparisons", fmt.integer(total));
        out.metric("Significant pairs", fmt.integer(significant));
        out.metric("Adjustment", adjustment.clone());
        out.table(table);

        let mut groups = ResultTable::new("Group Statistics", ["Group", "N", "Mean"]);
        for stat in group_stats(&grouped, None) {
            groups.push_row([stat.name, stat.n.to_string(), fmt.number(stat.mean)]);
        }
        out.table(groups);

        out.interpretation = if significant_names.is_empty() {
            format!(
                "None of the {total} pairwise comparisons is significant at α = {alpha} ({adjustment} adjustment)."
            )
        } else {
            format!(
                "{significant} of {total} pairwise comparisons are significant at α = {alpha} ({adjustment} adjustment): {}.",
                significant_names.join(", ")
            )
        };
        Ok(out)
    }
}
