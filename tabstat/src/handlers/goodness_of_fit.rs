//! Chi-square, exact and distributional goodness-of-fit tests.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineOutput};
use crate::error::{ErrorContext, Result, TabstatError};
use crate::extract::{levels, ColumnRequest};
use crate::methods::{Category, GoodnessOfFitMethod, MethodId};
use crate::result::{
    interpret, AnalysisOutput, CategoryDetails, ConfidenceInterval, GoodnessOfFitDetails,
    NumberFormat, ResultTable,
};

const DISTRIBUTIONS: [&str; 3] = ["normal", "uniform", "exponential"];
const PROPORTION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Default, Clone, Copy)]
pub struct GoodnessOfFitHandler;

#[async_trait]
impl CategoryHandler for GoodnessOfFitHandler {
    type Method = GoodnessOfFitMethod;

    fn category(&self) -> Category {
        Category::GoodnessOfFit
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: GoodnessOfFitMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::GoodnessOfFit(method);
        id.check_roles(ctx.roles())?;

        match method {
            GoodnessOfFitMethod::ChiSquareGoodnessOfFit => chi_square_fit(id, ctx).await,
            GoodnessOfFitMethod::ChiSquareIndependence | GoodnessOfFitMethod::FisherExact => {
                contingency(id, method, ctx).await
            }
            GoodnessOfFitMethod::ShapiroWilk
            | GoodnessOfFitMethod::KolmogorovSmirnov
            | GoodnessOfFitMethod::AndersonDarling => distribution_fit(id, method, ctx).await,
        }
    }
}

/// Expected proportions for `categories` levels; equal shares when unset.
fn expected_proportions(ctx: &HandlerContext<'_>, categories: usize) -> Result<Vec<f64>> {
    match ctx.options().expected_proportions.clone() {
        Some(proportions) => {
            check_proportions(proportions, categories).context("expected proportions")
        }
        None => Ok(vec![1.0 / categories as f64; categories]),
    }
}

fn check_proportions(proportions: Vec<f64>, categories: usize) -> Result<Vec<f64>> {
    if proportions.len() != categories {
        return Err(TabstatError::validation(format!(
            "must list one value per category ({categories} categories, {} proportions)",
            proportions.len()
        )));
    }
    if proportions.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(TabstatError::validation("must be non-negative numbers"));
    }
    let total: f64 = proportions.iter().sum();
    if (total - 1.0).abs() > PROPORTION_TOLERANCE {
        return Err(TabstatError::validation(format!("must sum to 1 (got {total})")));
    }
    Ok(proportions)
}

fn chi_square_verdict(p: f64, alpha: f64, fmt: &NumberFormat) -> String {
    format!(
        "The result is {} (p = {}).",
        interpret::significance(p, alpha),
        fmt.p_value(p)
    )
}

async fn chi_square_fit(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let variable = ctx.column(Role::Variables)?;
    let aligned = ctx.extract(id, &[ColumnRequest::categorical(Role::Variables, variable)])?;
    let labels = aligned.labels(0)?;
    let categories = levels(labels);
    if categories.len() < 2 {
        return Err(TabstatError::validation(format!(
            "minimum 2 categories required (found {})",
            categories.len()
        )));
    }
    let proportions = expected_proportions(ctx, categories.len())?;

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Labels(labels.to_vec()),
                EngineArg::Numbers(proportions),
            ],
        )
        .await?;
    let chi_square = raw.number("chiSquare")?;
    let df = raw.number("df")?;
    let p = raw.number("pValue")?;
    let observed = raw.numbers("observed")?;
    let expected = raw.optional_numbers("expected")?;
    let effect = raw.optional_number("cohensW")?;
    let categories = raw.optional_strings("categories")?.unwrap_or(categories);

    let fmt = ctx.format();
    let mut table = ResultTable::new("Observed vs Expected", ["Category", "Observed", "Expected"]);
    for (i, (category, obs)) in categories.iter().zip(&observed).enumerate() {
        let exp = expected
            .as_ref()
            .and_then(|e| e.get(i))
            .map(|e| fmt.number(*e))
            .unwrap_or_default();
        table.push_row([category.clone(), fmt.df(*obs), exp]);
    }

    let n = aligned.len();
    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::GoodnessOfFit(GoodnessOfFitDetails {
            observed: Some(observed),
            expected,
            categories: Some(categories),
            n: Some(n),
            distribution: None,
        }),
    );
    out.statistic = Some(chi_square);
    out.df = Some(df);
    out.p_value = Some(p);
    out.effect_size = effect;
    out.metric("χ²", fmt.number(chi_square));
    out.metric("df", fmt.df(df));
    out.metric("p", fmt.p_value(p));
    out.metric("N", fmt.integer(n));
    out.table(table);
    out.interpretation = format!(
        "The observed frequencies of {variable} {} the expected proportions. {}",
        if p < ctx.alpha() {
            "differ from"
        } else {
            "are consistent with"
        },
        chi_square_verdict(p, ctx.alpha(), &fmt)
    );
    Ok(out)
}

async fn contingency(
    id: MethodId,
    method: GoodnessOfFitMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let row = ctx.column(Role::Row)?;
    let column = ctx.column(Role::Column)?;
    let aligned = ctx.extract(
        id,
        &[
            ColumnRequest::categorical(Role::Row, row),
            ColumnRequest::categorical(Role::Column, column),
        ],
    )?;
    let rows = aligned.labels(0)?;
    let columns = aligned.labels(1)?;
    let (row_levels, column_levels) = (levels(rows).len(), levels(columns).len());
    if method == GoodnessOfFitMethod::FisherExact && (row_levels != 2 || column_levels != 2) {
        return Err(TabstatError::validation(format!(
            "Fisher's exact test requires a 2×2 table (found {row_levels}×{column_levels})"
        )));
    }
    if row_levels < 2 || column_levels < 2 {
        return Err(TabstatError::validation(format!(
            "both variables need at least 2 categories (found {row_levels}×{column_levels})"
        )));
    }

    let mut args = vec![
        EngineArg::Labels(rows.to_vec()),
        EngineArg::Labels(columns.to_vec()),
    ];
    if method == GoodnessOfFitMethod::FisherExact {
        args.push(EngineArg::Text(ctx.options().alternative.as_str().to_string()));
    }
    let raw = ctx.invoke(id, args).await?;

    let fmt = ctx.format();
    let n = aligned.len();
    let p = raw.number("pValue")?;
    let observed = raw.optional_matrix("observed")?;
    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::GoodnessOfFit(GoodnessOfFitDetails {
            observed: observed.as_ref().map(|m| m.concat()),
            n: Some(n),
            ..Default::default()
        }),
    );
    out.p_value = Some(p);

    if method == GoodnessOfFitMethod::FisherExact {
        let odds_ratio = raw.number("oddsRatio")?;
        out.statistic = Some(odds_ratio);
        out.confidence = confidence(&raw, ctx.confidence_level())?;
        out.metric("Odds ratio", fmt.number(odds_ratio));
        out.metric("p", fmt.p_value(p));
        if let Some(ci) = out.confidence {
            out.metric("CI", fmt.interval(ci.lower, ci.upper));
        }
        out.interpretation = format!(
            "The association between {row} and {column} is {} (odds ratio = {}, p = {}).",
            interpret::significance(p, ctx.alpha()),
            fmt.number(odds_ratio),
            fmt.p_value(p)
        );
    } else {
        let chi_square = raw.number("chiSquare")?;
        let df = raw.number("df")?;
        let cramers_v = raw.optional_number("cramersV")?;
        out.statistic = Some(chi_square);
        out.df = Some(df);
        out.effect_size = cramers_v;
        out.metric("χ²", fmt.number(chi_square));
        out.metric("df", fmt.df(df));
        out.metric("p", fmt.p_value(p));
        if let Some(v) = cramers_v {
            out.metric("Cramér's V", fmt.number(v));
        }
        let mut interpretation = format!(
            "{row} and {column} are {}. {}",
            if p < ctx.alpha() {
                "associated"
            } else {
                "not detectably associated"
            },
            chi_square_verdict(p, ctx.alpha(), &fmt)
        );
        if let Some(v) = cramers_v {
            interpretation.push_str(&format!(
                " The association is {} (Cramér's V = {}).",
                interpret::correlation(v),
                fmt.number(v)
            ));
        }
        out.interpretation = interpretation;
    }
    out.metric("N", fmt.integer(n));

    if let Some(observed) = observed {
        let mut table = ResultTable::new(
            "Observed Counts",
            std::iter::once(format!("{row} \\ {column}"))
                .chain((1..=column_levels).map(|j| j.to_string())),
        );
        for (i, cells) in observed.iter().enumerate() {
            let mut values = vec![(i + 1).to_string()];
            values.extend(cells.iter().map(|c| fmt.df(*c)));
            table.push_row(values);
        }
        out.table(table);
    }
    Ok(out)
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

async fn distribution_fit(
    id: MethodId,
    method: GoodnessOfFitMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let dependent = ctx.column(Role::Dependent)?;
    let aligned = ctx.extract(id, &[ColumnRequest::numeric(Role::Dependent, dependent)])?;
    let (min_rows, statistic_field, label) = match method {
        GoodnessOfFitMethod::ShapiroWilk => (3, "wStatistic", "W"),
        GoodnessOfFitMethod::AndersonDarling => (8, "aStatistic", "A²"),
        _ => (2, "dStatistic", "D"),
    };
    aligned.require_rows(min_rows, id.display_name())?;

    let distribution = match method {
        GoodnessOfFitMethod::KolmogorovSmirnov => distribution(ctx)?,
        _ => "normal".to_string(),
    };
    let mut args = vec![EngineArg::Numbers(aligned.numbers(0)?.to_vec())];
    if method == GoodnessOfFitMethod::KolmogorovSmirnov {
        args.push(EngineArg::Text(distribution.clone()));
    }
    let raw = ctx.invoke(id, args).await?;
    let statistic = raw.number(statistic_field)?;
    let p = raw.number("pValue")?;
    debug!(statistic, p, "Distribution test complete");

    let fmt = ctx.format();
    let n = aligned.len();
    let mut out = AnalysisOutput::new(
        id,
        CategoryDetails::GoodnessOfFit(GoodnessOfFitDetails {
            n: Some(n),
            distribution: Some(distribution.clone()),
            ..Default::default()
        }),
    );
    out.statistic = Some(statistic);
    out.p_value = Some(p);
    out.metric(label, fmt.number(statistic));
    out.metric("p", fmt.p_value(p));
    out.metric("N", fmt.integer(n));
    out.interpretation = if p < ctx.alpha() {
        format!(
            "{dependent} departs from a {distribution} distribution ({label} = {}, p = {}).",
            fmt.number(statistic),
            fmt.p_value(p)
        )
    } else {
        format!(
            "{dependent} is consistent with a {distribution} distribution ({label} = {}, p = {}).",
            fmt.number(statistic),
            fmt.p_value(p)
        )
    };
    Ok(out)
}

fn distribution(ctx: &HandlerContext<'_>) -> Result<String> {
    let distribution = ctx
        .options()
        .distribution
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DISTRIBUTIONS[0].to_string());
    if DISTRIBUTIONS.contains(&distribution.as_str()) {
        Ok(distribution)
    } else {
        Err(TabstatError::validation(format!(
            "unknown distribution '{distribution}' (expected one of: {})",
            DISTRIBUTIONS.join(", ")
        )))
    }
}
