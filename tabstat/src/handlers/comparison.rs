//! t-tests, ANOVA variants and their non-parametric counterparts.

use async_trait::async_trait;
use tracing::instrument;

use super::{group_stats, numeric_requests, CategoryHandler, HandlerContext};
use crate::data::Role;
use crate::engine::{EngineArg, EngineOutput};
use crate::error::{Result, TabstatError};
use crate::extract::{levels, ColumnRequest, GroupedValues, MatrixBuilder};
use crate::methods::{Category, ComparisonMethod, MethodId};
use crate::result::{
    interpret, AnalysisOutput, CategoryDetails, ComparisonDetails, ConfidenceInterval,
    ResultTable,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct ComparisonHandler;

#[async_trait]
impl CategoryHandler for ComparisonHandler {
    type Method = ComparisonMethod;

    fn category(&self) -> Category {
        Category::Comparison
    }

    #[instrument(skip_all, fields(method = method.id()))]
    async fn handle(
        &self,
        method: ComparisonMethod,
        ctx: &HandlerContext<'_>,
    ) -> Result<AnalysisOutput> {
        let id = MethodId::Comparison(method);
        id.check_roles(ctx.roles())?;

        use ComparisonMethod as M;
        match method {
            M::OneSampleTTest => one_sample(id, ctx).await,
            M::IndependentTTest | M::WelchTTest | M::MannWhitney => {
                two_independent(id, method, ctx).await
            }
            M::PairedTTest | M::WilcoxonSignedRank | M::SignTest => {
                two_paired(id, method, ctx).await
            }
            M::McNemar => mcnemar(id, ctx).await,
            M::OneWayAnova | M::WelchAnova | M::KruskalWallis | M::LeveneTest => {
                k_groups(id, method, ctx).await
            }
            M::TwoWayAnova => two_way(id, ctx).await,
            M::RepeatedMeasuresAnova | M::Friedman => within_subjects(id, method, ctx).await,
            M::Ancova => ancova(id, ctx).await,
            M::Manova => manova(id, ctx).await,
        }
    }
}

fn new_output(id: MethodId, details: ComparisonDetails) -> AnalysisOutput {
    AnalysisOutput::new(id, CategoryDetails::Comparison(details))
}

fn details(output: &mut AnalysisOutput) -> Option<&mut ComparisonDetails> {
    match &mut output.additional {
        CategoryDetails::Comparison(d) => Some(d),
        _ => None,
    }
}

/// Dependent values split by the group column.
fn grouped(id: MethodId, ctx: &HandlerContext<'_>) -> Result<(GroupedValues, usize)> {
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
    Ok((grouped, aligned.len()))
}

/// Writes the headline statistic, p-value and df as metrics and fields.
fn headline(
    out: &mut AnalysisOutput,
    ctx: &HandlerContext<'_>,
    label: &str,
    statistic: f64,
    p_value: f64,
    df: Option<f64>,
) {
    let fmt = ctx.format();
    out.statistic = Some(statistic);
    out.p_value = Some(p_value);
    out.df = df;
    out.metric(label, fmt.number(statistic));
    if let Some(df) = df {
        out.metric("df", fmt.df(df));
    }
    out.metric("p-value", fmt.p_value(p_value));
}

fn confidence(out: &EngineOutput, level: f64) -> Result<Option<ConfidenceInterval>> {
    Ok(match (out.optional_number("ciLower")?, out.optional_number("ciUpper")?) {
        (Some(lower), Some(upper)) => Some(ConfidenceInterval {
            lower,
            upper,
            level,
        }),
        _ => None,
    })
}

fn push_confidence(out: &mut AnalysisOutput, ctx: &HandlerContext<'_>, ci: Option<ConfidenceInterval>) {
    if let Some(ci) = ci {
        let label = format!("{:.0}% CI", ci.level * 100.0);
        out.metric(label, ctx.format().interval(ci.lower, ci.upper));
        out.confidence = Some(ci);
    }
}

async fn one_sample(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let dependent = ctx.column(Role::Dependent)?;
    let aligned = ctx.extract(id, &[ColumnRequest::numeric(Role::Dependent, dependent)])?;
    aligned.require_rows(2, id.display_name())?;
    let mu = ctx.options().test_value.unwrap_or(0.0);

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
                EngineArg::Scalar(mu),
                EngineArg::Text(ctx.options().alternative.as_str().to_string()),
            ],
        )
        .await?;
    let t = raw.number("tStatistic")?;
    let df = raw.number("df")?;
    let p = raw.number("pValue")?;
    let d = raw.number("cohensD")?;
    let sample_mean = raw.number("mean")?;

    let fmt = ctx.format();
    let mut out = new_output(
        id,
        ComparisonDetails {
            effect_size_measure: Some("cohensD".to_string()),
            n: Some(aligned.len()),
            ..Default::default()
        },
    );
    headline(&mut out, ctx, "t", t, p, Some(df));
    out.effect_size = Some(d);
    out.metric("Mean", fmt.number(sample_mean));
    out.metric("Test value", fmt.number(mu));
    out.metric("Cohen's d", fmt.number(d));
    push_confidence(&mut out, ctx, confidence(&raw, ctx.confidence_level())?);
    out.interpretation = format!(
        "The mean of {dependent} ({}) differs from {} by an amount that is {} (t({}) = {}, p = {}); the effect is {} (d = {}).",
        fmt.number(sample_mean),
        fmt.number(mu),
        interpret::significance(p, ctx.alpha()),
        fmt.df(df),
        fmt.number(t),
        fmt.p_value(p),
        interpret::cohens_d(d),
        fmt.number(d),
    );
    Ok(out)
}

async fn two_independent(
    id: MethodId,
    method: ComparisonMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let (grouped, n) = grouped(id, ctx)?;
    grouped.require_exact_groups(2)?;
    let min_size = if method == ComparisonMethod::MannWhitney { 1 } else { 2 };
    grouped.require_group_size(min_size)?;

    let groups = grouped.groups();
    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(groups[0].clone()),
                EngineArg::Numbers(groups[1].clone()),
                EngineArg::Text(ctx.options().alternative.as_str().to_string()),
            ],
        )
        .await?;

    let fmt = ctx.format();
    let names = grouped.names();
    let (label, statistic, df, effect, measure) = match method {
        ComparisonMethod::MannWhitney => (
            "U",
            raw.number("uStatistic")?,
            None,
            raw.number("effectSize")?,
            "rankBiserial",
        ),
        _ => (
            "t",
            raw.number("tStatistic")?,
            Some(raw.number("df")?),
            raw.number("cohensD")?,
            "cohensD",
        ),
    };
    let p = raw.number("pValue")?;

    let mut out = new_output(
        id,
        ComparisonDetails {
            group_stats: Some(group_stats(&grouped, raw.optional_numbers("groupStdDevs")?)),
            effect_size_measure: Some(measure.to_string()),
            n: Some(n),
            ..Default::default()
        },
    );
    headline(&mut out, ctx, label, statistic, p, df);
    out.effect_size = Some(effect);
    if let Some(diff) = raw.optional_number("meanDifference")? {
        out.metric("Mean difference", fmt.number(diff));
    }
    let magnitude = if method == ComparisonMethod::MannWhitney {
        out.metric("Rank-biserial r", fmt.number(effect));
        interpret::correlation(effect)
    } else {
        out.metric("Cohen's d", fmt.number(effect));
        interpret::cohens_d(effect)
    };
    push_confidence(&mut out, ctx, confidence(&raw, ctx.confidence_level())?);
    out.table(group_table(&grouped, ctx));
    out.interpretation = format!(
        "The difference between {} and {} is {} ({label} = {}, p = {}) with a {magnitude} effect.",
        names[0],
        names[1],
        interpret::significance(p, ctx.alpha()),
        fmt.number(statistic),
        fmt.p_value(p),
    );
    Ok(out)
}

fn group_table(grouped: &GroupedValues, ctx: &HandlerContext<'_>) -> ResultTable {
    let fmt = ctx.format();
    let mut table = ResultTable::new("Group Statistics", ["Group", "N", "Mean"]);
    for stat in group_stats(grouped, None) {
        table.push_row([stat.name, stat.n.to_string(), fmt.number(stat.mean)]);
    }
    table
}

async fn two_paired(
    id: MethodId,
    method: ComparisonMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let variables = ctx.columns(Role::Variables);
    let aligned = ctx.extract(id, &numeric_requests(Role::Variables, &variables))?;
    aligned.require_rows(2, id.display_name())?;

    let mut args = vec![
        EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
        EngineArg::Numbers(aligned.numbers(1)?.to_vec()),
    ];
    if method != ComparisonMethod::SignTest {
        args.push(EngineArg::Text(
            ctx.options().alternative.as_str().to_string(),
        ));
    }
    let raw = ctx.invoke(id, args).await?;

    let fmt = ctx.format();
    let p = raw.number("pValue")?;
    let mut out = new_output(
        id,
        ComparisonDetails {
            n: Some(aligned.len()),
            ..Default::default()
        },
    );
    let effect_phrase = match method {
        ComparisonMethod::PairedTTest => {
            let t = raw.number("tStatistic")?;
            let d = raw.number("cohensD")?;
            headline(&mut out, ctx, "t", t, p, Some(raw.number("df")?));
            out.effect_size = Some(d);
            out.metric("Cohen's d", fmt.number(d));
            if let Some(details) = details(&mut out) {
                details.effect_size_measure = Some("cohensD".to_string());
            }
            format!("a {} effect (d = {})", interpret::cohens_d(d), fmt.number(d))
        }
        ComparisonMethod::WilcoxonSignedRank => {
            let w = raw.number("wStatistic")?;
            headline(&mut out, ctx, "W", w, p, None);
            let r = raw.number("effectSize")?;
            out.effect_size = Some(r);
            out.metric("r", fmt.number(r));
            if let Some(details) = details(&mut out) {
                details.effect_size_measure = Some("r".to_string());
            }
            format!("a {} effect (r = {})", interpret::correlation(r), fmt.number(r))
        }
        _ => {
            let positive = raw.count("nPositive")?;
            let negative = raw.count("nNegative")?;
            headline(&mut out, ctx, "S", positive as f64, p, None);
            out.metric("Positive differences", fmt.integer(positive));
            out.metric("Negative differences", fmt.integer(negative));
            format!("{positive} positive and {negative} negative differences")
        }
    };
    if let Some(diff) = raw.optional_number("meanDifference")? {
        out.metric("Mean difference", fmt.number(diff));
    }
    push_confidence(&mut out, ctx, confidence(&raw, ctx.confidence_level())?);
    out.interpretation = format!(
        "The paired difference between {} and {} is {} (p = {}), with {effect_phrase}.",
        variables[0],
        variables[1],
        interpret::significance(p, ctx.alpha()),
        fmt.p_value(p),
    );
    Ok(out)
}

async fn mcnemar(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let variables = ctx.columns(Role::Variables);
    let requests: Vec<_> = variables
        .iter()
        .map(|c| ColumnRequest::categorical(Role::Variables, *c))
        .collect();
    let aligned = ctx.extract(id, &requests)?;
    for (i, name) in variables.iter().enumerate() {
        let found = levels(aligned.labels(i)?).len();
        if found > 2 {
            return Err(TabstatError::validation(format!(
                "variable '{name}' must be dichotomous (found {found} categories)"
            )));
        }
    }

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Labels(aligned.labels(0)?.to_vec()),
                EngineArg::Labels(aligned.labels(1)?.to_vec()),
            ],
        )
        .await?;
    let chi = raw.number("chiSquare")?;
    let p = raw.number("pValue")?;
    let df = raw.optional_number("df")?.unwrap_or(1.0);

    let fmt = ctx.format();
    let mut out = new_output(
        id,
        ComparisonDetails {
            n: Some(aligned.len()),
            ..Default::default()
        },
    );
    headline(&mut out, ctx, "χ²", chi, p, Some(df));
    out.interpretation = format!(
        "The change in proportions between {} and {} is {} (χ²({}) = {}, p = {}).",
        variables[0],
        variables[1],
        interpret::significance(p, ctx.alpha()),
        fmt.df(df),
        fmt.number(chi),
        fmt.p_value(p),
    );
    Ok(out)
}

async fn k_groups(
    id: MethodId,
    method: ComparisonMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let (grouped, n) = grouped(id, ctx)?;
    grouped.require_groups(2)?;
    let min_size = if method == ComparisonMethod::KruskalWallis { 1 } else { 2 };
    grouped.require_group_size(min_size)?;

    let raw = ctx
        .invoke(id, vec![EngineArg::Groups(grouped.groups().to_vec())])
        .await?;

    let fmt = ctx.format();
    let p = raw.number("pValue")?;
    let mut out = new_output(
        id,
        ComparisonDetails {
            group_stats: Some(group_stats(&grouped, raw.optional_numbers("groupStdDevs")?)),
            n: Some(n),
            ..Default::default()
        },
    );
    out.table(group_table(&grouped, ctx));
    let significance = interpret::significance(p, ctx.alpha());

    match method {
        ComparisonMethod::OneWayAnova => {
            let f = raw.number("fStatistic")?;
            let ss = [
                raw.number("ssBetween")?,
                raw.number("ssWithin")?,
                raw.number("ssTotal")?,
            ];
            let df = [
                raw.number("dfBetween")?,
                raw.number("dfWithin")?,
                raw.number("dfTotal")?,
            ];
            let ms = [raw.number("msBetween")?, raw.number("msWithin")?];
            let eta = raw.number("etaSquared")?;

            headline(&mut out, ctx, "F", f, p, Some(df[0]));
            out.effect_size = Some(eta);
            out.metric("η²", fmt.number(eta));
            if let Some(details) = details(&mut out) {
                details.effect_size_measure = Some("etaSquared".to_string());
                details.df_between = Some(df[0]);
                details.df_within = Some(df[1]);
            }
            let anova = ResultTable::new("ANOVA", ["Source", "SS", "df", "MS", "F", "p"])
                .with_row([
                    "Between".to_string(),
                    fmt.number(ss[0]),
                    fmt.df(df[0]),
                    fmt.number(ms[0]),
                    fmt.number(f),
                    fmt.p_value(p),
                ])
                .with_row([
                    "Within".to_string(),
                    fmt.number(ss[1]),
                    fmt.df(df[1]),
                    fmt.number(ms[1]),
                    String::new(),
                    String::new(),
                ])
                .with_row([
                    "Total".to_string(),
                    fmt.number(ss[2]),
                    fmt.df(df[2]),
                    String::new(),
                    String::new(),
                    String::new(),
                ]);
            out.table(anova);
            out.interpretation = format!(
                "Group means differ in a way that is {significance} (F({}, {}) = {}, p = {}); the effect is {} (η² = {}).",
                fmt.df(df[0]),
                fmt.df(df[1]),
                fmt.number(f),
                fmt.p_value(p),
                interpret::eta_squared(eta),
                fmt.number(eta),
            );
        }
        ComparisonMethod::WelchAnova | ComparisonMethod::LeveneTest => {
            let f = raw.number("fStatistic")?;
            let df1 = raw.number("dfBetween")?;
            let df2 = raw.number("dfWithin")?;
            headline(&mut out, ctx, "F", f, p, Some(df1));
            if let Some(details) = details(&mut out) {
                details.df_between = Some(df1);
                details.df_within = Some(df2);
            }
            out.metric("df (error)", fmt.df(df2));
            if method == ComparisonMethod::LeveneTest {
                let verdict = if p < ctx.alpha() {
                    "Variances differ across groups"
                } else {
                    "Variances are homogeneous across groups"
                };
                out.interpretation = format!(
                    "{verdict} (F({}, {}) = {}, p = {}).",
                    fmt.df(df1),
                    fmt.df(df2),
                    fmt.number(f),
                    fmt.p_value(p),
                );
            } else {
                if let Some(omega) = raw.optional_number("omegaSquared")? {
                    out.effect_size = Some(omega);
                    out.metric("ω²", fmt.number(omega));
                    if let Some(details) = details(&mut out) {
                        details.effect_size_measure = Some("omegaSquared".to_string());
                    }
                }
                out.interpretation = format!(
                    "Group means differ in a way that is {significance} without assuming equal variances (F({}, {}) = {}, p = {}).",
                    fmt.df(df1),
                    fmt.df(df2),
                    fmt.number(f),
                    fmt.p_value(p),
                );
            }
        }
        _ => {
            let h = raw.number("hStatistic")?;
            let df = raw.number("df")?;
            headline(&mut out, ctx, "H", h, p, Some(df));
            if let Some(eps) = raw.optional_number("epsilonSquared")? {
                out.effect_size = Some(eps);
                out.metric("ε²", fmt.number(eps));
                if let Some(details) = details(&mut out) {
                    details.effect_size_measure = Some("epsilonSquared".to_string());
                }
            }
            out.interpretation = format!(
                "Group distributions differ in a way that is {significance} (H({}) = {}, p = {}).",
                fmt.df(df),
                fmt.number(h),
                fmt.p_value(p),
            );
        }
    }
    Ok(out)
}

async fn two_way(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let dependent = ctx.column(Role::Dependent)?;
    let factors = ctx.columns(Role::Factor);
    let aligned = ctx.extract(
        id,
        &[
            ColumnRequest::numeric(Role::Dependent, dependent),
            ColumnRequest::categorical(Role::Factor, factors[0]),
            ColumnRequest::categorical(Role::Factor, factors[1]),
        ],
    )?;
    for (i, name) in factors.iter().enumerate() {
        let found = levels(aligned.labels(i + 1)?).len();
        if found < 2 {
            return Err(TabstatError::validation(format!(
                "factor '{name}' needs at least 2 levels (found {found})"
            )));
        }
    }
    aligned.require_rows(4, id.display_name())?;

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
                EngineArg::Labels(aligned.labels(1)?.to_vec()),
                EngineArg::Labels(aligned.labels(2)?.to_vec()),
            ],
        )
        .await?;
    let effects = raw.nested("effects")?;
    if effects.is_empty() {
        return Err(TabstatError::Engine(crate::engine::EngineError::MissingField {
            routine: raw.routine().to_string(),
            field: "effects".to_string(),
        }));
    }

    let fmt = ctx.format();
    let mut out = new_output(
        id,
        ComparisonDetails {
            effect_size_measure: Some("partialEtaSquared".to_string()),
            n: Some(aligned.len()),
            ..Default::default()
        },
    );
    let mut table = ResultTable::new(
        "ANOVA",
        ["Source", "SS", "df", "MS", "F", "p", "Partial η²"],
    );
    let mut summaries = Vec::new();
    for effect in &effects {
        let source = effect.text("source")?;
        let f = effect.number("f")?;
        let p = effect.number("pValue")?;
        let eta = effect.optional_number("partialEtaSquared")?;
        table.push_row([
            source.clone(),
            fmt.number(effect.number("ss")?),
            fmt.df(effect.number("df")?),
            fmt.number(effect.number("ms")?),
            fmt.number(f),
            fmt.p_value(p),
            eta.map(|e| fmt.number(e)).unwrap_or_default(),
        ]);
        summaries.push(format!(
            "{source} is {} (F = {}, p = {})",
            interpret::significance(p, ctx.alpha()),
            fmt.number(f),
            fmt.p_value(p)
        ));
    }
    let first = &effects[0];
    headline(
        &mut out,
        ctx,
        "F",
        first.number("f")?,
        first.number("pValue")?,
        Some(first.number("df")?),
    );
    out.effect_size = first.optional_number("partialEtaSquared")?;
    if let Some(residual) = raw.optional_number("dfResidual")? {
        if let Some(details) = details(&mut out) {
            details.df_within = Some(residual);
        }
    }
    out.table(table);
    out.interpretation = format!("{}.", summaries.join("; "));
    Ok(out)
}

async fn within_subjects(
    id: MethodId,
    method: ComparisonMethod,
    ctx: &HandlerContext<'_>,
) -> Result<AnalysisOutput> {
    let variables = ctx.columns(Role::Variables);
    let aligned = ctx.extract(id, &numeric_requests(Role::Variables, &variables))?;
    aligned.require_rows(2, id.display_name())?;
    let matrix = MatrixBuilder::new(&aligned).row_major(&variables)?;

    let raw = ctx.invoke(id, vec![EngineArg::Matrix(matrix)]).await?;
    let fmt = ctx.format();
    let p = raw.number("pValue")?;
    let mut out = new_output(
        id,
        ComparisonDetails {
            n: Some(aligned.len()),
            ..Default::default()
        },
    );
    let significance = interpret::significance(p, ctx.alpha());

    if method == ComparisonMethod::RepeatedMeasuresAnova {
        let f = raw.number("fStatistic")?;
        let df1 = raw.number("dfConditions")?;
        let df2 = raw.number("dfError")?;
        let eta = raw.number("partialEtaSquared")?;
        headline(&mut out, ctx, "F", f, p, Some(df1));
        out.effect_size = Some(eta);
        out.metric("df (error)", fmt.df(df2));
        out.metric("Partial η²", fmt.number(eta));
        if let Some(sphericity) = raw.optional_number("sphericityPValue")? {
            out.metric("Mauchly p", fmt.p_value(sphericity));
        }
        if let Some(details) = details(&mut out) {
            details.effect_size_measure = Some("partialEtaSquared".to_string());
            details.df_between = Some(df1);
            details.df_within = Some(df2);
        }
        out.interpretation = format!(
            "Scores across the {} conditions differ in a way that is {significance} (F({}, {}) = {}, p = {}); the effect is {} (partial η² = {}).",
            variables.len(),
            fmt.df(df1),
            fmt.df(df2),
            fmt.number(f),
            fmt.p_value(p),
            interpret::eta_squared(eta),
            fmt.number(eta),
        );
    } else {
        let chi = raw.number("chiSquare")?;
        let df = raw.number("df")?;
        headline(&mut out, ctx, "χ²", chi, p, Some(df));
        if let Some(w) = raw.optional_number("kendallW")? {
            out.effect_size = Some(w);
            out.metric("Kendall's W", fmt.number(w));
            if let Some(details) = details(&mut out) {
                details.effect_size_measure = Some("kendallW".to_string());
            }
        }
        out.interpretation = format!(
            "Rankings across the {} conditions differ in a way that is {significance} (χ²({}) = {}, p = {}).",
            variables.len(),
            fmt.df(df),
            fmt.number(chi),
            fmt.p_value(p),
        );
    }
    Ok(out)
}

async fn ancova(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let dependent = ctx.column(Role::Dependent)?;
    let group = ctx.column(Role::Group)?;
    let covariates = ctx.columns(Role::Covariates);
    let mut requests = vec![
        ColumnRequest::numeric(Role::Dependent, dependent),
        ColumnRequest::categorical(Role::Group, group),
    ];
    requests.extend(numeric_requests(Role::Covariates, &covariates));
    let aligned = ctx.extract(id, &requests)?;
    let grouped = GroupedValues::split(aligned.numbers(0)?, aligned.labels(1)?)?;
    grouped.require_groups(2)?.require_group_size(2)?;
    let block = MatrixBuilder::new(&aligned).column_major(&covariates)?;

    let raw = ctx
        .invoke(
            id,
            vec![
                EngineArg::Numbers(aligned.numbers(0)?.to_vec()),
                EngineArg::Labels(aligned.labels(1)?.to_vec()),
                EngineArg::Matrix(block),
            ],
        )
        .await?;
    let f = raw.number("fStatistic")?;
    let p = raw.number("pValue")?;
    let df1 = raw.number("dfBetween")?;
    let df2 = raw.number("dfWithin")?;
    let eta = raw.number("partialEtaSquared")?;

    let fmt = ctx.format();
    let mut out = new_output(
        id,
        ComparisonDetails {
            group_stats: Some(group_stats(&grouped, None)),
            effect_size_measure: Some("partialEtaSquared".to_string()),
            df_between: Some(df1),
            df_within: Some(df2),
            n: Some(aligned.len()),
        },
    );
    headline(&mut out, ctx, "F", f, p, Some(df1));
    out.effect_size = Some(eta);
    out.metric("df (error)", fmt.df(df2));
    out.metric("Partial η²", fmt.number(eta));
    if let Some(adjusted) = raw.optional_numbers("adjustedMeans")? {
        let mut table = ResultTable::new("Adjusted Means", ["Group", "Adjusted mean"]);
        for (name, value) in grouped.names().iter().zip(adjusted) {
            table.push_row([name.clone(), fmt.number(value)]);
        }
        out.table(table);
    }
    out.interpretation = format!(
        "After adjusting for {}, group means differ in a way that is {} (F({}, {}) = {}, p = {}); the effect is {} (partial η² = {}).",
        covariates.join(", "),
        interpret::significance(p, ctx.alpha()),
        fmt.df(df1),
        fmt.df(df2),
        fmt.number(f),
        fmt.p_value(p),
        interpret::eta_squared(eta),
        fmt.number(eta),
    );
    Ok(out)
}

async fn manova(id: MethodId, ctx: &HandlerContext<'_>) -> Result<AnalysisOutput> {
    let dependents = ctx.columns(Role::Dependent);
    let group = ctx.column(Role::Group)?;
    let mut requests = numeric_requests(Role::Dependent, &dependents);
    requests.push(ColumnRequest::categorical(Role::Group, group));
    let aligned = ctx.extract(id, &requests)?;
    let labels = aligned.labels(dependents.len())?;
    let found = levels(labels).len();
    if found < 2 {
        return Err(TabstatError::validation(format!(
            "minimum 2 groups required (found {found})"
        )));
    }
    aligned.require_rows(dependents.len() + found, id.display_name())?;
    let matrix = MatrixBuilder::new(&aligned).row_major(&dependents)?;

    let raw = ctx
        .invoke(
            id,
            vec![EngineArg::Matrix(matrix), EngineArg::Labels(labels.to_vec())],
        )
        .await?;
    let pillai = raw.number("pillaiTrace")?;
    let f = raw.number("fStatistic")?;
    let p = raw.number("pValue")?;
    let df1 = raw.number("dfHypothesis")?;
    let df2 = raw.number("dfError")?;

    let fmt = ctx.format();
    let mut out = new_output(
        id,
        ComparisonDetails {
            effect_size_measure: Some("pillaiTrace".to_string()),
            df_between: Some(df1),
            df_within: Some(df2),
            n: Some(aligned.len()),
            ..Default::default()
        },
    );
    headline(&mut out, ctx, "F", f, p, Some(df1));
    out.effect_size = Some(pillai);
    out.metric("Pillai's trace", fmt.number(pillai));
    if let Some(wilks) = raw.optional_number("wilksLambda")? {
        out.metric("Wilks' Λ", fmt.number(wilks));
    }
    out.interpretation = format!(
        "The combined outcomes ({}) differ across groups in a way that is {} (Pillai's trace = {}, F({}, {}) = {}, p = {}).",
        dependents.join(", "),
        interpret::significance(p, ctx.alpha()),
        fmt.number(pillai),
        fmt.df(df1),
        fmt.df(df2),
        fmt.number(f),
        fmt.p_value(p),
    );
    Ok(out)
}
