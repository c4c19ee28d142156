//! Typed names for the fields a result schema can require.

use serde::Serialize;
use std::fmt;

use super::details::CategoryDetails;
use super::AnalysisOutput;

/// A top-level or `additional.*` result field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResultField {
    Statistic,
    PValue,
    Df,
    EffectSize,
    Confidence,
    Interpretation,
    N,
    Mean,
    StdDev,
    GroupStats,
    Comparisons,
    Adjustment,
    SignificantPairs,
    RSquared,
    AdjustedRSquared,
    Coefficients,
    ExplainedVariance,
    Loadings,
    Eigenvalues,
    Kmo,
    BartlettPValue,
    Labels,
    ClusterSizes,
    SilhouetteScore,
    Centers,
    Observed,
    Coefficient,
    ItemStatistics,
    NItems,
    Power,
    SampleSize,
    Alpha,
    Events,
    MedianSurvival,
    HazardRatios,
}

impl ResultField {
    /// Dotted path as seen in the serialized result.
    pub fn path(&self) -> &'static str {
        match self {
            ResultField::Statistic => "statistic",
            ResultField::PValue => "pValue",
            ResultField::Df => "df",
            ResultField::EffectSize => "effectSize",
            ResultField::Confidence => "confidence",
            ResultField::Interpretation => "interpretation",
            ResultField::N => "additional.n",
            ResultField::Mean => "additional.mean",
            ResultField::StdDev => "additional.stdDev",
            ResultField::GroupStats => "additional.groupStats",
            ResultField::Comparisons => "additional.comparisons",
            ResultField::Adjustment => "additional.adjustment",
            ResultField::SignificantPairs => "additional.significantPairs",
            ResultField::RSquared => "additional.rSquared",
            ResultField::AdjustedRSquared => "additional.adjustedRSquared",
            ResultField::Coefficients => "additional.coefficients",
            ResultField::ExplainedVariance => "additional.explainedVariance",
            ResultField::Loadings => "additional.loadings",
            ResultField::Eigenvalues => "additional.eigenvalues",
            ResultField::Kmo => "additional.kmo",
            ResultField::BartlettPValue => "additional.bartlettPValue",
            ResultField::Labels => "additional.labels",
            ResultField::ClusterSizes => "additional.clusterSizes",
            ResultField::SilhouetteScore => "additional.silhouetteScore",
            ResultField::Centers => "additional.centers",
            ResultField::Observed => "additional.observed",
            ResultField::Coefficient => "additional.coefficient",
            ResultField::ItemStatistics => "additional.itemStatistics",
            ResultField::NItems => "additional.nItems",
            ResultField::Power => "additional.power",
            ResultField::SampleSize => "additional.sampleSize",
            ResultField::Alpha => "additional.alpha",
            ResultField::Events => "additional.events",
            ResultField::MedianSurvival => "additional.medianSurvival",
            ResultField::HazardRatios => "additional.hazardRatios",
        }
    }

    /// The last path segment, e.g. `rSquared`.
    pub fn name(&self) -> &'static str {
        let path = self.path();
        path.rsplit('.').next().unwrap_or(path)
    }
}

impl fmt::Display for ResultField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

fn num(value: Option<f64>) -> bool {
    value.is_some_and(|v| !v.is_nan())
}

fn list<T>(value: &Option<Vec<T>>) -> bool {
    value.as_ref().is_some_and(|v| !v.is_empty())
}

fn text(value: &Option<String>) -> bool {
    value.as_ref().is_some_and(|s| !s.trim().is_empty())
}

impl AnalysisOutput {
    /// Whether `field` holds a usable value: not null, not NaN, and not empty
    /// for strings and lists.
    pub fn has_field(&self, field: ResultField) -> bool {
        match field {
            ResultField::Statistic => num(self.statistic),
            ResultField::PValue => num(self.p_value),
            ResultField::Df => num(self.df),
            ResultField::EffectSize => num(self.effect_size),
            ResultField::Confidence => self
                .confidence
                .as_ref()
                .is_some_and(|ci| !ci.lower.is_nan() && !ci.upper.is_nan()),
            ResultField::Interpretation => !self.interpretation.trim().is_empty(),
            other => self.additional.has(other),
        }
    }
}

impl CategoryDetails {
    /// Whether this category's details hold `field`. Fields that belong to
    /// another category are absent.
    pub fn has(&self, field: ResultField) -> bool {
        use CategoryDetails as D;
        use ResultField as F;
        match (self, field) {
            (D::Descriptive(d), F::N) => d.n.is_some(),
            (D::Descriptive(d), F::Mean) => num(d.mean),
            (D::Descriptive(d), F::StdDev) => num(d.std_dev),

            (D::Comparison(d), F::GroupStats) => list(&d.group_stats),
            (D::Comparison(d), F::N) => d.n.is_some(),

            (D::PostHoc(d), F::Comparisons) => list(&d.comparisons),
            (D::PostHoc(d), F::Adjustment) => text(&d.adjustment),
            (D::PostHoc(d), F::SignificantPairs) => d.significant_pairs.is_some(),

            (D::Regression(d), F::RSquared) => num(d.r_squared),
            (D::Regression(d), F::AdjustedRSquared) => num(d.adjusted_r_squared),
            (D::Regression(d), F::Coefficients) => list(&d.coefficients),
            (D::Regression(d), F::N) => d.n.is_some(),

            (D::Correlation(d), F::N) => d.n.is_some(),

            (D::DimensionReduction(d), F::ExplainedVariance) => list(&d.explained_variance),
            (D::DimensionReduction(d), F::Loadings) => list(&d.loadings),
            (D::DimensionReduction(d), F::Eigenvalues) => list(&d.eigenvalues),
            (D::DimensionReduction(d), F::Kmo) => num(d.kmo),
            (D::DimensionReduction(d), F::BartlettPValue) => num(d.bartlett_p_value),

            (D::Clustering(d), F::Labels) => list(&d.labels),
            (D::Clustering(d), F::ClusterSizes) => list(&d.cluster_sizes),
            (D::Clustering(d), F::SilhouetteScore) => num(d.silhouette_score),
            (D::Clustering(d), F::Centers) => list(&d.centers),

            (D::GoodnessOfFit(d), F::Observed) => list(&d.observed),
            (D::GoodnessOfFit(d), F::N) => d.n.is_some(),

            (D::Reliability(d), F::Coefficient) => num(d.coefficient),
            (D::Reliability(d), F::ItemStatistics) => list(&d.item_statistics),
            (D::Reliability(d), F::NItems) => d.n_items.is_some(),
            (D::Reliability(d), F::N) => d.n.is_some(),

            (D::PowerAnalysis(d), F::Power) => num(d.power),
            (D::PowerAnalysis(d), F::SampleSize) => d.sample_size.is_some(),
            (D::PowerAnalysis(d), F::Alpha) => num(d.alpha),

            (D::Survival(d), F::Events) => d.events.is_some(),
            (D::Survival(d), F::MedianSurvival) => num(d.median_survival),
            (D::Survival(d), F::HazardRatios) => list(&d.hazard_ratios),
            (D::Survival(d), F::N) => d.n.is_some(),

            _ => false,
        }
    }
}
