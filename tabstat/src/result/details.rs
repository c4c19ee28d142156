//! Category-specific result details.
//!
//! Each category carries its own struct under the `additional` key. Fields are
//! optional because the engine may legitimately omit some of them; the
//! result-schema validator reports which ones a given result lacks.

use serde::Serialize;

use crate::methods::Category;

/// Per-variable summary produced by descriptive methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSummary {
    pub variable: String,
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveDetails {
    pub n: Option<usize>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub variables: Option<Vec<VariableSummary>>,
    pub categories: Option<Vec<String>>,
    pub counts: Option<Vec<f64>>,
}

/// Size and location of one group in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStat {
    pub name: String,
    pub n: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDetails {
    pub group_stats: Option<Vec<GroupStat>>,
    pub effect_size_measure: Option<String>,
    pub df_between: Option<f64>,
    pub df_within: Option<f64>,
    pub n: Option<usize>,
}

/// One pairwise contrast of a post-hoc procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairwiseComparison {
    pub group_a: String,
    pub group_b: String,
    pub difference: f64,
    pub p_value: f64,
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
    pub significant: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostHocDetails {
    pub comparisons: Option<Vec<PairwiseComparison>>,
    pub adjustment: Option<String>,
    pub significant_pairs: Option<usize>,
}

/// One model term.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionDetails {
    pub r_squared: Option<f64>,
    pub adjusted_r_squared: Option<f64>,
    pub coefficients: Option<Vec<Coefficient>>,
    pub n: Option<usize>,
    pub selected_predictors: Option<Vec<String>>,
    pub accuracy: Option<f64>,
    pub aic: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationDetails {
    pub n: Option<usize>,
    pub variables: Option<Vec<String>>,
    pub matrix: Option<Vec<Vec<f64>>>,
    pub p_values: Option<Vec<Vec<f64>>>,
    pub controlled_for: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionReductionDetails {
    pub explained_variance: Option<Vec<f64>>,
    pub loadings: Option<Vec<Vec<f64>>>,
    pub eigenvalues: Option<Vec<f64>>,
    pub kmo: Option<f64>,
    pub bartlett_p_value: Option<f64>,
    pub n_components: Option<usize>,
    pub rotation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringDetails {
    pub labels: Option<Vec<usize>>,
    pub cluster_sizes: Option<Vec<usize>>,
    pub silhouette_score: Option<f64>,
    pub centers: Option<Vec<Vec<f64>>>,
    pub linkage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodnessOfFitDetails {
    pub observed: Option<Vec<f64>>,
    pub expected: Option<Vec<f64>>,
    pub categories: Option<Vec<String>>,
    pub n: Option<usize>,
    pub distribution: Option<String>,
}

/// Statistics for one scale item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatistic {
    pub item: String,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub item_total_correlation: Option<f64>,
    pub alpha_if_deleted: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilityDetails {
    pub coefficient: Option<f64>,
    pub item_statistics: Option<Vec<ItemStatistic>>,
    pub n_items: Option<usize>,
    pub n: Option<usize>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerDetails {
    pub power: Option<f64>,
    pub sample_size: Option<usize>,
    pub alpha: Option<f64>,
    pub solve_for: Option<String>,
}

/// Hazard ratio for one covariate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardRatio {
    pub term: String,
    pub ratio: f64,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalDetails {
    pub events: Option<usize>,
    pub n: Option<usize>,
    pub median_survival: Option<f64>,
    pub hazard_ratios: Option<Vec<HazardRatio>>,
    pub groups: Option<Vec<String>>,
}

/// Category-specific details, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum CategoryDetails {
    Descriptive(DescriptiveDetails),
    Comparison(ComparisonDetails),
    PostHoc(PostHocDetails),
    Regression(RegressionDetails),
    Correlation(CorrelationDetails),
    DimensionReduction(DimensionReductionDetails),
    Clustering(ClusteringDetails),
    GoodnessOfFit(GoodnessOfFitDetails),
    Reliability(ReliabilityDetails),
    PowerAnalysis(PowerDetails),
    Survival(SurvivalDetails),
}

impl CategoryDetails {
    /// Empty details for `category`.
    pub fn empty(category: Category) -> Self {
        match category {
            Category::Descriptive => Self::Descriptive(Default::default()),
            Category::Comparison => Self::Comparison(Default::default()),
            Category::PostHoc => Self::PostHoc(Default::default()),
            Category::Regression => Self::Regression(Default::default()),
            Category::Correlation => Self::Correlation(Default::default()),
            Category::DimensionReduction => Self::DimensionReduction(Default::default()),
            Category::Clustering => Self::Clustering(Default::default()),
            Category::GoodnessOfFit => Self::GoodnessOfFit(Default::default()),
            Category::Reliability => Self::Reliability(Default::default()),
            Category::PowerAnalysis => Self::PowerAnalysis(Default::default()),
            Category::Survival => Self::Survival(Default::default()),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Descriptive(_) => Category::Descriptive,
            Self::Comparison(_) => Category::Comparison,
            Self::PostHoc(_) => Category::PostHoc,
            Self::Regression(_) => Category::Regression,
            Self::Correlation(_) => Category::Correlation,
            Self::DimensionReduction(_) => Category::DimensionReduction,
            Self::Clustering(_) => Category::Clustering,
            Self::GoodnessOfFit(_) => Category::GoodnessOfFit,
            Self::Reliability(_) => Category::Reliability,
            Self::PowerAnalysis(_) => Category::PowerAnalysis,
            Self::Survival(_) => Category::Survival,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matches_category() {
        for category in Category::ALL {
            assert_eq!(CategoryDetails::empty(*category).category(), *category);
        }
    }

    #[test]
    fn test_serializes_with_category_tag() {
        let details = CategoryDetails::Regression(RegressionDetails {
            r_squared: Some(0.42),
            ..Default::default()
        });
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["category"], "regression");
        assert_eq!(json["rSquared"], 0.42);
        assert!(json["adjustedRSquared"].is_null());
    }
}
