//! Required and recommended result fields per category.

use crate::methods::Category;
use crate::result::ResultField;

use ResultField as F;

pub fn required_fields(category: Category) -> &'static [ResultField] {
    match category {
        Category::Descriptive => &[F::N, F::Interpretation],
        Category::Comparison => &[F::Statistic, F::PValue, F::Interpretation],
        Category::PostHoc => &[F::Comparisons, F::Interpretation],
        Category::Regression => &[F::RSquared, F::Coefficients, F::Interpretation],
        Category::Correlation => &[F::Statistic, F::PValue, F::Interpretation],
        Category::DimensionReduction => &[F::ExplainedVariance, F::Loadings, F::Interpretation],
        Category::Clustering => &[F::Labels, F::ClusterSizes, F::Interpretation],
        Category::GoodnessOfFit => &[F::Statistic, F::PValue, F::Interpretation],
        Category::Reliability => &[F::Coefficient, F::Interpretation],
        Category::PowerAnalysis => &[F::Power, F::SampleSize, F::Interpretation],
        Category::Survival => &[F::Events, F::Interpretation],
    }
}

pub fn recommended_fields(category: Category) -> &'static [ResultField] {
    match category {
        Category::Descriptive => &[F::Mean, F::StdDev],
        Category::Comparison => &[F::EffectSize, F::Df, F::Confidence, F::GroupStats],
        Category::PostHoc => &[F::Adjustment, F::SignificantPairs],
        Category::Regression => &[F::Statistic, F::PValue, F::AdjustedRSquared, F::N],
        Category::Correlation => &[F::Confidence, F::N],
        Category::DimensionReduction => &[F::Eigenvalues, F::Kmo, F::BartlettPValue],
        Category::Clustering => &[F::SilhouetteScore, F::Centers],
        Category::GoodnessOfFit => &[F::Df, F::EffectSize, F::Observed],
        Category::Reliability => &[F::Confidence, F::ItemStatistics, F::NItems],
        Category::PowerAnalysis => &[F::EffectSize, F::Alpha],
        Category::Survival => &[F::PValue, F::Statistic, F::MedianSurvival, F::HazardRatios],
    }
}
