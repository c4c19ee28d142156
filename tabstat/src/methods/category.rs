//! Statistical method families.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A family of methods sharing one result-field schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Descriptive,
    Comparison,
    PostHoc,
    Regression,
    Correlation,
    DimensionReduction,
    Clustering,
    GoodnessOfFit,
    Reliability,
    PowerAnalysis,
    Survival,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::Descriptive,
        Category::Comparison,
        Category::PostHoc,
        Category::Regression,
        Category::Correlation,
        Category::DimensionReduction,
        Category::Clustering,
        Category::GoodnessOfFit,
        Category::Reliability,
        Category::PowerAnalysis,
        Category::Survival,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Descriptive => "descriptive",
            Category::Comparison => "comparison",
            Category::PostHoc => "postHoc",
            Category::Regression => "regression",
            Category::Correlation => "correlation",
            Category::DimensionReduction => "dimensionReduction",
            Category::Clustering => "clustering",
            Category::GoodnessOfFit => "goodnessOfFit",
            Category::Reliability => "reliability",
            Category::PowerAnalysis => "powerAnalysis",
            Category::Survival => "survival",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
