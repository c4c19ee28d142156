//! Method-id normalization and the alias table behind category lookup.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::methods::{Category, MethodId};

static SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[\s_\-]+").expect("Hard-coded regex pattern should be valid")
});

/// Common names that are not registered ids.
const SYNONYMS: &[(&str, Category)] = &[
    ("descriptives", Category::Descriptive),
    ("summary", Category::Descriptive),
    ("frequencies", Category::Descriptive),
    ("ttest", Category::Comparison),
    ("studentttest", Category::Comparison),
    ("anova", Category::Comparison),
    ("chisquare", Category::GoodnessOfFit),
    ("normality", Category::GoodnessOfFit),
    ("tukey", Category::PostHoc),
    ("posthoc", Category::PostHoc),
    ("regression", Category::Regression),
    ("linearregression", Category::Regression),
    ("logistic", Category::Regression),
    ("correlation", Category::Correlation),
    ("pearson", Category::Correlation),
    ("spearman", Category::Correlation),
    ("kendall", Category::Correlation),
    ("principalcomponents", Category::DimensionReduction),
    ("efa", Category::DimensionReduction),
    ("cluster", Category::Clustering),
    ("clustering", Category::Clustering),
    ("hierarchical", Category::Clustering),
    ("alpha", Category::Reliability),
    ("cronbach", Category::Reliability),
    ("reliability", Category::Reliability),
    ("power", Category::PowerAnalysis),
    ("samplesize", Category::PowerAnalysis),
    ("survival", Category::Survival),
    ("km", Category::Survival),
    ("cox", Category::Survival),
    ("logrank", Category::Survival),
];

static ALIASES: Lazy<HashMap<String, Category>> = Lazy::new(|| {
    let mut table: HashMap<String, Category> = HashMap::new();
    for category in Category::ALL {
        table.insert(normalize(category.as_str()), *category);
    }
    for (alias, category) in SYNONYMS {
        table.insert(normalize(alias), *category);
    }
    for method in MethodId::all() {
        table.insert(normalize(method.id()), method.category());
        table.insert(normalize(method.display_name()), method.category());
    }
    table
});

/// Lowercases and strips whitespace, hyphens and underscores.
pub fn normalize(method_id: &str) -> String {
    SEPARATORS.replace_all(method_id.trim(), "").to_lowercase()
}

/// Category for `method_id`; unknown ids fall back to comparison.
pub fn category_for_method(method_id: &str) -> Category {
    ALIASES
        .get(&normalize(method_id))
        .copied()
        .unwrap_or(Category::Comparison)
}
