//! Result schema validation.
//!
//! Checks a produced [`AnalysisOutput`] against the fields its category
//! requires and recommends, and scores its completeness. Validation never
//! fails; a result that misses required fields is reported as invalid.
//!
//! # Examples
//!
//! ```rust
//! use tabstat::methods::{MethodId, RegressionMethod};
//! use tabstat::result::{AnalysisOutput, CategoryDetails, RegressionDetails};
//! use tabstat::validator::ResultSchemaValidator;
//!
//! let method = MethodId::Regression(RegressionMethod::SimpleRegression);
//! let mut output = AnalysisOutput::new(
//!     method,
//!     CategoryDetails::Regression(RegressionDetails::default()),
//! );
//! output.interpretation = "Slope is positive.".to_string();
//!
//! let report = ResultSchemaValidator::new().validate(&output, "simple-regression");
//! assert!(!report.valid);
//! assert!(report.missing_required.contains(&"additional.rSquared".to_string()));
//! ```

mod aliases;
mod schema;

use serde::Serialize;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::methods::Category;
use crate::result::{AnalysisOutput, CalculatorResult, ResultField};

pub use aliases::{category_for_method, normalize};
pub use schema::{recommended_fields, required_fields};

/// Outcome of validating one result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidation {
    pub valid: bool,
    pub missing_required: Vec<String>,
    pub missing_recommended: Vec<String>,
    /// Completeness from 0 to 100
    pub score: u8,
    pub suggestions: Vec<String>,
}

/// Per-method entry of a batch validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub method_id: String,
    pub validation: SchemaValidation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchValidation {
    pub all_valid: bool,
    pub failed_methods: Vec<String>,
    pub average_score: f64,
    pub entries: Vec<BatchEntry>,
}

/// Validates results against the per-category field tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultSchemaValidator {
    required_weight: f64,
}

impl Default for ResultSchemaValidator {
    fn default() -> Self {
        Self {
            required_weight: 70.0,
        }
    }
}

impl From<&PipelineConfig> for ResultSchemaValidator {
    fn from(config: &PipelineConfig) -> Self {
        Self::new().with_required_weight(config.required_weight)
    }
}

impl ResultSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of the score carried by required fields, clamped to 0..=100.
    pub fn with_required_weight(mut self, weight: f64) -> Self {
        self.required_weight = weight.clamp(0.0, 100.0);
        self
    }

    pub fn category_for_method(&self, method_id: &str) -> Category {
        category_for_method(method_id)
    }

    pub fn validate(&self, result: &AnalysisOutput, method_id: &str) -> SchemaValidation {
        let category = category_for_method(method_id);
        self.check(category, |field| result.has_field(field))
    }

    /// Validates a dispatch outcome; a failure holds none of the fields.
    pub fn validate_result(&self, result: &CalculatorResult, method_id: &str) -> SchemaValidation {
        match result.output() {
            Some(output) => self.validate(output, method_id),
            None => self.check(category_for_method(method_id), |_| false),
        }
    }

    pub fn validate_batch<'a, I>(&self, entries: I) -> BatchValidation
    where
        I: IntoIterator<Item = (&'a str, &'a AnalysisOutput)>,
    {
        let entries: Vec<BatchEntry> = entries
            .into_iter()
            .map(|(method_id, output)| BatchEntry {
                method_id: method_id.to_string(),
                validation: self.validate(output, method_id),
            })
            .collect();
        let failed_methods: Vec<String> = entries
            .iter()
            .filter(|e| !e.validation.valid)
            .map(|e| e.method_id.clone())
            .collect();
        let average_score = if entries.is_empty() {
            0.0
        } else {
            entries
                .iter()
                .map(|e| f64::from(e.validation.score))
                .sum::<f64>()
                / entries.len() as f64
        };
        debug!(
            entries = entries.len(),
            failed = failed_methods.len(),
            average_score,
            "Batch validation complete"
        );
        BatchValidation {
            all_valid: failed_methods.is_empty(),
            failed_methods,
            average_score,
            entries,
        }
    }

    fn check(&self, category: Category, present: impl Fn(ResultField) -> bool) -> SchemaValidation {
        let required = required_fields(category);
        let recommended = recommended_fields(category);
        let missing_required: Vec<String> = missing(required, &present);
        let missing_recommended: Vec<String> = missing(recommended, &present);

        let required_fraction = fraction(required.len(), missing_required.len());
        let recommended_fraction = fraction(recommended.len(), missing_recommended.len());
        let score = (self.required_weight * required_fraction
            + (100.0 - self.required_weight) * recommended_fraction)
            .round()
            .clamp(0.0, 100.0) as u8;

        let mut suggestions: Vec<String> = missing_required
            .iter()
            .map(|field| format!("Add required field '{field}'"))
            .collect();
        if score < 100 {
            suggestions.push(if missing_recommended.is_empty() {
                "Add recommended fields to improve completeness".to_string()
            } else {
                format!(
                    "Add recommended fields to improve completeness: {}",
                    missing_recommended.join(", ")
                )
            });
        }

        SchemaValidation {
            valid: missing_required.is_empty(),
            missing_required,
            missing_recommended,
            score,
            suggestions,
        }
    }
}

fn missing(fields: &[ResultField], present: &impl Fn(ResultField) -> bool) -> Vec<String> {
    fields
        .iter()
        .filter(|f| !present(**f))
        .map(|f| f.path().to_string())
        .collect()
}

/// Share of `total` fields present; 1 when there are none to check.
fn fraction(total: usize, missing: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (total - missing) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabstatError;
    use crate::methods::{ComparisonMethod, MethodId, RegressionMethod};
    use crate::result::{
        CategoryDetails, Coefficient, ComparisonDetails, ConfidenceInterval, GroupStat,
        RegressionDetails,
    };

    fn t_test(complete: bool) -> AnalysisOutput {
        let mut out = AnalysisOutput::new(
            MethodId::Comparison(ComparisonMethod::IndependentTTest),
            CategoryDetails::Comparison(ComparisonDetails {
                group_stats: complete.then(|| {
                    vec![GroupStat {
                        name: "a".to_string(),
                        n: 3,
                        mean: 1.0,
                        std_dev: None,
                    }]
                }),
                ..Default::default()
            }),
        );
        out.statistic = Some(2.1);
        out.p_value = Some(0.04);
        out.interpretation = "The difference is significant.".to_string();
        if complete {
            out.effect_size = Some(0.8);
            out.df = Some(10.0);
            out.confidence = Some(ConfidenceInterval {
                lower: 0.1,
                upper: 1.9,
                level: 0.95,
            });
        }
        out
    }

    #[test]
    fn test_complete_result_scores_100() {
        let report = ResultSchemaValidator::new().validate(&t_test(true), "independent-t-test");
        assert!(report.valid);
        assert_eq!(report.score, 100);
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_required_only_scores_70() {
        let report = ResultSchemaValidator::new().validate(&t_test(false), "independent-t-test");
        assert!(report.valid);
        assert_eq!(report.score, 70);
        assert_eq!(report.missing_recommended.len(), 4);
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].starts_with("Add recommended fields"));
    }

    #[test]
    fn test_regression_missing_r_squared() {
        let mut out = AnalysisOutput::new(
            MethodId::Regression(RegressionMethod::MultipleRegression),
            CategoryDetails::Regression(RegressionDetails {
                r_squared: Some(f64::NAN),
                coefficients: Some(vec![Coefficient {
                    term: "x".to_string(),
                    estimate: 1.0,
                    std_error: None,
                    statistic: None,
                    p_value: None,
                }]),
                ..Default::default()
            }),
        );
        out.interpretation = "Fitted.".to_string();

        let report = ResultSchemaValidator::new().validate(&out, "multiple-regression");
        assert!(!report.valid);
        assert_eq!(report.missing_required, vec!["additional.rSquared".to_string()]);
        assert!(report
            .suggestions
            .contains(&"Add required field 'additional.rSquared'".to_string()));
        // 2 of 3 required, 0 of 4 recommended
        assert_eq!(report.score, 47);
    }

    #[test]
    fn test_failure_result_holds_no_fields() {
        let failure = CalculatorResult::failure(&TabstatError::validation("bad"));
        let report = ResultSchemaValidator::new().validate_result(&failure, "pca");
        assert!(!report.valid);
        assert_eq!(report.score, 0);
        assert_eq!(report.missing_required.len(), 3);
    }

    #[test]
    fn test_custom_weight() {
        let validator = ResultSchemaValidator::from(
            &PipelineConfig::default().with_required_weight(50.0),
        );
        assert_eq!(validator.validate(&t_test(false), "welch-t-test").score, 50);
    }

    #[test]
    fn test_batch() {
        let good = t_test(true);
        let partial = t_test(false);
        let mut broken = t_test(false);
        broken.p_value = None;

        let batch = ResultSchemaValidator::new().validate_batch([
            ("independent-t-test", &good),
            ("welch-t-test", &partial),
            ("paired-t-test", &broken),
        ]);
        assert!(!batch.all_valid);
        assert_eq!(batch.failed_methods, vec!["paired-t-test".to_string()]);
        assert_eq!(batch.entries.len(), 3);
        // (100 + 70 + 47) / 3
        assert!((batch.average_score - 217.0 / 3.0).abs() < 1e-9);
    }
}
