//! The stable result shape returned for every dispatch.
//!
//! A dispatch yields a [`CalculatorResult`]: either a complete
//! [`AnalysisOutput`] or a structured failure. Outputs are generically
//! renderable (formatted metrics, named tables, an interpretation) and carry
//! typed summary fields plus per-category [`CategoryDetails`] under
//! `additional`.

mod details;
mod field;
pub mod format;
pub mod interpret;

use serde::{Serialize, Serializer};

use crate::error::{ErrorKind, TabstatError};
use crate::methods::{Category, MethodId};

pub use details::{
    CategoryDetails, ClusteringDetails, Coefficient, ComparisonDetails, CorrelationDetails,
    DescriptiveDetails, DimensionReductionDetails, GoodnessOfFitDetails, GroupStat, HazardRatio,
    ItemStatistic, PairwiseComparison, PostHocDetails, PowerDetails, RegressionDetails,
    ReliabilityDetails, SurvivalDetails, VariableSummary,
};
pub use field::ResultField;
pub use format::NumberFormat;

/// A formatted label/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

/// A named set of rows with fixed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_row(cells);
        self
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Row whose first cell equals `label`.
    pub fn row(&self, label: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|r| r.first().map(String::as_str) == Some(label))
            .map(Vec::as_slice)
    }
}

/// A confidence interval with its level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

/// A complete analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub method_id: String,
    pub method_name: String,
    pub category: Category,
    pub metrics: Vec<Metric>,
    pub tables: Vec<ResultTable>,
    pub interpretation: String,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub df: Option<f64>,
    pub effect_size: Option<f64>,
    pub confidence: Option<ConfidenceInterval>,
    pub additional: CategoryDetails,
}

impl AnalysisOutput {
    pub fn new(method: MethodId, additional: CategoryDetails) -> Self {
        Self {
            method_id: method.id().to_string(),
            method_name: method.display_name().to_string(),
            category: method.category(),
            metrics: Vec::new(),
            tables: Vec::new(),
            interpretation: String::new(),
            statistic: None,
            p_value: None,
            df: None,
            effect_size: None,
            confidence: None,
            additional,
        }
    }

    pub fn metric(&mut self, label: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.metrics.push(Metric {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    pub fn table(&mut self, table: ResultTable) -> &mut Self {
        self.tables.push(table);
        self
    }

    /// Value of the metric labelled `label`.
    pub fn metric_value(&self, label: &str) -> Option<&str> {
        self.metrics
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.value.as_str())
    }

    pub fn find_table(&self, name: &str) -> Option<&ResultTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// The outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum CalculatorResult {
    Success(Box<AnalysisOutput>),
    Failure { error: String, kind: ErrorKind },
}

impl CalculatorResult {
    pub fn success(output: AnalysisOutput) -> Self {
        Self::Success(Box::new(output))
    }

    pub fn failure(err: &TabstatError) -> Self {
        Self::Failure {
            error: err.to_string(),
            kind: err.kind(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn output(&self) -> Option<&AnalysisOutput> {
        match self {
            Self::Success(output) => Some(output),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<crate::error::Result<AnalysisOutput>> for CalculatorResult {
    fn from(result: crate::error::Result<AnalysisOutput>) -> Self {
        match result {
            Ok(output) => Self::success(output),
            Err(e) => Self::failure(&e),
        }
    }
}

#[derive(Serialize)]
struct SuccessRepr<'a> {
    success: bool,
    #[serde(flatten)]
    output: &'a AnalysisOutput,
}

#[derive(Serialize)]
struct FailureRepr<'a> {
    success: bool,
    error: &'a str,
    kind: ErrorKind,
}

impl Serialize for CalculatorResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Success(output) => SuccessRepr {
                success: true,
                output,
            }
            .serialize(serializer),
            Self::Failure { error, kind } => FailureRepr {
                success: false,
                error,
                kind: *kind,
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::ComparisonMethod;

    #[test]
    fn test_success_serialization() {
        let method = MethodId::Comparison(ComparisonMethod::OneWayAnova);
        let mut output = AnalysisOutput::new(method, CategoryDetails::empty(Category::Comparison));
        output.metric("F", "12.0000");
        output.p_value = Some(0.001);
        let json = serde_json::to_value(CalculatorResult::success(output)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["methodId"], "one-way-anova");
        assert_eq!(json["pValue"], 0.001);
        assert_eq!(json["additional"]["category"], "comparison");
        assert_eq!(json["metrics"][0]["label"], "F");
    }

    #[test]
    fn test_failure_serialization() {
        let err = TabstatError::UnsupportedMethod("nope".to_string());
        let result = CalculatorResult::failure(&err);
        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::Unsupported));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "unsupported method: nope");
        assert_eq!(json["kind"], "unsupported");
    }

    #[test]
    fn test_table_rows() {
        let table = ResultTable::new("ANOVA", ["Source", "SS"])
            .with_row(["Between", "10.0"])
            .with_row(["Within", "4.0"]);
        assert_eq!(table.row("Within").unwrap()[1], "4.0");
        assert!(table.row("Total").is_none());
    }
}
