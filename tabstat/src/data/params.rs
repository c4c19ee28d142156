//! Variable roles and per-call analysis options.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::extract::ExtractionMode;

/// The part a column plays in an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Measured outcome.
    Dependent,
    /// Predictor(s).
    Independent,
    /// Grouping factor for between-group comparisons.
    Group,
    /// Crossed factors for factorial designs.
    Factor,
    /// Control variables.
    Covariates,
    /// Generic analysis variables (repeated measures, matrices, pairs).
    Variables,
    /// Scale items for reliability analysis.
    Items,
    /// Follow-up time for survival analysis.
    Time,
    /// Binary event indicator for survival analysis.
    Event,
    /// Row variable of a contingency table.
    Row,
    /// Column variable of a contingency table.
    Column,
}

impl Role {
    /// Message used when a required role is absent.
    pub fn missing_message(&self) -> &'static str {
        match self {
            Role::Dependent => "measurement variable required",
            Role::Independent => "independent variable required",
            Role::Group => "group variable required",
            Role::Factor => "factor variable required",
            Role::Covariates => "covariate variable required",
            Role::Variables => "analysis variables required",
            Role::Items => "scale items required",
            Role::Time => "time variable required",
            Role::Event => "event variable required",
            Role::Row => "row variable required",
            Role::Column => "column variable required",
        }
    }

    /// Plural noun used in arity messages ("minimum 3 variables required").
    pub fn plural_noun(&self) -> &'static str {
        match self {
            Role::Dependent => "dependent variables",
            Role::Independent => "predictors",
            Role::Group => "group variables",
            Role::Factor => "factors",
            Role::Covariates => "covariates",
            Role::Variables => "variables",
            Role::Items => "items",
            Role::Time => "time variables",
            Role::Event => "event variables",
            Role::Row => "row variables",
            Role::Column => "column variables",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dependent => "dependent",
            Role::Independent => "independent",
            Role::Group => "group",
            Role::Factor => "factor",
            Role::Covariates => "covariates",
            Role::Variables => "variables",
            Role::Items => "items",
            Role::Time => "time",
            Role::Event => "event",
            Role::Row => "row",
            Role::Column => "column",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from role to the column names assigned to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableRoles {
    assignments: BTreeMap<Role, Vec<String>>,
}

impl VariableRoles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a single column to a role, appending to existing assignments.
    pub fn with(mut self, role: Role, column: impl Into<String>) -> Self {
        self.assignments.entry(role).or_default().push(column.into());
        self
    }

    /// Assigns several columns to a role, appending to existing assignments.
    pub fn with_all<I, S>(mut self, role: Role, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignments
            .entry(role)
            .or_default()
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Returns the non-blank columns assigned to `role`.
    pub fn get(&self, role: Role) -> Vec<&str> {
        self.assignments
            .get(&role)
            .map(|cols| {
                cols.iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the first column assigned to `role`.
    pub fn first(&self, role: Role) -> Option<&str> {
        self.get(role).into_iter().next()
    }

    pub fn count(&self, role: Role) -> usize {
        self.get(role).len()
    }
}

/// Direction of the alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    #[default]
    TwoSided,
    Less,
    Greater,
}

impl Alternative {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alternative::TwoSided => "two-sided",
            Alternative::Less => "less",
            Alternative::Greater => "greater",
        }
    }
}

/// Optional knobs that individual methods read.
///
/// Every field defaults to "not set"; handlers fall back to documented
/// defaults (for example `alpha` falls back to the pipeline configuration).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisOptions {
    pub alpha: Option<f64>,
    pub test_value: Option<f64>,
    pub alternative: Alternative,
    pub confidence_level: Option<f64>,
    pub n_components: Option<usize>,
    pub n_clusters: Option<usize>,
    pub degree: Option<usize>,
    pub rotation: Option<String>,
    pub linkage: Option<String>,
    pub expected_proportions: Option<Vec<f64>>,
    pub effect_size: Option<f64>,
    pub power: Option<f64>,
    pub sample_size: Option<usize>,
    pub groups: Option<usize>,
    pub p_enter: Option<f64>,
    pub p_remove: Option<f64>,
    pub ridge_lambda: Option<f64>,
    pub distribution: Option<String>,
    /// `pearson`, `spearman` or `kendall` for correlation matrices.
    pub correlation_method: Option<String>,
    pub icc_model: Option<String>,
    /// Overrides the method's declared extraction mode for this call.
    pub extraction_mode: Option<ExtractionMode>,
}

/// Everything a caller supplies alongside the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    pub roles: VariableRoles,
    pub options: AnalysisOptions,
}

impl AnalysisParams {
    pub fn new(roles: VariableRoles) -> Self {
        Self {
            roles,
            options: AnalysisOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_builder_and_blank_filtering() {
        let roles = VariableRoles::new()
            .with(Role::Dependent, "score")
            .with_all(Role::Covariates, vec!["age", " ", "bmi"]);
        assert_eq!(roles.first(Role::Dependent), Some("score"));
        assert_eq!(roles.get(Role::Covariates), vec!["age", "bmi"]);
        assert_eq!(roles.count(Role::Group), 0);
    }

    #[test]
    fn test_params_deserialize() {
        let params: AnalysisParams = serde_json::from_str(
            r#"{
                "roles": {"dependent": ["score"], "group": ["arm"]},
                "options": {"alpha": 0.01, "alternative": "greater", "extractionMode": "strict"}
            }"#,
        )
        .unwrap();
        assert_eq!(params.roles.first(Role::Group), Some("arm"));
        assert_eq!(params.options.alpha, Some(0.01));
        assert_eq!(params.options.alternative, Alternative::Greater);
        assert_eq!(params.options.extraction_mode, Some(ExtractionMode::Strict));
    }
}
