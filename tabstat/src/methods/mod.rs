//! The method registry.
//!
//! Method identifiers form a closed enumeration: [`MethodId`] wraps one enum
//! per statistical family, and each family enum carries its own `ALL` table.
//! Everything the router, the handlers and the result validator need to know
//! about a method (category, declared roles, extraction mode, engine routine)
//! is answered by an exhaustive match, so a new method cannot be half
//! registered.

mod category;
mod families;
mod signature;

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::data::VariableRoles;
use crate::error::Result;
use crate::extract::ExtractionMode;

pub use category::Category;
pub use families::{
    ClusteringMethod, ComparisonMethod, CorrelationMethod, DescriptiveMethod,
    DimensionReductionMethod, GoodnessOfFitMethod, PostHocMethod, PowerMethod, RegressionMethod,
    ReliabilityMethod, SurvivalMethod,
};
pub use signature::{ArgKind, RoleSpec, RoutineSignature};

/// A registered statistical method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodId {
    Descriptive(DescriptiveMethod),
    Comparison(ComparisonMethod),
    PostHoc(PostHocMethod),
    Regression(RegressionMethod),
    Correlation(CorrelationMethod),
    DimensionReduction(DimensionReductionMethod),
    Clustering(ClusteringMethod),
    GoodnessOfFit(GoodnessOfFitMethod),
    Reliability(ReliabilityMethod),
    PowerAnalysis(PowerMethod),
    Survival(SurvivalMethod),
}

static BY_ID: Lazy<HashMap<&'static str, MethodId>> =
    Lazy::new(|| MethodId::all().into_iter().map(|m| (m.id(), m)).collect());

impl MethodId {
    /// Every registered method, grouped by family in category order.
    pub fn all() -> Vec<MethodId> {
        let mut all = Vec::new();
        all.extend(DescriptiveMethod::ALL.iter().copied().map(MethodId::Descriptive));
        all.extend(ComparisonMethod::ALL.iter().copied().map(MethodId::Comparison));
        all.extend(PostHocMethod::ALL.iter().copied().map(MethodId::PostHoc));
        all.extend(RegressionMethod::ALL.iter().copied().map(MethodId::Regression));
        all.extend(CorrelationMethod::ALL.iter().copied().map(MethodId::Correlation));
        all.extend(
            DimensionReductionMethod::ALL
                .iter()
                .copied()
                .map(MethodId::DimensionReduction),
        );
        all.extend(ClusteringMethod::ALL.iter().copied().map(MethodId::Clustering));
        all.extend(GoodnessOfFitMethod::ALL.iter().copied().map(MethodId::GoodnessOfFit));
        all.extend(ReliabilityMethod::ALL.iter().copied().map(MethodId::Reliability));
        all.extend(PowerMethod::ALL.iter().copied().map(MethodId::PowerAnalysis));
        all.extend(SurvivalMethod::ALL.iter().copied().map(MethodId::Survival));
        all
    }

    /// Looks up a method by its exact public identifier.
    ///
    /// ```rust
    /// use tabstat::methods::{Category, MethodId};
    ///
    /// let method = MethodId::from_id("one-way-anova").unwrap();
    /// assert_eq!(method.category(), Category::Comparison);
    /// assert!(MethodId::from_id("unknown-method-xyz").is_none());
    /// ```
    pub fn from_id(id: &str) -> Option<MethodId> {
        BY_ID.get(id).copied()
    }

    pub fn id(&self) -> &'static str {
        match self {
            MethodId::Descriptive(m) => m.id(),
            MethodId::Comparison(m) => m.id(),
            MethodId::PostHoc(m) => m.id(),
            MethodId::Regression(m) => m.id(),
            MethodId::Correlation(m) => m.id(),
            MethodId::DimensionReduction(m) => m.id(),
            MethodId::Clustering(m) => m.id(),
            MethodId::GoodnessOfFit(m) => m.id(),
            MethodId::Reliability(m) => m.id(),
            MethodId::PowerAnalysis(m) => m.id(),
            MethodId::Survival(m) => m.id(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MethodId::Descriptive(m) => m.display_name(),
            MethodId::Comparison(m) => m.display_name(),
            MethodId::PostHoc(m) => m.display_name(),
            MethodId::Regression(m) => m.display_name(),
            MethodId::Correlation(m) => m.display_name(),
            MethodId::DimensionReduction(m) => m.display_name(),
            MethodId::Clustering(m) => m.display_name(),
            MethodId::GoodnessOfFit(m) => m.display_name(),
            MethodId::Reliability(m) => m.display_name(),
            MethodId::PowerAnalysis(m) => m.display_name(),
            MethodId::Survival(m) => m.display_name(),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            MethodId::Descriptive(_) => DescriptiveMethod::CATEGORY,
            MethodId::Comparison(_) => ComparisonMethod::CATEGORY,
            MethodId::PostHoc(_) => PostHocMethod::CATEGORY,
            MethodId::Regression(_) => RegressionMethod::CATEGORY,
            MethodId::Correlation(_) => CorrelationMethod::CATEGORY,
            MethodId::DimensionReduction(_) => DimensionReductionMethod::CATEGORY,
            MethodId::Clustering(_) => ClusteringMethod::CATEGORY,
            MethodId::GoodnessOfFit(_) => GoodnessOfFitMethod::CATEGORY,
            MethodId::Reliability(_) => ReliabilityMethod::CATEGORY,
            MethodId::PowerAnalysis(_) => PowerMethod::CATEGORY,
            MethodId::Survival(_) => SurvivalMethod::CATEGORY,
        }
    }

    /// Roles the method accepts, with arity.
    pub fn roles(&self) -> &'static [RoleSpec] {
        match self {
            MethodId::Descriptive(m) => m.roles(),
            MethodId::Comparison(m) => m.roles(),
            MethodId::PostHoc(m) => m.roles(),
            MethodId::Regression(m) => m.roles(),
            MethodId::Correlation(m) => m.roles(),
            MethodId::DimensionReduction(m) => m.roles(),
            MethodId::Clustering(m) => m.roles(),
            MethodId::GoodnessOfFit(m) => m.roles(),
            MethodId::Reliability(m) => m.roles(),
            MethodId::PowerAnalysis(m) => m.roles(),
            MethodId::Survival(m) => m.roles(),
        }
    }

    /// The engine routine and its positional argument kinds.
    pub fn routine(&self) -> RoutineSignature {
        match self {
            MethodId::Descriptive(m) => m.routine(),
            MethodId::Comparison(m) => m.routine(),
            MethodId::PostHoc(m) => m.routine(),
            MethodId::Regression(m) => m.routine(),
            MethodId::Correlation(m) => m.routine(),
            MethodId::DimensionReduction(m) => m.routine(),
            MethodId::Clustering(m) => m.routine(),
            MethodId::GoodnessOfFit(m) => m.routine(),
            MethodId::Reliability(m) => m.routine(),
            MethodId::PowerAnalysis(m) => m.routine(),
            MethodId::Survival(m) => m.routine(),
        }
    }

    /// The declared extraction policy.
    ///
    /// Factor-analytic and reliability methods are strict: a scale with a
    /// malformed response must be fixed, not silently shortened. Every other
    /// family drops incomplete rows.
    pub fn extraction_mode(&self) -> ExtractionMode {
        match self {
            MethodId::Descriptive(m) => m.extraction_mode(),
            MethodId::Comparison(m) => m.extraction_mode(),
            MethodId::PostHoc(m) => m.extraction_mode(),
            MethodId::Regression(m) => m.extraction_mode(),
            MethodId::Correlation(m) => m.extraction_mode(),
            MethodId::DimensionReduction(m) => m.extraction_mode(),
            MethodId::Clustering(m) => m.extraction_mode(),
            MethodId::GoodnessOfFit(m) => m.extraction_mode(),
            MethodId::Reliability(m) => m.extraction_mode(),
            MethodId::PowerAnalysis(m) => m.extraction_mode(),
            MethodId::Survival(m) => m.extraction_mode(),
        }
    }

    /// Checks every declared role against the caller's assignment.
    pub fn check_roles(&self, roles: &VariableRoles) -> Result<()> {
        self.roles().iter().try_for_each(|role| role.check(roles))
    }

    pub fn descriptor(&self) -> MethodDescriptor {
        MethodDescriptor {
            id: self.id(),
            display_name: self.display_name(),
            category: self.category(),
            extraction_mode: self.extraction_mode(),
            roles: self.roles(),
            routine: self.routine(),
        }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Static description of a registered method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub category: Category,
    pub extraction_mode: ExtractionMode,
    pub roles: &'static [RoleSpec],
    pub routine: RoutineSignature,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Role;
    use std::collections::HashSet;

    #[test]
    fn test_registry_size_and_unique_ids() {
        let all = MethodId::all();
        assert_eq!(all.len(), 55);
        let ids: HashSet<_> = all.iter().map(|m| m.id()).collect();
        assert_eq!(ids.len(), all.len());
        let routines: HashSet<_> = all.iter().map(|m| m.routine().name).collect();
        assert_eq!(routines.len(), all.len());
    }

    #[test]
    fn test_from_id_roundtrip() {
        for method in MethodId::all() {
            assert_eq!(MethodId::from_id(method.id()), Some(method));
        }
        assert_eq!(MethodId::from_id("One-Way-ANOVA"), None);
    }

    #[test]
    fn test_every_category_is_populated() {
        for category in Category::ALL {
            assert!(
                MethodId::all().iter().any(|m| m.category() == *category),
                "no methods registered for {category}"
            );
        }
    }

    #[test]
    fn test_extraction_modes() {
        let pca = MethodId::DimensionReduction(DimensionReductionMethod::Pca);
        let alpha = MethodId::Reliability(ReliabilityMethod::CronbachAlpha);
        let cox = MethodId::Survival(SurvivalMethod::CoxRegression);
        assert_eq!(pca.extraction_mode(), ExtractionMode::Strict);
        assert_eq!(alpha.extraction_mode(), ExtractionMode::Strict);
        assert_eq!(cox.extraction_mode(), ExtractionMode::Filtering);
    }

    #[test]
    fn test_check_roles() {
        let anova = MethodId::Comparison(ComparisonMethod::OneWayAnova);
        let err = anova.check_roles(&VariableRoles::new()).unwrap_err();
        assert_eq!(err.to_string(), "measurement variable required");

        let roles = VariableRoles::new()
            .with(Role::Dependent, "score")
            .with(Role::Group, "arm");
        assert!(anova.check_roles(&roles).is_ok());

        let friedman = MethodId::Comparison(ComparisonMethod::Friedman);
        let roles = VariableRoles::new().with_all(Role::Variables, ["t1", "t2"]);
        assert_eq!(
            friedman.check_roles(&roles).unwrap_err().to_string(),
            "minimum 3 variables required"
        );
    }

    #[test]
    fn test_descriptor_serializes_camel_case() {
        let descriptor = MethodId::Survival(SurvivalMethod::KaplanMeier).descriptor();
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["category"], "survival");
        assert_eq!(json["extractionMode"], "filtering");
        assert_eq!(json["routine"]["name"], "kaplan_meier");
    }
}
