//! Per-family method tables.
//!
//! Each family is a closed enum. Its table row fixes the public id, the
//! display name, the roles the method accepts and the engine routine it
//! calls, so adding a method means adding exactly one row here and one match
//! arm in the family's handler.

use super::signature::{ArgKind, RoleSpec, RoutineSignature};
use super::Category;
use crate::data::Role;
use crate::extract::ExtractionMode;

macro_rules! method_family {
    (
        $(#[$meta:meta])*
        $name:ident => $category:expr, $mode:expr;
        $(
            $variant:ident => $id:literal, $display:literal,
                roles [$($role:expr),* $(,)?],
                routine $routine:literal [$($arg:ident),* $(,)?];
        )+
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every method of this family, in registration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const CATEGORY: Category = $category;

            pub fn id(&self) -> &'static str {
                match self {
                    $($name::$variant => $id),+
                }
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $display),+
                }
            }

            pub fn roles(&self) -> &'static [RoleSpec] {
                match self {
                    $($name::$variant => {
                        const ROLES: &[RoleSpec] = &[$($role),*];
                        ROLES
                    }),+
                }
            }

            pub fn routine(&self) -> RoutineSignature {
                match self {
                    $($name::$variant => {
                        const ARGS: &[ArgKind] = &[$(ArgKind::$arg),*];
                        RoutineSignature { name: $routine, args: ARGS }
                    }),+
                }
            }

            pub fn extraction_mode(&self) -> ExtractionMode {
                $mode
            }
        }
    };
}

method_family! {
    /// Summaries of single variables and contingency tables.
    DescriptiveMethod => Category::Descriptive, ExtractionMode::Filtering;
    DescriptiveStats => "descriptive-stats", "Descriptive Statistics",
        roles [RoleSpec::at_least(Role::Variables, 1)],
        routine "descriptive_stats" [Numbers];
    FrequencyTable => "frequency-table", "Frequency Table",
        roles [RoleSpec::one(Role::Variables)],
        routine "frequency_table" [Labels];
    Crosstab => "crosstab", "Cross Tabulation",
        roles [RoleSpec::one(Role::Row), RoleSpec::one(Role::Column)],
        routine "crosstab" [Labels, Labels];
}

method_family! {
    /// Parametric and non-parametric tests of location and spread.
    ComparisonMethod => Category::Comparison, ExtractionMode::Filtering;
    OneSampleTTest => "one-sample-t-test", "One-Sample t-Test",
        roles [RoleSpec::one(Role::Dependent)],
        routine "one_sample_t_test" [Numbers, Scalar, Text];
    IndependentTTest => "independent-t-test", "Independent Samples t-Test",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "independent_t_test" [Numbers, Numbers, Text];
    WelchTTest => "welch-t-test", "Welch's t-Test",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "welch_t_test" [Numbers, Numbers, Text];
    PairedTTest => "paired-t-test", "Paired Samples t-Test",
        roles [RoleSpec::exactly(Role::Variables, 2)],
        routine "paired_t_test" [Numbers, Numbers, Text];
    OneWayAnova => "one-way-anova", "One-Way ANOVA",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "one_way_anova" [Groups];
    WelchAnova => "welch-anova", "Welch's ANOVA",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "welch_anova" [Groups];
    TwoWayAnova => "two-way-anova", "Two-Way ANOVA",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::exactly(Role::Factor, 2)],
        routine "two_way_anova" [Numbers, Labels, Labels];
    RepeatedMeasuresAnova => "repeated-measures-anova", "Repeated Measures ANOVA",
        roles [RoleSpec::at_least(Role::Variables, 2)],
        routine "repeated_measures_anova" [RowMajor];
    Ancova => "ancova", "ANCOVA",
        roles [
            RoleSpec::one(Role::Dependent),
            RoleSpec::one(Role::Group),
            RoleSpec::at_least(Role::Covariates, 1),
        ],
        routine "ancova" [Numbers, Labels, ColumnMajor];
    Manova => "manova", "MANOVA",
        roles [RoleSpec::at_least(Role::Dependent, 2), RoleSpec::one(Role::Group)],
        routine "manova" [RowMajor, Labels];
    MannWhitney => "mann-whitney", "Mann-Whitney U Test",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "mann_whitney" [Numbers, Numbers, Text];
    WilcoxonSignedRank => "wilcoxon-signed-rank", "Wilcoxon Signed-Rank Test",
        roles [RoleSpec::exactly(Role::Variables, 2)],
        routine "wilcoxon_signed_rank" [Numbers, Numbers, Text];
    KruskalWallis => "kruskal-wallis", "Kruskal-Wallis H Test",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "kruskal_wallis" [Groups];
    Friedman => "friedman", "Friedman Test",
        roles [RoleSpec::at_least(Role::Variables, 3)],
        routine "friedman" [RowMajor];
    SignTest => "sign-test", "Sign Test",
        roles [RoleSpec::exactly(Role::Variables, 2)],
        routine "sign_test" [Numbers, Numbers];
    McNemar => "mcnemar", "McNemar's Test",
        roles [RoleSpec::exactly(Role::Variables, 2)],
        routine "mcnemar" [Labels, Labels];
    LeveneTest => "levene-test", "Levene's Test",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "levene_test" [Groups];
}

method_family! {
    /// Pairwise follow-ups to an omnibus test.
    PostHocMethod => Category::PostHoc, ExtractionMode::Filtering;
    TukeyHsd => "tukey-hsd", "Tukey HSD",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "tukey_hsd" [Groups, Labels, Scalar];
    GamesHowell => "games-howell", "Games-Howell",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "games_howell" [Groups, Labels, Scalar];
    Bonferroni => "bonferroni", "Bonferroni Pairwise Comparisons",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "bonferroni" [Groups, Labels, Scalar];
    Scheffe => "scheffe", "Scheffé Test",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "scheffe" [Groups, Labels, Scalar];
    DunnTest => "dunn-test", "Dunn's Test",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Group)],
        routine "dunn_test" [Groups, Labels, Scalar];
}

method_family! {
    /// Linear and generalized linear models.
    RegressionMethod => Category::Regression, ExtractionMode::Filtering;
    SimpleRegression => "simple-regression", "Simple Linear Regression",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Independent)],
        routine "simple_regression" [Numbers, Numbers];
    MultipleRegression => "multiple-regression", "Multiple Linear Regression",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::at_least(Role::Independent, 1)],
        routine "multiple_regression" [RowMajor, Numbers];
    LogisticRegression => "logistic-regression", "Logistic Regression",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::at_least(Role::Independent, 1)],
        routine "logistic_regression" [RowMajor, Numbers];
    PolynomialRegression => "polynomial-regression", "Polynomial Regression",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::one(Role::Independent)],
        routine "polynomial_regression" [Numbers, Numbers, Scalar];
    StepwiseRegression => "stepwise-regression", "Stepwise Regression",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::at_least(Role::Independent, 2)],
        routine "stepwise_regression" [RowMajor, Numbers, Labels, Scalar, Scalar];
    PoissonRegression => "poisson-regression", "Poisson Regression",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::at_least(Role::Independent, 1)],
        routine "poisson_regression" [RowMajor, Numbers];
    RidgeRegression => "ridge-regression", "Ridge Regression",
        roles [RoleSpec::one(Role::Dependent), RoleSpec::at_least(Role::Independent, 1)],
        routine "ridge_regression" [RowMajor, Numbers, Scalar];
}

method_family! {
    /// Measures of association between numeric variables.
    CorrelationMethod => Category::Correlation, ExtractionMode::Filtering;
    Pearson => "pearson-correlation", "Pearson Correlation",
        roles [RoleSpec::exactly(Role::Variables, 2)],
        routine "pearson_correlation" [Numbers, Numbers];
    Spearman => "spearman-correlation", "Spearman Rank Correlation",
        roles [RoleSpec::exactly(Role::Variables, 2)],
        routine "spearman_correlation" [Numbers, Numbers];
    Kendall => "kendall-correlation", "Kendall's Tau",
        roles [RoleSpec::exactly(Role::Variables, 2)],
        routine "kendall_correlation" [Numbers, Numbers];
    Partial => "partial-correlation", "Partial Correlation",
        roles [RoleSpec::exactly(Role::Variables, 2), RoleSpec::at_least(Role::Covariates, 1)],
        routine "partial_correlation" [Numbers, Numbers, ColumnMajor];
    Matrix => "correlation-matrix", "Correlation Matrix",
        roles [RoleSpec::at_least(Role::Variables, 2)],
        routine "correlation_matrix" [ColumnMajor, Text];
}

method_family! {
    /// Component and factor extraction.
    DimensionReductionMethod => Category::DimensionReduction, ExtractionMode::Strict;
    Pca => "pca", "Principal Component Analysis",
        roles [RoleSpec::at_least(Role::Variables, 2)],
        routine "pca" [RowMajor, Scalar];
    FactorAnalysis => "factor-analysis", "Exploratory Factor Analysis",
        roles [RoleSpec::at_least(Role::Variables, 3)],
        routine "factor_analysis" [RowMajor, Scalar, Text];
}

method_family! {
    /// Unsupervised partitioning of samples.
    ClusteringMethod => Category::Clustering, ExtractionMode::Filtering;
    KMeans => "kmeans", "K-Means Clustering",
        roles [RoleSpec::at_least(Role::Variables, 1)],
        routine "kmeans" [RowMajor, Scalar];
    Hierarchical => "hierarchical-clustering", "Hierarchical Clustering",
        roles [RoleSpec::at_least(Role::Variables, 1)],
        routine "hierarchical_clustering" [RowMajor, Scalar, Text];
}

method_family! {
    /// Distributional and contingency-table tests.
    GoodnessOfFitMethod => Category::GoodnessOfFit, ExtractionMode::Filtering;
    ChiSquareGoodnessOfFit => "chi-square-goodness-of-fit", "Chi-Square Goodness of Fit",
        roles [RoleSpec::one(Role::Variables)],
        routine "chi_square_goodness_of_fit" [Labels, Numbers];
    ChiSquareIndependence => "chi-square-independence", "Chi-Square Test of Independence",
        roles [RoleSpec::one(Role::Row), RoleSpec::one(Role::Column)],
        routine "chi_square_independence" [Labels, Labels];
    FisherExact => "fisher-exact", "Fisher's Exact Test",
        roles [RoleSpec::one(Role::Row), RoleSpec::one(Role::Column)],
        routine "fisher_exact" [Labels, Labels, Text];
    ShapiroWilk => "shapiro-wilk", "Shapiro-Wilk Normality Test",
        roles [RoleSpec::one(Role::Dependent)],
        routine "shapiro_wilk" [Numbers];
    KolmogorovSmirnov => "kolmogorov-smirnov", "Kolmogorov-Smirnov Test",
        roles [RoleSpec::one(Role::Dependent)],
        routine "kolmogorov_smirnov" [Numbers, Text];
    AndersonDarling => "anderson-darling", "Anderson-Darling Test",
        roles [RoleSpec::one(Role::Dependent)],
        routine "anderson_darling" [Numbers];
}

method_family! {
    /// Internal consistency and agreement of scale items or raters.
    ReliabilityMethod => Category::Reliability, ExtractionMode::Strict;
    CronbachAlpha => "cronbach-alpha", "Cronbach's Alpha",
        roles [RoleSpec::at_least(Role::Items, 2)],
        routine "cronbach_alpha" [RowMajor];
    Icc => "icc", "Intraclass Correlation",
        roles [RoleSpec::at_least(Role::Items, 2)],
        routine "icc" [RowMajor, Text];
}

method_family! {
    /// A-priori power and sample-size calculations; these take no data.
    PowerMethod => Category::PowerAnalysis, ExtractionMode::Filtering;
    TTest => "power-t-test", "Power Analysis: t-Test",
        roles [],
        routine "power_t_test" [Scalar, Scalar, Text, Scalar, Text];
    Anova => "power-anova", "Power Analysis: ANOVA",
        roles [],
        routine "power_anova" [Scalar, Scalar, Scalar, Text, Scalar];
    Correlation => "power-correlation", "Power Analysis: Correlation",
        roles [],
        routine "power_correlation" [Scalar, Scalar, Text, Scalar];
}

method_family! {
    /// Time-to-event analysis.
    SurvivalMethod => Category::Survival, ExtractionMode::Filtering;
    KaplanMeier => "kaplan-meier", "Kaplan-Meier Estimator",
        roles [
            RoleSpec::one(Role::Time),
            RoleSpec::one(Role::Event),
            RoleSpec::optional(Role::Group),
        ],
        routine "kaplan_meier" [Numbers, Numbers, Labels];
    CoxRegression => "cox-regression", "Cox Proportional Hazards Regression",
        roles [
            RoleSpec::one(Role::Time),
            RoleSpec::one(Role::Event),
            RoleSpec::at_least(Role::Covariates, 1),
        ],
        routine "cox_regression" [Numbers, Numbers, ColumnMajor];
    LogRank => "log-rank-test", "Log-Rank Test",
        roles [
            RoleSpec::one(Role::Time),
            RoleSpec::one(Role::Event),
            RoleSpec::one(Role::Group),
        ],
        routine "log_rank_test" [Numbers, Numbers, Labels];
}
