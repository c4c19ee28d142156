//! Threshold bands used to phrase interpretations.

/// Describes a p-value against `alpha`.
pub fn significance(p: f64, alpha: f64) -> &'static str {
    if p < alpha {
        "statistically significant"
    } else {
        "not statistically significant"
    }
}

/// Cohen's d: 0.2 small, 0.5 medium, 0.8 large.
pub fn cohens_d(d: f64) -> &'static str {
    match d.abs() {
        x if x < 0.2 => "negligible",
        x if x < 0.5 => "small",
        x if x < 0.8 => "medium",
        _ => "large",
    }
}

/// Eta squared (and partial eta squared): .01 small, .06 medium, .14 large.
pub fn eta_squared(eta: f64) -> &'static str {
    match eta {
        x if x < 0.01 => "negligible",
        x if x < 0.06 => "small",
        x if x < 0.14 => "medium",
        _ => "large",
    }
}

/// Correlation-type coefficients (r, rho, tau, rank-biserial, Cramér's V):
/// .1 weak, .3 moderate, .5 strong.
pub fn correlation(r: f64) -> &'static str {
    match r.abs() {
        x if x < 0.1 => "negligible",
        x if x < 0.3 => "weak",
        x if x < 0.5 => "moderate",
        _ => "strong",
    }
}

pub fn direction(r: f64) -> &'static str {
    if r < 0.0 {
        "negative"
    } else {
        "positive"
    }
}

/// Coefficient of determination.
pub fn r_squared(r2: f64) -> &'static str {
    match r2 {
        x if x < 0.1 => "weak",
        x if x < 0.3 => "modest",
        x if x < 0.5 => "moderate",
        _ => "substantial",
    }
}

/// Internal consistency (Cronbach's alpha).
pub fn internal_consistency(alpha: f64) -> &'static str {
    match alpha {
        x if x >= 0.9 => "excellent",
        x if x >= 0.8 => "good",
        x if x >= 0.7 => "acceptable",
        x if x >= 0.6 => "questionable",
        x if x >= 0.5 => "poor",
        _ => "unacceptable",
    }
}

/// Intraclass correlation agreement.
pub fn agreement(icc: f64) -> &'static str {
    match icc {
        x if x < 0.5 => "poor",
        x if x < 0.75 => "moderate",
        x if x < 0.9 => "good",
        _ => "excellent",
    }
}

/// Silhouette width of a clustering.
pub fn cluster_structure(silhouette: f64) -> &'static str {
    match silhouette {
        x if x > 0.7 => "strong",
        x if x > 0.5 => "reasonable",
        x if x > 0.25 => "weak",
        _ => "no substantial",
    }
}

/// Kaiser-Meyer-Olkin sampling adequacy.
pub fn sampling_adequacy(kmo: f64) -> &'static str {
    match kmo {
        x if x >= 0.9 => "marvelous",
        x if x >= 0.8 => "meritorious",
        x if x >= 0.7 => "middling",
        x if x >= 0.6 => "mediocre",
        x if x >= 0.5 => "miserable",
        _ => "unacceptable",
    }
}
