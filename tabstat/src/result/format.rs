//! Fixed-precision formatting for metric values.

use crate::config::PipelineConfig;

/// Formats numbers with the decimal places configured for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimals: usize,
    pub p_value_decimals: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimals: 4,
            p_value_decimals: 4,
        }
    }
}

impl From<&PipelineConfig> for NumberFormat {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            decimals: config.decimals,
            p_value_decimals: config.p_value_decimals,
        }
    }
}

impl NumberFormat {
    pub fn number(&self, value: f64) -> String {
        fixed(value, self.decimals)
    }

    pub fn integer(&self, value: usize) -> String {
        value.to_string()
    }

    /// Whole numbers print without decimals (degrees of freedom, counts).
    pub fn df(&self, value: f64) -> String {
        if value.is_finite() && value.fract() == 0.0 {
            format!("{value:.0}")
        } else {
            fixed(value, self.decimals)
        }
    }

    /// P-values below 0.001 print as `< 0.001`.
    pub fn p_value(&self, p: f64) -> String {
        if p.is_finite() && p < 0.001 {
            "< 0.001".to_string()
        } else {
            fixed(p, self.p_value_decimals)
        }
    }

    pub fn percent(&self, fraction: f64) -> String {
        if fraction.is_finite() {
            format!("{:.*}%", self.decimals.min(2), fraction * 100.0)
        } else {
            "n/a".to_string()
        }
    }

    pub fn interval(&self, lower: f64, upper: f64) -> String {
        format!("[{}, {}]", self.number(lower), self.number(upper))
    }
}

fn fixed(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{value:.decimals$}")
    } else {
        "n/a".to_string()
    }
}
