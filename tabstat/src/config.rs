//! Pipeline-wide configuration.

use crate::logging::LogConfig;

/// Configuration shared by the router and every handler.
///
/// # Examples
///
/// ```rust
/// use tabstat::config::PipelineConfig;
///
/// let config = PipelineConfig::default().with_alpha(0.01).with_decimals(3);
/// assert_eq!(config.alpha, 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Significance level used when a call does not set one
    pub alpha: f64,
    /// Decimal places for formatted metric values
    pub decimals: usize,
    /// Decimal places for formatted p-values
    pub p_value_decimals: usize,
    /// Share of the completeness score carried by required fields (0-100)
    pub required_weight: f64,
    pub log: LogConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            decimals: 4,
            p_value_decimals: 4,
            required_weight: 70.0,
            log: LogConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(f64::EPSILON, 0.5);
        self
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_p_value_decimals(mut self, decimals: usize) -> Self {
        self.p_value_decimals = decimals;
        self
    }

    pub fn with_required_weight(mut self, weight: f64) -> Self {
        self.required_weight = weight.clamp(0.0, 100.0);
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.decimals, 4);
        assert_eq!(config.required_weight, 70.0);
    }

    #[test]
    fn test_setters_clamp() {
        let config = PipelineConfig::default()
            .with_alpha(2.0)
            .with_required_weight(150.0);
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.required_weight, 100.0);
    }
}
