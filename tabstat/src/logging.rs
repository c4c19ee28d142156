//! Logging utilities and configuration for tabstat.
//!
//! The pipeline logs through `tracing`. Dispatch, extraction and engine calls
//! open spans; noisy per-row and per-call details are gated by [`LogConfig`]
//! so that production deployments pay nothing for them.

use tracing::Level;

/// Logging configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for tabstat components
    pub base_level: Level,
    /// Whether to log every row dropped during filtering extraction
    pub log_extraction_details: bool,
    /// Whether to log engine invocations and their payload sizes
    pub log_engine_calls: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_extraction_details: false,
            log_engine_calls: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_extraction_details: true,
            log_engine_calls: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_extraction_details: false,
            log_engine_calls: false,
            max_field_length: 128,
        }
    }
}

/// Macro for conditional extraction logging.
#[macro_export]
macro_rules! log_extraction {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_extraction_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional engine call logging.
#[macro_export]
macro_rules! log_engine {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_engine_calls {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        value.to_string()
    } else {
        let mut end = max_length;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...(truncated)", &value[..end])
    }
}

/// Utilities for setting up structured logging.
pub mod setup {
    use tracing::Level;

    use super::LogConfig;

    /// Configuration for the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for tabstat components specifically
        pub tabstat_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                tabstat_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    /// Subscriber settings matching a pipeline [`LogConfig`]: tabstat events
    /// are kept down to its `base_level`.
    impl From<&LogConfig> for LoggingConfig {
        fn from(log: &LogConfig) -> Self {
            Self::default().with_tabstat_level(log.base_level)
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                tabstat_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                tabstat_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_tabstat_level(mut self, level: Level) -> Self {
            self.tabstat_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},tabstat={}",
                    self.level.as_str().to_lowercase(),
                    self.tabstat_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// ```rust,no_run
    /// use tabstat::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    ///
    /// To follow the pipeline's own verbosity preset:
    ///
    /// ```rust,no_run
    /// use tabstat::config::PipelineConfig;
    /// use tabstat::logging::setup::{init_logging, LoggingConfig};
    ///
    /// let config = PipelineConfig::default();
    /// init_logging(LoggingConfig::from(&config.log)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let config = LogConfig::default();
        assert_eq!(config.base_level, Level::INFO);
        assert!(!config.log_extraction_details);
        assert!(config.log_engine_calls);

        let verbose = LogConfig::verbose();
        assert!(verbose.log_extraction_details);
        assert_eq!(verbose.max_field_length, 1024);

        let production = LogConfig::production();
        assert_eq!(production.base_level, Level::WARN);
        assert!(!production.log_engine_calls);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text", 10),
            "this is a ...(truncated)"
        );
        assert_eq!(truncate_field("ααα", 3), "α...(truncated)");
    }

    #[test]
    fn test_subscriber_follows_base_level() {
        assert_eq!(
            LoggingConfig::from(&LogConfig::production()).env_filter(),
            "info,tabstat=warn"
        );
        assert_eq!(
            LoggingConfig::from(&LogConfig::verbose()).env_filter(),
            "info,tabstat=debug"
        );
        assert_eq!(LoggingConfig::from(&LogConfig::default()).tabstat_level, Level::INFO);
    }

    #[test]
    fn test_env_filter() {
        assert_eq!(LoggingConfig::default().env_filter(), "info,tabstat=debug");
        assert_eq!(
            LoggingConfig::default()
                .with_env_filter("warn")
                .env_filter(),
            "warn"
        );
    }
}
