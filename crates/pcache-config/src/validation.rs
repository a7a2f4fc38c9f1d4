//! Configuration validation module.
//!
//! Collects every problem in one pass so a misconfigured deployment fails
//! at startup with the full list instead of one error per restart.

use crate::AppConfig;
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// A host name is empty.
    EmptyHost { name: String },
    /// A master group is named but no sentinel nodes are listed.
    MissingSentinelNodes { master: String },
    /// A sentinel node has an invalid port.
    InvalidSentinelNode { node: String },
    /// Timeout or interval value must be positive.
    NonPositiveDuration { name: String },
    /// Series prefix is empty while export is enabled.
    EmptyMetricsPrefix,
    /// Database index is negative.
    InvalidDatabase { value: i64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::EmptyHost { name } => write!(f, "Host '{}' cannot be empty", name),
            Self::MissingSentinelNodes { master } => {
                write!(
                    f,
                    "Sentinel master '{}' is configured but no sentinel nodes are listed",
                    master
                )
            }
            Self::InvalidSentinelNode { node } => {
                write!(f, "Invalid sentinel node: {}", node)
            }
            Self::NonPositiveDuration { name } => {
                write!(f, "'{}' must be positive", name)
            }
            Self::EmptyMetricsPrefix => {
                write!(f, "Metrics prefix cannot be empty when export is enabled")
            }
            Self::InvalidDatabase { value } => {
                write!(f, "Invalid database index: {} (must be >= 0)", value)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::default();

        Self::validate_redis(&config.redis, &mut result);
        Self::validate_metrics(&config.metrics, &mut result);
        Self::validate_logging(&config.logging, &mut result);

        result.into_result()
    }

    fn validate_redis(config: &crate::RedisConfig, result: &mut ValidationResult) {
        if config.connect_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "redis.connect_timeout_secs".to_string(),
            });
        }
        if config.database < 0 {
            result.add_error(ConfigValidationError::InvalidDatabase {
                value: config.database,
            });
        }

        // The standalone node only matters when no master group is named.
        match config.sentinel.master_name() {
            Some(master) => {
                if config.sentinel.nodes.is_empty() {
                    result.add_error(ConfigValidationError::MissingSentinelNodes {
                        master: master.to_string(),
                    });
                }
                for node in &config.sentinel.nodes {
                    if node.port == 0 {
                        result.add_error(ConfigValidationError::InvalidSentinelNode {
                            node: node.to_string(),
                        });
                    }
                }
            }
            None => {
                if config.host.trim().is_empty() {
                    result.add_error(ConfigValidationError::EmptyHost {
                        name: "redis.host".to_string(),
                    });
                }
                if config.port == 0 {
                    result.add_error(ConfigValidationError::InvalidPort {
                        name: "redis.port".to_string(),
                        value: config.port,
                    });
                }
            }
        }
    }

    fn validate_metrics(config: &crate::MetricsConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        if config.host.trim().is_empty() {
            result.add_error(ConfigValidationError::EmptyHost {
                name: "metrics.host".to_string(),
            });
        }
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "metrics.port".to_string(),
                value: config.port,
            });
        }
        if config.prefix.trim().is_empty() {
            result.add_error(ConfigValidationError::EmptyMetricsPrefix);
        }
        if config.interval_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDuration {
                name: "metrics.interval_secs".to_string(),
            });
        }
    }

    fn validate_logging(config: &pcache_core::LoggingConfig, result: &mut ValidationResult) {
        if !Self::VALID_LOG_LEVELS.contains(&config.level.to_lowercase().as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.level.clone(),
            });
        }
    }
}
