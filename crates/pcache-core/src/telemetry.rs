//! Logging initialization.
//!
//! Sets up the global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the configured level so operators can raise verbosity without a redeploy.

#[cfg(feature = "telemetry")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::CacheResult;
use serde::{Deserialize, Serialize};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error).
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to include the event target in each line.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            with_target: default_with_target(),
        }
    }
}

impl LoggingConfig {
    /// Returns the filter directive used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directive(&self) -> String {
        format!("{},pcache=debug", self.level)
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`crate::CacheError::Internal`] if a global subscriber is already set.
#[cfg(feature = "telemetry")]
pub fn init_logging(config: &LoggingConfig) -> CacheResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directive()));

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    result.map_err(|e| crate::CacheError::Internal(format!("Failed to initialize logging: {e}")))?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}

/// Placeholder for when the telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_logging(_config: &LoggingConfig) -> CacheResult<()> {
    Ok(())
}
