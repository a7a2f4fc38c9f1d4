//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use pcache_core::{CacheError, CacheResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Prefix of every environment variable read by the loader.
pub const ENV_PREFIX: &str = "PCACHE";

/// Variable selecting the environment-specific file.
pub const ENVIRONMENT_VAR: &str = "PCACHE_ENVIRONMENT";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `PCACHE` prefix (`PCACHE__REDIS__HOST`)
    ///
    /// Missing files are skipped. The result is validated before it is returned.
    pub fn new(config_dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> CacheResult<Self> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous configuration is kept if the new one fails to load.
    pub async fn reload(&self) -> CacheResult<()> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &Path) -> CacheResult<AppConfig> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());

        info!(environment = %environment, dir = %config_dir.display(), "Loading configuration");

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = config_dir.join(format!("{name}.toml"));
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("redis.sentinel.nodes"),
        );

        let config = builder.build().map_err(config_error_to_cache_error)?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_cache_error)?;
        app_config.app.environment = environment;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    fn validate_config(config: &AppConfig) -> CacheResult<()> {
        if let Err(errors) = ConfigValidator::validate(config) {
            for error in &errors {
                warn!(error = %error, "Invalid configuration");
            }
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CacheError::Configuration(message));
        }

        if config.app.environment == "production" && config.redis.password.is_none() {
            warn!("No store password configured in production");
        }

        Ok(())
    }

    /// Gets a specific configuration value by key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }
}

fn config_error_to_cache_error(err: ConfigError) -> CacheError {
    CacheError::Configuration(err.to_string())
}
