//! Server startup utilities.

use pcache_config::AppConfig;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
                          __
    ____  _________ _____/ /_  ___
   / __ \/ ___/ __ `/ ___/ __ \/ _ \
  / /_/ / /__/ /_/ / /__/ / / /  __/
 / .___/\___/\__,_/\___/_/ /_/\___/
/_/
    "#);
}

/// Logs the store topology and metrics destination.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Environment: {}", config.app.environment);
    info!("Store:       {}", config.redis.topology());
    if config.metrics.enabled {
        info!(
            "Metrics:     {} every {}s (prefix {})",
            config.metrics.collector_addr(),
            config.metrics.interval_secs,
            config.metrics.prefix
        );
    } else {
        info!("Metrics:     disabled");
    }
    info!("{}", separator);
}
