//! # pcache Server
//!
//! Loads configuration, wires the cache service, and runs until SIGINT or
//! SIGTERM.

use anyhow::Context;
use pcache_config::ConfigLoader;
use pcache_core::init_logging;
use pcache_server::app::App;
use pcache_server::startup::{print_banner, print_startup_info};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loader = ConfigLoader::from_default_location().context("Failed to load configuration")?;
    let config = loader.get().await;

    init_logging(&config.logging).context("Failed to initialize logging")?;

    print_banner();
    info!("Starting pcache server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    print_startup_info(&config);

    App::new(config)
        .run_until(shutdown_signal())
        .await
        .context("Application error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
