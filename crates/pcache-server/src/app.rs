//! Application lifecycle.

use crate::di::{build_cache_module, CacheModule, CacheResolver};
use pcache_config::AppConfig;
use pcache_core::CacheResult;
use pcache_metrics::{describe_metrics, GraphiteReporter, MetricRegistry};
use pcache_service::CacheService;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// A wired cache service with its optional metrics reporter.
pub struct App {
    config: AppConfig,
    registry: Arc<MetricRegistry>,
    module: Arc<CacheModule>,
    reporter: Option<GraphiteReporter>,
}

impl App {
    /// Wires the application from configuration. No I/O happens here.
    pub fn new(config: AppConfig) -> Self {
        let registry = Arc::new(MetricRegistry::new());
        let module = build_cache_module(&config.redis, Arc::clone(&registry));
        let reporter = config
            .metrics
            .enabled
            .then(|| GraphiteReporter::new(Arc::clone(&registry), &config.metrics));

        Self {
            config,
            registry,
            module,
            reporter,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the cache service.
    pub fn cache_service(&self) -> Arc<dyn CacheService> {
        self.module.cache_service()
    }

    /// Returns the metric registry shared by the service and the reporter.
    pub fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns true if the metrics reporter is exporting.
    pub fn is_reporting(&self) -> bool {
        self.reporter.as_ref().is_some_and(GraphiteReporter::is_running)
    }

    /// Starts the reporter (when enabled) and checks the store.
    ///
    /// An unreachable store is logged, not fatal: connections are opened
    /// lazily and re-established on the next request.
    ///
    /// # Errors
    ///
    /// Returns an error if the reporter is already running.
    pub async fn start(&self) -> CacheResult<()> {
        describe_metrics();

        match &self.reporter {
            Some(reporter) => reporter.start()?,
            None => info!("Metrics reporting disabled"),
        }

        let repository = self.module.repository();
        match self.cache_service().health_check().await {
            Ok(()) => info!(backend = repository.backend_name(), "Store is reachable"),
            Err(e) => warn!(
                backend = repository.backend_name(),
                error = %e,
                "Store is not reachable yet"
            ),
        }

        Ok(())
    }

    /// Stops the reporter, flushing one last snapshot first.
    pub async fn stop(&self) {
        if let Some(reporter) = &self.reporter {
            if let Err(e) = reporter.report().await {
                warn!(error = %e, "Final metrics report failed");
            }
            reporter.stop().await;
        }
        info!("Application stopped");
    }

    /// Starts the application, waits for `shutdown`, then stops it.
    ///
    /// # Errors
    ///
    /// Returns an error if startup fails.
    pub async fn run_until<F>(self, shutdown: F) -> CacheResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.stop().await;
        Ok(())
    }
}
