//! Dependency injection module using Shaku.
//!
//! `CacheModule` holds the store repository for the configured topology, the
//! metrics recorder over a shared registry, and the cache service wired to
//! both.

use pcache_config::RedisConfig;
use pcache_metrics::{MetricRegistry, MetricsRecorder, RegistryMetricsRecorder, RegistryMetricsRecorderParameters};
use pcache_repository::{CacheRepository, RedisCacheRepository};
use pcache_service::{CacheService, CacheServiceComponent};
use shaku::{module, HasComponent};
use std::sync::Arc;

module! {
    pub CacheModule {
        components = [
            RedisCacheRepository,
            RegistryMetricsRecorder,
            CacheServiceComponent,
        ],
        providers = [],
    }
}

/// Builds the cache module.
///
/// The registry is shared with the caller so the reporter exports the same
/// series the service records into. Nothing connects to the store here.
pub fn build_cache_module(redis_config: &RedisConfig, registry: Arc<MetricRegistry>) -> Arc<CacheModule> {
    let module = CacheModule::builder()
        .with_component_parameters::<RedisCacheRepository>(redis_config.clone())
        .with_component_parameters::<RegistryMetricsRecorder>(RegistryMetricsRecorderParameters {
            registry,
        })
        .build();

    Arc::new(module)
}

/// Resolves the components an application needs from a module.
pub trait CacheResolver {
    /// Returns the cache service.
    fn cache_service(&self) -> Arc<dyn CacheService>;

    /// Returns the store repository.
    fn repository(&self) -> Arc<dyn CacheRepository>;

    /// Returns the metrics recorder.
    fn metrics_recorder(&self) -> Arc<dyn MetricsRecorder>;
}

impl CacheResolver for CacheModule {
    fn cache_service(&self) -> Arc<dyn CacheService> {
        self.resolve()
    }

    fn repository(&self) -> Arc<dyn CacheRepository> {
        self.resolve()
    }

    fn metrics_recorder(&self) -> Arc<dyn MetricsRecorder> {
        self.resolve()
    }
}
