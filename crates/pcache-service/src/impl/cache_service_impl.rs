//! Cache service implementations.

use crate::cache_service::CacheService;
use async_trait::async_trait;
use pcache_core::{CacheEntry, CacheError, CacheResult};
use pcache_metrics::{MeasurementTag, MetricsRecorder, ServiceType, TimerContext};
use pcache_repository::CacheRepository;
use shaku::Component;
use std::sync::Arc;
use tracing::{debug, warn};

/// Generic cache service implementation (non-DI).
pub struct CacheServiceImpl<R: CacheRepository + ?Sized> {
    repository: Arc<R>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<R: CacheRepository + ?Sized> CacheServiceImpl<R> {
    /// Creates a new cache service.
    pub fn new(repository: Arc<R>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { repository, metrics }
    }
}

#[async_trait]
impl<R: CacheRepository + ?Sized + 'static> CacheService for CacheServiceImpl<R> {
    async fn fetch(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        fetch(self.repository.as_ref(), self.metrics.as_ref(), key).await
    }

    async fn save(&self, entry: CacheEntry) -> CacheResult<CacheEntry> {
        save(self.repository.as_ref(), self.metrics.as_ref(), entry).await
    }

    async fn health_check(&self) -> CacheResult<()> {
        health_check(self.repository.as_ref(), self.metrics.as_ref()).await
    }
}

/// DI-enabled cache service implementation.
#[derive(Component)]
#[shaku(interface = CacheService)]
pub struct CacheServiceComponent {
    #[shaku(inject)]
    repository: Arc<dyn CacheRepository>,
    #[shaku(inject)]
    metrics: Arc<dyn MetricsRecorder>,
}

#[async_trait]
impl CacheService for CacheServiceComponent {
    async fn fetch(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        fetch(self.repository.as_ref(), self.metrics.as_ref(), key).await
    }

    async fn save(&self, entry: CacheEntry) -> CacheResult<CacheEntry> {
        save(self.repository.as_ref(), self.metrics.as_ref(), entry).await
    }

    async fn health_check(&self) -> CacheResult<()> {
        health_check(self.repository.as_ref(), self.metrics.as_ref()).await
    }
}

impl std::fmt::Debug for CacheServiceComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheServiceComponent")
            .field("backend", &self.repository.backend_name())
            .finish_non_exhaustive()
    }
}

async fn fetch<R: CacheRepository + ?Sized>(
    repository: &R,
    metrics: &dyn MetricsRecorder,
    key: &str,
) -> CacheResult<Option<CacheEntry>> {
    let service = ServiceType::Fetch;
    let timer = begin(metrics, service);

    if key.trim().is_empty() {
        return Err(reject_missing_id(metrics, service));
    }

    let result = repository.find_by_id(key).await;
    finish(metrics, service, timer, &result);

    if let Ok(found) = &result {
        debug!(key = %key, hit = found.is_some(), "Fetched entry");
    }
    result
}

async fn save<R: CacheRepository + ?Sized>(
    repository: &R,
    metrics: &dyn MetricsRecorder,
    entry: CacheEntry,
) -> CacheResult<CacheEntry> {
    let service = ServiceType::Save;
    let timer = begin(metrics, service);

    if entry.id.is_none() {
        return Err(reject_missing_id(metrics, service));
    }

    let result = repository.save(entry).await;
    finish(metrics, service, timer, &result);
    result
}

async fn health_check<R: CacheRepository + ?Sized>(
    repository: &R,
    metrics: &dyn MetricsRecorder,
) -> CacheResult<()> {
    let service = ServiceType::HealthCheck;
    let timer = metrics.start_request_timer(service);

    let result = repository.health_check().await;
    finish(metrics, service, timer, &result);
    result
}

fn begin(metrics: &dyn MetricsRecorder, service: ServiceType) -> Option<TimerContext> {
    metrics.mark(service.component(), MeasurementTag::RequestRate);
    metrics.start_request_timer(service)
}

fn finish<T>(
    metrics: &dyn MetricsRecorder,
    service: ServiceType,
    timer: Option<TimerContext>,
    result: &CacheResult<T>,
) {
    let elapsed = timer.map(TimerContext::stop);

    if let Err(error) = result {
        record_failure(metrics, service, error);
        warn!(
            component = service.component(),
            code = error.error_code(),
            elapsed_ms = elapsed.map(|d| d.as_millis() as u64),
            error = %error,
            "Request failed"
        );
    }
}

fn record_failure(metrics: &dyn MetricsRecorder, service: ServiceType, error: &CacheError) {
    let component = service.component();
    metrics.mark(component, MeasurementTag::ErrorRate);

    match error {
        CacheError::InvalidEntry(_) => {
            metrics.mark(component, MeasurementTag::ErrBadRequest);
            metrics.invalid_request_meter().mark();
        }
        CacheError::Transport(_) | CacheError::Store(_) | CacheError::Deserialization(_) => {
            metrics.mark(component, MeasurementTag::ErrDb);
        }
        _ => {}
    }
}

fn reject_missing_id(metrics: &dyn MetricsRecorder, service: ServiceType) -> CacheError {
    let component = service.component();
    metrics.mark(component, MeasurementTag::ErrorRate);
    metrics.mark(component, MeasurementTag::ErrMissingId);
    metrics.invalid_request_meter().mark();
    CacheError::invalid_entry("request has no id")
}
