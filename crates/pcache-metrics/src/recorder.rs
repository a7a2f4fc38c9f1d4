//! Metrics recorder used by request dispatch.

use crate::meter::Meter;
use crate::registry::{MetricRegistry, RegistrySnapshot};
use crate::tags::{components, MeasurementTag, MetricKey, ServiceType};
use crate::timer::{Timer, TimerContext};
use pcache_core::Interface;
use shaku::{Component, Module, ModuleBuildContext};
use std::sync::Arc;

/// Records request timings and named events.
///
/// Recording never fails and never changes the outcome of the request being
/// measured.
pub trait MetricsRecorder: Interface + Send + Sync {
    /// Starts the request-duration timer for an operation.
    ///
    /// Only fetch and save carry a duration timer; other operations return `None`.
    fn start_request_timer(&self, service: ServiceType) -> Option<TimerContext>;

    /// Marks one event for `(component, tag)`, registering the series on first use.
    fn mark(&self, component: &str, tag: MeasurementTag);

    /// Returns the pre-registered invalid-request meter.
    fn invalid_request_meter(&self) -> Arc<Meter>;

    /// Returns the backing registry.
    fn registry(&self) -> Arc<MetricRegistry>;

    /// Captures every series.
    fn snapshot(&self) -> RegistrySnapshot {
        self.registry().snapshot()
    }
}

/// [`MetricsRecorder`] over an injected [`MetricRegistry`].
pub struct RegistryMetricsRecorder {
    registry: Arc<MetricRegistry>,
    fetch_duration: Arc<Timer>,
    save_duration: Arc<Timer>,
    invalid_requests: Arc<Meter>,
}

impl RegistryMetricsRecorder {
    /// Creates a recorder and pre-registers the request timers and the
    /// invalid-request meter.
    #[must_use]
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        let fetch_duration = registry.timer(&MetricKey::new(
            components::FETCH_HANDLER,
            MeasurementTag::RequestDuration,
        ));
        let save_duration = registry.timer(&MetricKey::new(
            components::SAVE_HANDLER,
            MeasurementTag::RequestDuration,
        ));
        let invalid_requests = registry.meter(&MetricKey::new(
            components::API_ROUTER,
            MeasurementTag::InvalidRequestRate,
        ));

        Self {
            registry,
            fetch_duration,
            save_duration,
            invalid_requests,
        }
    }

    fn request_timer(&self, service: ServiceType) -> Option<&Arc<Timer>> {
        match service {
            ServiceType::Fetch => Some(&self.fetch_duration),
            ServiceType::Save => Some(&self.save_duration),
            ServiceType::HealthCheck => None,
        }
    }
}

impl Default for RegistryMetricsRecorder {
    fn default() -> Self {
        Self::new(Arc::new(MetricRegistry::new()))
    }
}

impl MetricsRecorder for RegistryMetricsRecorder {
    fn start_request_timer(&self, service: ServiceType) -> Option<TimerContext> {
        self.request_timer(service).map(Timer::time)
    }

    fn mark(&self, component: &str, tag: MeasurementTag) {
        self.registry
            .meter(&MetricKey::new(component.to_string(), tag))
            .mark();
    }

    fn invalid_request_meter(&self) -> Arc<Meter> {
        Arc::clone(&self.invalid_requests)
    }

    fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.registry)
    }
}

/// DI parameters for [`RegistryMetricsRecorder`].
#[derive(Default)]
pub struct RegistryMetricsRecorderParameters {
    /// Registry shared with the reporter.
    pub registry: Arc<MetricRegistry>,
}

impl<M: Module> Component<M> for RegistryMetricsRecorder {
    type Interface = dyn MetricsRecorder;
    type Parameters = RegistryMetricsRecorderParameters;

    fn build(_: &mut ModuleBuildContext<M>, params: Self::Parameters) -> Box<Self::Interface> {
        Box::new(Self::new(params.registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_are_pre_registered() {
        let recorder = RegistryMetricsRecorder::default();
        let snapshot = recorder.snapshot();

        assert_eq!(snapshot.timers.len(), 2);
        assert_eq!(snapshot.meters.len(), 1);
        assert!(snapshot
            .timer(&MetricKey::new("fetch_handler", MeasurementTag::RequestDuration))
            .is_some());
        assert!(snapshot
            .meter(&MetricKey::new("api_router", MeasurementTag::InvalidRequestRate))
            .is_some());
    }

    #[test]
    fn test_timers_only_for_fetch_and_save() {
        let recorder = RegistryMetricsRecorder::default();

        recorder
            .start_request_timer(ServiceType::Fetch)
            .map(TimerContext::stop);
        recorder
            .start_request_timer(ServiceType::Save)
            .map(TimerContext::stop);
        assert!(recorder
            .start_request_timer(ServiceType::HealthCheck)
            .is_none());

        let snapshot = recorder.snapshot();
        let fetch = MetricKey::new("fetch_handler", MeasurementTag::RequestDuration);
        let save = MetricKey::new("save_handler", MeasurementTag::RequestDuration);
        assert_eq!(snapshot.timer(&fetch).map(|t| t.count), Some(1));
        assert_eq!(snapshot.timer(&save).map(|t| t.count), Some(1));
    }

    #[test]
    fn test_mark_registers_lazily() {
        let recorder = RegistryMetricsRecorder::default();
        recorder.mark("save_handler", MeasurementTag::ErrMissingId);
        recorder.mark("save_handler", MeasurementTag::ErrMissingId);

        let key = MetricKey::new("save_handler", MeasurementTag::ErrMissingId);
        assert_eq!(recorder.registry().meter(&key).count(), 2);
    }

    #[test]
    fn test_invalid_request_meter_is_shared() {
        let recorder = RegistryMetricsRecorder::default();
        recorder.invalid_request_meter().mark();
        recorder.mark("api_router", MeasurementTag::InvalidRequestRate);

        assert_eq!(recorder.invalid_request_meter().count(), 2);
    }

    #[test]
    fn test_injected_registry_is_used() {
        let registry = Arc::new(MetricRegistry::new());
        let recorder = RegistryMetricsRecorder::new(Arc::clone(&registry));
        recorder.mark("fetch_handler", MeasurementTag::ErrTimedOut);

        assert!(Arc::ptr_eq(&recorder.registry(), &registry));
        assert_eq!(registry.len(), 4);
    }
}
