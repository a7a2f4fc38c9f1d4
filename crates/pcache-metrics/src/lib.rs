//! # pcache Metrics
//!
//! In-process metric sink for the cache service: meters and timers keyed by
//! owner component and measurement kind, a [`MetricsRecorder`] used by
//! request dispatch, and an optional [`GraphiteReporter`] that pushes
//! snapshots to a remote collector.
//!
//! Every sample is also forwarded to the `metrics` facade, so an installed
//! global recorder sees the same events.

pub mod meter;
pub mod recorder;
pub mod registry;
pub mod reporter;
pub mod tags;
pub mod timer;

pub use meter::{Meter, MeterSnapshot};
pub use recorder::{MetricsRecorder, RegistryMetricsRecorder, RegistryMetricsRecorderParameters};
pub use registry::{MetricRegistry, RegistrySnapshot};
pub use reporter::{format_snapshot, GraphiteReporter};
pub use tags::{components, MeasurementTag, MetricKey, ServiceType};
pub use timer::{Timer, TimerContext, TimerSnapshot};

/// Metric names used on the `metrics` facade.
pub mod names {
    /// Meter events, labelled by `series`.
    pub const METER_EVENTS_TOTAL: &str = "pcache_meter_events_total";
    /// Timer samples in seconds, labelled by `series`.
    pub const TIMER_DURATION_SECONDS: &str = "pcache_timer_duration_seconds";
}

/// Registers descriptions for the facade metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        names::METER_EVENTS_TOTAL,
        "Events marked on a pcache meter"
    );
    metrics::describe_histogram!(
        names::TIMER_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Durations recorded on a pcache timer"
    );
}
