//! Latency timer backed by a bounded sample window.

use crate::meter::Meter;
use crate::names;
use metrics::histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of recent samples kept for percentiles.
pub const WINDOW_SIZE: usize = 1024;

/// Circular buffer of the most recent samples, in nanoseconds.
#[derive(Debug)]
struct SampleWindow {
    buf: Vec<u64>,
    pos: usize,
}

impl SampleWindow {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(WINDOW_SIZE),
            pos: 0,
        }
    }

    fn record(&mut self, value: u64) {
        if self.buf.len() < WINDOW_SIZE {
            self.buf.push(value);
        } else {
            self.buf[self.pos] = value;
        }
        self.pos = (self.pos + 1) % WINDOW_SIZE;
    }

    fn sorted(&self) -> Vec<u64> {
        let mut sorted = self.buf.clone();
        sorted.sort_unstable();
        sorted
    }
}

fn percentile(sorted: &[u64], pct: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = (sorted.len() * pct).div_ceil(100).saturating_sub(1);
    sorted[idx.min(sorted.len() - 1)]
}

fn nanos_to_ms(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

/// Point-in-time view of a [`Timer`]. Durations are in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerSnapshot {
    /// Number of recorded samples.
    pub count: u64,
    /// Smallest sample in the window.
    pub min_ms: f64,
    /// Largest sample ever recorded.
    pub max_ms: f64,
    /// Mean over all recorded samples.
    pub mean_ms: f64,
    /// Median of the window.
    pub p50_ms: f64,
    /// 75th percentile of the window.
    pub p75_ms: f64,
    /// 95th percentile of the window.
    pub p95_ms: f64,
    /// 99th percentile of the window.
    pub p99_ms: f64,
    /// Samples per second since creation.
    pub mean_rate: f64,
    /// One-minute moving average of samples per second.
    pub one_minute_rate: f64,
}

/// Records operation durations.
#[derive(Debug)]
pub struct Timer {
    name: String,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
    window: Mutex<SampleWindow>,
    rate: Meter,
}

impl Timer {
    /// Creates a timer for the named series.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            rate: Meter::unforwarded(name.clone()),
            name,
            total_nanos: AtomicU64::new(0),
            max_nanos: AtomicU64::new(0),
            window: Mutex::new(SampleWindow::new()),
        }
    }

    /// Returns the series name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts timing; the returned guard records the elapsed time once.
    #[must_use]
    pub fn time(self: &Arc<Self>) -> TimerContext {
        TimerContext {
            timer: Arc::clone(self),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Records one duration.
    pub fn update(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.window.lock().record(nanos);
        self.rate.mark();

        histogram!(names::TIMER_DURATION_SECONDS, "series" => self.name.clone())
            .record(duration.as_secs_f64());
    }

    /// Returns the number of recorded samples.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.rate.count()
    }

    /// Returns a snapshot of the current values.
    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        let sorted = self.window.lock().sorted();
        let rates = self.rate.snapshot();
        let count = rates.count;
        let mean_ms = if count == 0 {
            0.0
        } else {
            nanos_to_ms(self.total_nanos.load(Ordering::Relaxed)) / count as f64
        };

        TimerSnapshot {
            count,
            min_ms: nanos_to_ms(sorted.first().copied().unwrap_or(0)),
            max_ms: nanos_to_ms(self.max_nanos.load(Ordering::Relaxed)),
            mean_ms,
            p50_ms: nanos_to_ms(percentile(&sorted, 50)),
            p75_ms: nanos_to_ms(percentile(&sorted, 75)),
            p95_ms: nanos_to_ms(percentile(&sorted, 95)),
            p99_ms: nanos_to_ms(percentile(&sorted, 99)),
            mean_rate: rates.mean_rate,
            one_minute_rate: rates.one_minute_rate,
        }
    }
}

/// Running measurement started by [`Timer::time`].
///
/// Records on [`stop`](Self::stop) or, failing that, when dropped.
#[derive(Debug)]
#[must_use = "dropping the context immediately records a near-zero duration"]
pub struct TimerContext {
    timer: Arc<Timer>,
    start: Instant,
    stopped: bool,
}

impl TimerContext {
    /// Stops the measurement and returns the elapsed time.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    /// Returns the time elapsed so far without stopping.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.timer.update(elapsed);
        }
        elapsed
    }
}

impl Drop for TimerContext {
    fn drop(&mut self) {
        self.record();
    }
}
