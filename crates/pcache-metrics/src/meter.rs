//! Event meter with mean and one-minute rates.

use crate::names;
use metrics::counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Interval at which the moving average is advanced.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

const TICK_NANOS: u64 = TICK_INTERVAL.as_nanos() as u64;

const ONE_MINUTE_SECS: f64 = 60.0;

/// Exponentially-weighted moving average of an event rate.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn one_minute() -> Self {
        Self {
            alpha: 1.0 - (-TICK_INTERVAL.as_secs_f64() / ONE_MINUTE_SECS).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    fn tick(&mut self, events: u64) {
        let instant_rate = events as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

/// Point-in-time view of a [`Meter`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    /// Total events.
    pub count: u64,
    /// Events per second since creation.
    pub mean_rate: f64,
    /// One-minute exponentially-weighted rate, events per second.
    pub one_minute_rate: f64,
}

/// Monotonic event counter.
///
/// Marking is lock-free until a tick is due; only the thread that advances
/// the moving average takes the lock.
#[derive(Debug)]
pub struct Meter {
    name: String,
    forward: bool,
    count: AtomicU64,
    uncounted: AtomicU64,
    created: Instant,
    /// Nanoseconds from `created` to the last tick boundary.
    last_tick: AtomicU64,
    ewma: Mutex<Ewma>,
}

impl Meter {
    /// Creates a meter for the named series.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), true)
    }

    /// Creates a meter that is not forwarded to the `metrics` facade.
    pub(crate) fn unforwarded(name: impl Into<String>) -> Self {
        Self::build(name.into(), false)
    }

    fn build(name: String, forward: bool) -> Self {
        Self {
            name,
            forward,
            count: AtomicU64::new(0),
            uncounted: AtomicU64::new(0),
            created: Instant::now(),
            last_tick: AtomicU64::new(0),
            ewma: Mutex::new(Ewma::one_minute()),
        }
    }

    /// Returns the series name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records one event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Records `n` events.
    pub fn mark_n(&self, n: u64) {
        self.tick_if_necessary(Instant::now());
        self.count.fetch_add(n, Ordering::Relaxed);
        self.uncounted.fetch_add(n, Ordering::Relaxed);
        if self.forward {
            counter!(names::METER_EVENTS_TOTAL, "series" => self.name.clone()).increment(n);
        }
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Returns the mean rate in events per second since creation.
    #[must_use]
    pub fn mean_rate(&self) -> f64 {
        self.mean_rate_at(Instant::now())
    }

    fn mean_rate_at(&self, now: Instant) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.created).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        count as f64 / elapsed
    }

    /// Returns the one-minute moving average rate in events per second.
    #[must_use]
    pub fn one_minute_rate(&self) -> f64 {
        self.one_minute_rate_at(Instant::now())
    }

    fn one_minute_rate_at(&self, now: Instant) -> f64 {
        self.tick_if_necessary(now);
        self.ewma.lock().rate
    }

    /// Returns a snapshot of the current values.
    #[must_use]
    pub fn snapshot(&self) -> MeterSnapshot {
        let now = Instant::now();
        MeterSnapshot {
            count: self.count(),
            mean_rate: self.mean_rate_at(now),
            one_minute_rate: self.one_minute_rate_at(now),
        }
    }

    /// Advances the moving average by every whole tick elapsed since the last one.
    pub(crate) fn tick_if_necessary(&self, now: Instant) {
        let now = u64::try_from(now.saturating_duration_since(self.created).as_nanos()).unwrap_or(u64::MAX);
        if now.saturating_sub(self.last_tick.load(Ordering::Acquire)) < TICK_NANOS {
            return;
        }

        let mut ewma = self.ewma.lock();
        // Another thread may have ticked while we waited for the lock.
        let last_tick = self.last_tick.load(Ordering::Acquire);
        let elapsed = now.saturating_sub(last_tick);
        if elapsed < TICK_NANOS {
            return;
        }

        let ticks = elapsed / TICK_NANOS;
        self.last_tick.store(last_tick + ticks * TICK_NANOS, Ordering::Release);

        // Events since the last tick belong to the first elapsed interval.
        let events = self.uncounted.swap(0, Ordering::Relaxed);
        ewma.tick(events);
        for _ in 1..ticks {
            ewma.tick(0);
        }
    }
}
