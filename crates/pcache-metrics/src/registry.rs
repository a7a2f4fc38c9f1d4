//! Registry of meters and timers.

use crate::meter::{Meter, MeterSnapshot};
use crate::tags::MetricKey;
use crate::timer::{Timer, TimerSnapshot};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Point-in-time view of every registered series, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Meter values.
    pub meters: BTreeMap<MetricKey, MeterSnapshot>,
    /// Timer values.
    pub timers: BTreeMap<MetricKey, TimerSnapshot>,
}

impl RegistrySnapshot {
    /// Returns the meter snapshot for a key.
    #[must_use]
    pub fn meter(&self, key: &MetricKey) -> Option<&MeterSnapshot> {
        self.meters.get(key)
    }

    /// Returns the timer snapshot for a key.
    #[must_use]
    pub fn timer(&self, key: &MetricKey) -> Option<&TimerSnapshot> {
        self.timers.get(key)
    }
}

/// Thread-safe registry; the same key always yields the same series.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    meters: RwLock<HashMap<MetricKey, Arc<Meter>>>,
    timers: RwLock<HashMap<MetricKey, Arc<Timer>>>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the meter for `key`, registering it on first use.
    pub fn meter(&self, key: &MetricKey) -> Arc<Meter> {
        if let Some(meter) = self.meters.read().get(key) {
            return Arc::clone(meter);
        }

        let mut meters = self.meters.write();
        Arc::clone(meters.entry(key.clone()).or_insert_with(|| {
            debug!(series = %key, "Registered meter");
            Arc::new(Meter::new(key.name()))
        }))
    }

    /// Returns the timer for `key`, registering it on first use.
    pub fn timer(&self, key: &MetricKey) -> Arc<Timer> {
        if let Some(timer) = self.timers.read().get(key) {
            return Arc::clone(timer);
        }

        let mut timers = self.timers.write();
        Arc::clone(timers.entry(key.clone()).or_insert_with(|| {
            debug!(series = %key, "Registered timer");
            Arc::new(Timer::new(key.name()))
        }))
    }

    /// Returns the number of registered series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.meters.read().len() + self.timers.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Captures every series.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let meters = self
            .meters
            .read()
            .iter()
            .map(|(key, meter)| (key.clone(), meter.snapshot()))
            .collect();
        let timers = self
            .timers
            .read()
            .iter()
            .map(|(key, timer)| (key.clone(), timer.snapshot()))
            .collect();

        RegistrySnapshot { meters, timers }
    }
}
