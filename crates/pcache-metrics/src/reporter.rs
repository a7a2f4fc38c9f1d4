//! Periodic export to a Graphite plaintext collector.

use crate::registry::{MetricRegistry, RegistrySnapshot};
use chrono::Utc;
use parking_lot::Mutex;
use pcache_config::MetricsConfig;
use pcache_core::{CacheError, CacheResult};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Upper bound on connecting to and writing to the collector.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Renders a snapshot as Graphite plaintext lines.
///
/// Rates are per second, durations in milliseconds.
#[must_use]
pub fn format_snapshot(snapshot: &RegistrySnapshot, prefix: &str, timestamp: i64) -> String {
    let mut out = String::new();
    let mut line = |series: &str, field: &str, value: String| {
        let _ = writeln!(out, "{prefix}.{series}.{field} {value} {timestamp}");
    };

    for (key, meter) in &snapshot.meters {
        let series = key.name();
        line(&series, "count", meter.count.to_string());
        line(&series, "m1_rate", format!("{:.2}", meter.one_minute_rate));
        line(&series, "mean_rate", format!("{:.2}", meter.mean_rate));
    }

    for (key, timer) in &snapshot.timers {
        let series = key.name();
        line(&series, "count", timer.count.to_string());
        line(&series, "min", format!("{:.2}", timer.min_ms));
        line(&series, "max", format!("{:.2}", timer.max_ms));
        line(&series, "mean", format!("{:.2}", timer.mean_ms));
        line(&series, "p50", format!("{:.2}", timer.p50_ms));
        line(&series, "p75", format!("{:.2}", timer.p75_ms));
        line(&series, "p95", format!("{:.2}", timer.p95_ms));
        line(&series, "p99", format!("{:.2}", timer.p99_ms));
        line(&series, "m1_rate", format!("{:.2}", timer.one_minute_rate));
        line(&series, "mean_rate", format!("{:.2}", timer.mean_rate));
    }

    out
}

/// Pushes registry snapshots to a collector on a fixed interval.
pub struct GraphiteReporter {
    registry: Arc<MetricRegistry>,
    addr: String,
    prefix: String,
    interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl GraphiteReporter {
    /// Creates a reporter for the configured collector.
    #[must_use]
    pub fn new(registry: Arc<MetricRegistry>, config: &MetricsConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registry,
            addr: config.collector_addr(),
            prefix: config.prefix.clone(),
            interval: config.interval(),
            shutdown_tx,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Returns true while the export task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sends one snapshot now.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Transport`] if the collector cannot be reached.
    pub async fn report(&self) -> CacheResult<()> {
        send(&self.registry, &self.addr, &self.prefix).await
    }

    /// Spawns the export task. The first export happens immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Internal`] if the reporter is already running.
    pub fn start(&self) -> CacheResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CacheError::internal("Metrics reporter already running"));
        }

        info!(
            collector = %self.addr,
            prefix = %self.prefix,
            interval_secs = self.interval.as_secs(),
            "Starting metrics reporter"
        );

        let registry = Arc::clone(&self.registry);
        let addr = self.addr.clone();
        let prefix = self.prefix.clone();
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Metrics reporter received shutdown signal");
                        break;
                    }

                    _ = ticker.tick() => {
                        if let Err(e) = send(&registry, &addr, &prefix).await {
                            warn!(collector = %addr, error = %e, "Failed to report metrics");
                        }
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
        });

        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Signals the export task and waits for it to finish.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Metrics reporter task ended abnormally");
            }
        }
        self.running.store(false, Ordering::SeqCst);
        info!("Metrics reporter stopped");
    }
}

async fn send(registry: &MetricRegistry, addr: &str, prefix: &str) -> CacheResult<()> {
    let payload = format_snapshot(&registry.snapshot(), prefix, Utc::now().timestamp());
    if payload.is_empty() {
        return Ok(());
    }

    let write = async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(payload.as_bytes()).await?;
        stream.shutdown().await
    };

    match timeout(SEND_TIMEOUT, write).await {
        Ok(Ok(())) => {
            debug!(collector = %addr, bytes = payload.len(), "Reported metrics");
            Ok(())
        }
        Ok(Err(e)) => Err(CacheError::transport(format!(
            "metrics collector {addr}: {e}"
        ))),
        Err(_) => Err(CacheError::transport(format!(
            "metrics collector {addr}: timed out"
        ))),
    }
}
