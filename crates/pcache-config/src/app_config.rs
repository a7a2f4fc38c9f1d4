//! Application configuration structures.

use crate::{NodeAddress, Topology};
use pcache_core::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Store configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Metrics export configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "pcache".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis configuration.
///
/// `host`/`port` describe the standalone node. When `sentinel.master` is set
/// the standalone node is ignored and the master is discovered through
/// `sentinel.nodes` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Standalone host.
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Standalone port.
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Password for the data nodes (not the sentinels).
    #[serde(default)]
    pub password: Option<String>,

    /// Logical database index.
    #[serde(default)]
    pub database: i64,

    /// Connection establishment timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Sentinel (high-availability) configuration.
    #[serde(default)]
    pub sentinel: SentinelConfig,
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_connect_timeout() -> u64 {
    5
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: None,
            database: 0,
            connect_timeout_secs: default_connect_timeout(),
            sentinel: SentinelConfig::default(),
        }
    }
}

impl RedisConfig {
    /// Returns the standalone node address.
    #[must_use]
    pub fn node(&self) -> NodeAddress {
        NodeAddress::new(self.host.clone(), self.port)
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Decides the topology: high availability iff a master group is named.
    #[must_use]
    pub fn topology(&self) -> Topology {
        match self.sentinel.master_name() {
            Some(master) => Topology::HighAvailability {
                master: master.to_string(),
                sentinels: self.sentinel.nodes.clone(),
            },
            None => Topology::Standalone { node: self.node() },
        }
    }
}

/// Sentinel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Name of the master group monitored by the sentinels.
    #[serde(default)]
    pub master: Option<String>,

    /// Sentinel nodes as `host:port`.
    #[serde(default)]
    pub nodes: Vec<NodeAddress>,
}

impl SentinelConfig {
    /// Returns the configured master group name, ignoring blank values.
    #[must_use]
    pub fn master_name(&self) -> Option<&str> {
        self.master
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Metrics export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable periodic export to the collector.
    #[serde(default)]
    pub enabled: bool,

    /// Collector host.
    #[serde(default = "default_metrics_host")]
    pub host: String,

    /// Collector plaintext port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,

    /// Prefix prepended to every series name.
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,

    /// Export interval in seconds.
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_host() -> String {
    "localhost".to_string()
}

fn default_metrics_port() -> u16 {
    2003
}

fn default_metrics_prefix() -> String {
    "pcache".to_string()
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_metrics_host(),
            port: default_metrics_port(),
            prefix: default_metrics_prefix(),
            interval_secs: default_metrics_interval(),
        }
    }
}

impl MetricsConfig {
    /// Returns the collector address.
    #[must_use]
    pub fn collector_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the export interval as a Duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
