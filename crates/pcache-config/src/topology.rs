//! Store topology configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `host:port` pair identifying one store or sentinel node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl NodeAddress {
    /// Creates a new node address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for NodeAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("node address '{s}' must be host:port"))?;

        if host.is_empty() {
            return Err(format!("node address '{s}' has an empty host"));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| format!("node address '{s}' has an invalid port: {e}"))?;

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeAddress> for String {
    fn from(value: NodeAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// How the repository reaches the store.
///
/// Decided once from configuration: high availability iff a sentinel master
/// group name is configured, standalone otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// A single store node.
    Standalone {
        /// The store node.
        node: NodeAddress,
    },
    /// A leader/follower set discovered through sentinels.
    HighAvailability {
        /// Name of the master group monitored by the sentinels.
        master: String,
        /// Candidate sentinel nodes.
        sentinels: Vec<NodeAddress>,
    },
}

impl Topology {
    /// Returns the kind of this topology.
    #[must_use]
    pub const fn kind(&self) -> TopologyKind {
        match self {
            Self::Standalone { .. } => TopologyKind::Standalone,
            Self::HighAvailability { .. } => TopologyKind::HighAvailability,
        }
    }

    /// Returns true if this is a standalone topology.
    #[must_use]
    pub const fn is_standalone(&self) -> bool {
        matches!(self, Self::Standalone { .. })
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone { node } => write!(f, "standalone({node})"),
            Self::HighAvailability { master, sentinels } => {
                let nodes = sentinels
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "high-availability({master}@{nodes})")
            }
        }
    }
}

/// Discriminant of [`Topology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopologyKind {
    /// Single node.
    Standalone,
    /// Sentinel-managed leader/follower set.
    HighAvailability,
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::HighAvailability => write!(f, "high-availability"),
        }
    }
}
