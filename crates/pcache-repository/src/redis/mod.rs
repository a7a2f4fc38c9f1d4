//! Redis-backed cache repository.
//!
//! The topology is decided once from configuration: a sentinel-managed
//! master/replica set when a master group name is configured, a single node
//! otherwise. Nothing connects until the first command.

mod connector;
mod handle;

pub use connector::{SentinelConnector, StandaloneConnector};
pub use handle::{RedisHandle, SentinelHandle};

use crate::connection::{ConnectionProvider, LazyConnection, StoreConnection};
use crate::store_repository::StoreRepository;
use crate::traits::CacheRepository;
use async_trait::async_trait;
use pcache_config::{RedisConfig, Topology, TopologyKind};
use pcache_core::CacheResult;
use shaku::{Component, Module, ModuleBuildContext};
use std::sync::Arc;
use tracing::info;

/// Backend name reported by [`RedisCacheRepository`].
pub const BACKEND_NAME: &str = "redis";

/// The active topology's connection. Exactly one variant exists per repository.
pub enum RedisConnections {
    /// Single node.
    Standalone(LazyConnection<StandaloneConnector>),
    /// Sentinel-managed master/replica set.
    HighAvailability(LazyConnection<SentinelConnector>),
}

impl RedisConnections {
    /// Builds the connection for the configured topology without connecting.
    pub fn from_config(config: &RedisConfig) -> Self {
        let timeout = config.connect_timeout();
        let topology = config.topology();
        info!(topology = %topology, "Configuring Redis repository");

        match topology {
            Topology::Standalone { .. } => {
                Self::Standalone(LazyConnection::new(StandaloneConnector::new(config), timeout))
            }
            Topology::HighAvailability { master, sentinels } => Self::HighAvailability(
                LazyConnection::new(SentinelConnector::new(master, sentinels, config), timeout),
            ),
        }
    }

    /// Returns the topology kind.
    pub const fn kind(&self) -> TopologyKind {
        match self {
            Self::Standalone(_) => TopologyKind::Standalone,
            Self::HighAvailability(_) => TopologyKind::HighAvailability,
        }
    }

    /// Returns true if an open connection is currently held.
    pub async fn is_connected(&self) -> bool {
        match self {
            Self::Standalone(conn) => conn.is_connected().await,
            Self::HighAvailability(conn) => conn.is_connected().await,
        }
    }
}

#[async_trait]
impl ConnectionProvider for RedisConnections {
    async fn connection(&self) -> CacheResult<Arc<dyn StoreConnection>> {
        match self {
            Self::Standalone(conn) => conn.connection().await,
            Self::HighAvailability(conn) => conn.connection().await,
        }
    }
}

/// Cache repository over Redis.
pub type RedisCacheRepository = StoreRepository<RedisConnections>;

impl StoreRepository<RedisConnections> {
    /// Creates a Redis repository for the configured topology.
    pub fn new(config: &RedisConfig) -> Self {
        Self::with_provider(RedisConnections::from_config(config), BACKEND_NAME)
    }

    /// Returns the topology kind in use.
    pub fn topology_kind(&self) -> TopologyKind {
        self.provider().kind()
    }
}

impl<M: Module> Component<M> for StoreRepository<RedisConnections> {
    type Interface = dyn CacheRepository;
    type Parameters = RedisConfig;

    fn build(_: &mut ModuleBuildContext<M>, params: Self::Parameters) -> Box<Self::Interface> {
        Box::new(Self::new(&params))
    }
}
