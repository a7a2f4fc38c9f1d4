//! Connectors for the two Redis topologies.

use super::handle::{RedisHandle, SentinelHandle};
use crate::connection::Connector;
use async_trait::async_trait;
use pcache_config::{NodeAddress, RedisConfig};
use pcache_core::{CacheError, CacheResult};
use redis::sentinel::{Sentinel, SentinelNodeConnectionInfo};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

fn data_node_info(config: &RedisConfig) -> RedisConnectionInfo {
    RedisConnectionInfo {
        db: config.database,
        password: config.password.clone(),
        ..RedisConnectionInfo::default()
    }
}

fn connection_info(node: &NodeAddress, redis: RedisConnectionInfo) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(node.host.clone(), node.port),
        redis,
    }
}

/// Connects to a single Redis node.
pub struct StandaloneConnector {
    node: NodeAddress,
    info: ConnectionInfo,
}

impl StandaloneConnector {
    /// Creates a connector for the configured standalone node.
    pub fn new(config: &RedisConfig) -> Self {
        let node = config.node();
        Self {
            info: connection_info(&node, data_node_info(config)),
            node,
        }
    }

    /// Returns the target node.
    pub fn node(&self) -> &NodeAddress {
        &self.node
    }
}

#[async_trait]
impl Connector for StandaloneConnector {
    type Connection = RedisHandle;

    async fn connect(&self) -> CacheResult<RedisHandle> {
        debug!(node = %self.node, "Connecting to Redis");
        RedisHandle::connect(&self.info, self.node.to_string()).await
    }

    fn describe(&self) -> String {
        format!("redis://{}", self.node)
    }
}

/// Resolves the master (and a replica for reads) through a sentinel set.
pub struct SentinelConnector {
    master_name: String,
    sentinels: Vec<NodeAddress>,
    node_info: SentinelNodeConnectionInfo,
    sentinel: OnceCell<Mutex<Sentinel>>,
}

impl SentinelConnector {
    /// Creates a connector for the named master group.
    pub fn new(master_name: impl Into<String>, sentinels: Vec<NodeAddress>, config: &RedisConfig) -> Self {
        Self {
            master_name: master_name.into(),
            sentinels,
            node_info: SentinelNodeConnectionInfo {
                tls_mode: None,
                redis_connection_info: Some(data_node_info(config)),
            },
            sentinel: OnceCell::new(),
        }
    }

    /// Returns the master group name.
    pub fn master_name(&self) -> &str {
        &self.master_name
    }

    /// Returns the sentinel nodes.
    pub fn sentinels(&self) -> &[NodeAddress] {
        &self.sentinels
    }

    async fn sentinel(&self) -> CacheResult<&Mutex<Sentinel>> {
        self.sentinel
            .get_or_try_init(|| async {
                let nodes: Vec<ConnectionInfo> = self
                    .sentinels
                    .iter()
                    .map(|node| connection_info(node, RedisConnectionInfo::default()))
                    .collect();
                debug!(master = %self.master_name, sentinels = self.sentinels.len(), "Creating sentinel client");
                Sentinel::build(nodes).map(Mutex::new)
            })
            .await
            .map_err(|e| CacheError::Configuration(format!("invalid sentinel set: {e}")))
    }
}

#[async_trait]
impl Connector for SentinelConnector {
    type Connection = SentinelHandle;

    async fn connect(&self) -> CacheResult<SentinelHandle> {
        let (master_client, replica_client) = {
            let mut sentinel = self.sentinel().await?.lock().await;

            let master = sentinel
                .async_master_for(&self.master_name, Some(&self.node_info))
                .await
                .map_err(|e| {
                    CacheError::transport(format!(
                        "failed to resolve master '{}': {e}",
                        self.master_name
                    ))
                })?;

            let replica = match sentinel
                .async_replica_for(&self.master_name, Some(&self.node_info))
                .await
            {
                Ok(client) => Some(client),
                Err(e) => {
                    debug!(master = %self.master_name, error = %e, "No replica available, reads use master");
                    None
                }
            };

            (master, replica)
        };

        let master_info = master_client.get_connection_info();
        let master_endpoint = format!("{}@{}", self.master_name, master_info.addr);
        let master = RedisHandle::connect(master_info, master_endpoint).await?;

        let replica = match replica_client {
            Some(client) => {
                let info = client.get_connection_info();
                let endpoint = info.addr.to_string();
                match RedisHandle::connect(info, endpoint.clone()).await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!(replica = %endpoint, error = %e, "Failed to connect to replica");
                        None
                    }
                }
            }
            None => None,
        };

        info!(
            master = %master.endpoint(),
            replica = replica.as_ref().map_or("none", RedisHandle::endpoint),
            "Resolved sentinel topology"
        );

        Ok(SentinelHandle::new(master, replica))
    }

    fn describe(&self) -> String {
        let nodes = self
            .sentinels
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("redis+sentinel://{}/{}", nodes, self.master_name)
    }
}
