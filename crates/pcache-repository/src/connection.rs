//! Connection lifecycle shared by every store topology.
//!
//! A [`LazyConnection`] owns at most one open connection. The connection is
//! opened on first use, reused while it reports itself open, and replaced
//! on the next call once it has been marked closed.

use async_trait::async_trait;
use pcache_core::{CacheError, CacheResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Commands the repository issues against an open connection.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Stores `value` under `key`, expiring after `ttl_secs` seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()>;

    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Round-trips a PING.
    async fn ping(&self) -> CacheResult<()>;

    /// Returns false once the connection was closed by the peer or a
    /// connection-level failure has been observed.
    fn is_open(&self) -> bool;
}

/// Opens connections to one store topology.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection type produced by this connector.
    type Connection: StoreConnection + 'static;

    /// Opens a new connection.
    async fn connect(&self) -> CacheResult<Self::Connection>;

    /// Human-readable target for logs.
    fn describe(&self) -> String;
}

/// Hands out the connection commands should run on.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Returns an open connection, (re)connecting if necessary.
    async fn connection(&self) -> CacheResult<Arc<dyn StoreConnection>>;
}

/// Lazily opened, self-healing connection.
pub struct LazyConnection<C: Connector> {
    connector: C,
    connect_timeout: Duration,
    current: Mutex<Option<Arc<C::Connection>>>,
}

impl<C: Connector> LazyConnection<C> {
    /// Creates a handle without connecting.
    pub fn new(connector: C, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
            current: Mutex::new(None),
        }
    }

    /// Returns the underlying connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns true if an open connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|conn| conn.is_open())
    }

    /// Returns the current connection, opening a new one when it is absent
    /// or closed. Concurrent callers share a single connection attempt.
    pub async fn get(&self) -> CacheResult<Arc<C::Connection>> {
        let mut current = self.current.lock().await;

        if let Some(conn) = current.as_ref() {
            if conn.is_open() {
                return Ok(Arc::clone(conn));
            }
            info!(target_store = %self.connector.describe(), "Connection closed, reconnecting");
        }

        let target = self.connector.describe();
        debug!(target_store = %target, "Opening store connection");

        let conn = match tokio::time::timeout(self.connect_timeout, self.connector.connect()).await
        {
            Ok(Ok(conn)) => Arc::new(conn),
            Ok(Err(e)) => {
                warn!(target_store = %target, error = %e, "Failed to connect to store");
                return Err(e);
            }
            Err(_) => {
                warn!(target_store = %target, timeout = ?self.connect_timeout, "Store connection timed out");
                return Err(CacheError::transport(format!(
                    "connecting to {target} timed out after {}s",
                    self.connect_timeout.as_secs()
                )));
            }
        };

        info!(target_store = %target, "Store connection established");
        *current = Some(Arc::clone(&conn));
        Ok(conn)
    }
}

#[async_trait]
impl<C> ConnectionProvider for LazyConnection<C>
where
    C: Connector,
{
    async fn connection(&self) -> CacheResult<Arc<dyn StoreConnection>> {
        let conn: Arc<dyn StoreConnection> = self.get().await?;
        Ok(conn)
    }
}
