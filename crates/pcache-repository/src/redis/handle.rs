//! Redis connection handles.

use crate::connection::StoreConnection;
use async_trait::async_trait;
use pcache_core::{CacheError, CacheResult};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, ErrorKind, RedisError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Returns true for failures that leave the connection unusable.
pub(crate) fn is_connection_error(err: &RedisError) -> bool {
    err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() || err.is_timeout()
}

/// Returns true when the node answered but is no longer the node we want:
/// a demoted master, a master without quorum, or a slot in transition.
pub(crate) fn is_topology_error(err: &RedisError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ReadOnly | ErrorKind::MasterDown | ErrorKind::TryAgain
    )
}

/// One multiplexed connection to a single Redis node.
///
/// Commands run on a clone of the multiplexed connection, so concurrent
/// callers pipeline over one socket. The connection driver runs on its own
/// task; when it ends (peer closed the socket, I/O error) the handle reports
/// itself closed before any command has to fail.
pub struct RedisHandle {
    conn: MultiplexedConnection,
    endpoint: String,
    open: Arc<AtomicBool>,
}

impl RedisHandle {
    /// Opens a TCP connection to the node described by `info`, runs the
    /// connection setup (AUTH, SELECT) and spawns the driver.
    pub(crate) async fn connect(info: &ConnectionInfo, endpoint: impl Into<String>) -> CacheResult<Self> {
        let endpoint = endpoint.into();
        let (host, port) = match &info.addr {
            ConnectionAddr::Tcp(host, port) => (host.as_str(), *port),
            other => {
                return Err(CacheError::Configuration(format!(
                    "unsupported Redis address {other}"
                )))
            }
        };

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| CacheError::transport(format!("connect to {endpoint} failed: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| CacheError::transport(format!("connect to {endpoint} failed: {e}")))?;

        let (conn, driver) = MultiplexedConnection::new(&info.redis, stream)
            .await
            .map_err(|e| {
                if is_connection_error(&e) {
                    CacheError::transport(format!("handshake with {endpoint} failed: {e}"))
                } else {
                    CacheError::store(format!("handshake with {endpoint} failed: {e}"))
                }
            })?;

        let open = Arc::new(AtomicBool::new(true));
        let watch = Arc::clone(&open);
        let watched = endpoint.clone();
        tokio::spawn(async move {
            driver.await;
            if watch.swap(false, Ordering::SeqCst) {
                warn!(endpoint = %watched, "Redis connection closed by peer");
            }
        });

        debug!(endpoint = %endpoint, "Redis connection established");
        Ok(Self { conn, endpoint, open })
    }

    /// Returns the node this handle is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn fail(&self, op: &str, err: RedisError) -> CacheError {
        let message = format!("{op} on {} failed: {err}", self.endpoint);

        if is_connection_error(&err) || is_topology_error(&err) {
            if self.open.swap(false, Ordering::SeqCst) {
                warn!(endpoint = %self.endpoint, error = %err, "Redis connection unusable");
            }
            return CacheError::transport(message);
        }
        CacheError::store(message)
    }
}

impl Drop for RedisHandle {
    fn drop(&mut self) {
        // The driver exits once every clone is gone; keep that quiet.
        self.open.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreConnection for RedisHandle {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| self.fail("SETEX", e))
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| self.fail("GET", e))
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.fail("PING", e))?;
        debug!(endpoint = %self.endpoint, reply = %pong, "Redis ping");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Master/replica pair resolved through the sentinels.
///
/// Writes always go to the master. Reads go to the replica while it is
/// healthy and fall back to the master otherwise. The pair is reported
/// closed as soon as either side closes, so the next request resolves both
/// again through the sentinels.
pub struct SentinelHandle {
    master: RedisHandle,
    replica: Option<RedisHandle>,
}

impl SentinelHandle {
    pub(crate) fn new(master: RedisHandle, replica: Option<RedisHandle>) -> Self {
        Self { master, replica }
    }

    /// Returns the master handle.
    pub fn master(&self) -> &RedisHandle {
        &self.master
    }

    /// Returns the replica handle, if one was resolved.
    pub fn replica(&self) -> Option<&RedisHandle> {
        self.replica.as_ref()
    }

    fn reader(&self) -> Option<&RedisHandle> {
        self.replica.as_ref().filter(|replica| replica.is_open())
    }
}

#[async_trait]
impl StoreConnection for SentinelHandle {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        self.master.set_ex(key, value, ttl_secs).await
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if let Some(replica) = self.reader() {
            match replica.get(key).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(replica = %replica.endpoint(), error = %e, "Replica read failed, using master");
                }
            }
        }
        self.master.get(key).await
    }

    async fn ping(&self) -> CacheResult<()> {
        self.master.ping().await
    }

    fn is_open(&self) -> bool {
        self.master.is_open() && self.replica.as_ref().map_or(true, RedisHandle::is_open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eventually, FakeRedis};

    async fn handle(server: &FakeRedis, name: &str) -> RedisHandle {
        RedisHandle::connect(&server.connection_info(), name).await.unwrap()
    }

    async fn sentinel_pair(master: &FakeRedis, replica: &FakeRedis) -> SentinelHandle {
        SentinelHandle::new(handle(master, "master").await, Some(handle(replica, "replica").await))
    }

    #[tokio::test]
    async fn test_peer_close_marks_handle_closed() {
        let server = FakeRedis::start().await;
        let handle = handle(&server, "node").await;
        handle.ping().await.unwrap();
        assert!(handle.is_open());

        server.disconnect_all();
        eventually(|| !handle.is_open()).await;

        let err = handle.get("k").await.unwrap_err();
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_rejected_command_is_store_error() {
        let server = FakeRedis::start().await;
        let handle = handle(&server, "node").await;

        let err = handle.set_ex("k", "v", 0).await.unwrap_err();
        assert!(matches!(err, CacheError::Store(_)));
        assert!(!err.is_retriable());

        // The connection itself is still fine.
        assert!(handle.is_open());
        handle.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(handle.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_read_only_node_marks_handle_closed() {
        let server = FakeRedis::start().await;
        server.set_read_only(true);
        let handle = handle(&server, "node").await;

        let err = handle.set_ex("k", "v", 60).await.unwrap_err();
        assert!(matches!(err, CacheError::Transport(_)));
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let server = FakeRedis::start().await;
        let mut info = server.connection_info();
        info.addr = ConnectionAddr::Tcp("127.0.0.1".to_string(), 1);

        let err = RedisHandle::connect(&info, "nowhere").await.err().unwrap();
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_sentinel_writes_to_master_reads_from_replica() {
        let master = FakeRedis::start().await;
        let replica = FakeRedis::start().await;
        let pair = sentinel_pair(&master, &replica).await;

        pair.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(pair.get("k").await.unwrap(), None);
        pair.ping().await.unwrap();

        assert_eq!(master.commands(), ["SETEX", "PING"]);
        assert_eq!(replica.commands(), ["GET"]);
        assert_eq!(pair.master().endpoint(), "master");
        assert_eq!(pair.replica().map(RedisHandle::endpoint), Some("replica"));
    }

    #[tokio::test]
    async fn test_sentinel_reads_fall_back_to_master() {
        let master = FakeRedis::start().await;
        let replica = FakeRedis::start().await;
        let pair = sentinel_pair(&master, &replica).await;
        pair.set_ex("k", "v", 60).await.unwrap();

        replica.disconnect_all();
        eventually(|| pair.replica().is_some_and(|r| !r.is_open())).await;

        assert_eq!(pair.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(master.commands(), ["SETEX", "GET"]);
        assert!(replica.commands().is_empty());
    }

    #[tokio::test]
    async fn test_sentinel_without_replica_reads_master() {
        let master = FakeRedis::start().await;
        let pair = SentinelHandle::new(handle(&master, "master").await, None);

        assert_eq!(pair.get("k").await.unwrap(), None);
        assert_eq!(master.commands(), ["GET"]);
        assert!(pair.is_open());
    }

    #[tokio::test]
    async fn test_sentinel_closed_replica_closes_pair() {
        let master = FakeRedis::start().await;
        let replica = FakeRedis::start().await;
        let pair = sentinel_pair(&master, &replica).await;
        assert!(pair.is_open());

        replica.disconnect_all();
        eventually(|| !pair.is_open()).await;
        assert!(pair.master().is_open());
    }

    #[tokio::test]
    async fn test_sentinel_demoted_master_closes_pair() {
        let master = FakeRedis::start().await;
        let replica = FakeRedis::start().await;
        let pair = sentinel_pair(&master, &replica).await;

        master.set_read_only(true);
        let err = pair.set_ex("k", "v", 60).await.unwrap_err();

        assert!(err.is_retriable());
        assert!(!pair.is_open());
    }
}
