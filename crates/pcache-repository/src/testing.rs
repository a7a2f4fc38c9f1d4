//! In-process stores used by unit tests.
//!
//! [`MemoryConnector`] stands in for a whole topology behind the
//! [`Connector`] seam. [`FakeRedis`] speaks just enough RESP over TCP to drive
//! the real Redis handles.

use crate::connection::{Connector, StoreConnection};
use async_trait::async_trait;
use parking_lot::Mutex;
use pcache_core::{CacheError, CacheResult};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Default)]
struct Shared {
    data: Mutex<HashMap<String, (String, Instant)>>,
    handles: Mutex<Vec<Arc<AtomicBool>>>,
    connects: AtomicUsize,
    refuse: AtomicBool,
    stall: AtomicBool,
}

/// Connector over a shared in-memory map with native expiry.
#[derive(Clone, Default)]
pub(crate) struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of connections opened so far.
    pub(crate) fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Marks every open connection closed, as a dropped socket would.
    pub(crate) fn drop_connections(&self) {
        for handle in self.shared.handles.lock().iter() {
            handle.store(false, Ordering::SeqCst);
        }
    }

    pub(crate) fn refuse(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    pub(crate) fn stall(&self, stall: bool) {
        self.shared.stall.store(stall, Ordering::SeqCst);
    }

    /// Writes a raw value, bypassing the repository.
    pub(crate) fn put_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.shared
            .data
            .lock()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }

    /// Number of live keys.
    pub(crate) fn len(&self) -> usize {
        let now = Instant::now();
        self.shared
            .data
            .lock()
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }
}

pub(crate) struct MemoryConnection {
    shared: Arc<Shared>,
    open: Arc<AtomicBool>,
}

impl MemoryConnection {
    fn check_open(&self) -> CacheResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::transport("connection reset by peer"))
        }
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        self.check_open()?;
        if ttl_secs == 0 {
            return Err(CacheError::store("invalid expire time in 'setex' command"));
        }
        let expires = Instant::now() + Duration::from_secs(ttl_secs);
        self.shared
            .data
            .lock()
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_open()?;
        let now = Instant::now();
        let mut data = self.shared.data.lock();
        match data.get(key) {
            Some((value, expires)) if *expires > now => Ok(Some(value.clone())),
            Some(_) => {
                data.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check_open()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> CacheResult<MemoryConnection> {
        if self.shared.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        // Yield so concurrent callers pile up behind the connect.
        tokio::task::yield_now().await;

        if self.shared.refuse.load(Ordering::SeqCst) {
            return Err(CacheError::transport("connection refused"));
        }

        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        let open = Arc::new(AtomicBool::new(true));
        self.shared.handles.lock().push(Arc::clone(&open));

        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
            open,
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[derive(Default)]
struct FakeState {
    data: Mutex<HashMap<String, String>>,
    commands: Mutex<Vec<String>>,
    connections: AtomicUsize,
    read_only: AtomicBool,
}

/// A single-node RESP2 server on a loopback port.
///
/// Handles PING, GET, SETEX and the connection setup commands. Expiry is not
/// modelled.
pub(crate) struct FakeRedis {
    port: u16,
    state: Arc<FakeState>,
    kill: watch::Sender<u64>,
    accept: JoinHandle<()>,
}

impl FakeRedis {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(FakeState::default());
        let (kill, _) = watch::channel(0u64);

        let accept = {
            let state = Arc::clone(&state);
            let kill = kill.clone();
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    state.connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(socket, Arc::clone(&state), kill.subscribe()));
                }
            })
        };

        Self {
            port,
            state,
            kill,
            accept,
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp("127.0.0.1".to_string(), self.port),
            redis: RedisConnectionInfo::default(),
        }
    }

    /// Connections accepted so far.
    pub(crate) fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Names of the data commands received, in order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.commands.lock().clone()
    }

    /// Answers writes with READONLY, as a demoted master does.
    pub(crate) fn set_read_only(&self, read_only: bool) {
        self.state.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Closes every client socket, as `CLIENT KILL` or a restart would.
    pub(crate) fn disconnect_all(&self) {
        self.kill.send_modify(|generation| *generation += 1);
    }
}

impl Drop for FakeRedis {
    fn drop(&mut self) {
        self.accept.abort();
        self.disconnect_all();
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub(crate) async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 2s");
}

async fn serve(socket: TcpStream, state: Arc<FakeState>, mut kill: watch::Receiver<u64>) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    loop {
        let command = tokio::select! {
            command = read_command(&mut reader) => command,
            _ = kill.changed() => return,
        };
        let Ok(Some(args)) = command else { return };

        let reply = respond(&state, &args);
        if write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

async fn read_command<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<String>>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count = parse_header(&line, '*')?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len = parse_header(&line, '$')?;

        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

fn parse_header(line: &str, marker: char) -> io::Result<usize> {
    line.trim_end()
        .strip_prefix(marker)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("bad header {line:?}")))
}

fn respond(state: &FakeState, args: &[String]) -> String {
    let name = args.first().map(|a| a.to_ascii_uppercase()).unwrap_or_default();

    match (name.as_str(), args) {
        ("CLIENT" | "SELECT" | "AUTH", _) => "+OK\r\n".to_string(),
        ("PING", _) => {
            state.commands.lock().push(name);
            "+PONG\r\n".to_string()
        }
        ("GET", [_, key]) => {
            state.commands.lock().push(name);
            match state.data.lock().get(key) {
                Some(value) => format!("${}\r\n{value}\r\n", value.len()),
                None => "$-1\r\n".to_string(),
            }
        }
        ("SETEX", [_, key, secs, value]) => {
            state.commands.lock().push(name);
            if state.read_only.load(Ordering::SeqCst) {
                return "-READONLY You can't write against a read only replica.\r\n".to_string();
            }
            match secs.parse::<i64>() {
                Ok(secs) if secs > 0 => {
                    state.data.lock().insert(key.clone(), value.clone());
                    "+OK\r\n".to_string()
                }
                _ => "-ERR invalid expire time in 'setex' command\r\n".to_string(),
            }
        }
        _ => format!("-ERR unknown command '{name}'\r\n"),
    }
}
