//! # pcache Repository
//!
//! Storage layer for cache entries:
//!
//! ```text
//! Service
//!   ↓  Arc<dyn CacheRepository>      (storage contract)
//! StoreRepository<P>                 (key normalization, envelope, SETEX/GET)
//!   ↓  P: ConnectionProvider
//! RedisConnections                   (Standalone | HighAvailability)
//!   ↓  LazyConnection<C: Connector>  (open on first use, replace when closed)
//! Redis node / sentinel set
//! ```
//!
//! ## Structure
//!
//! ```text
//! src/
//!   traits.rs             ← CacheRepository trait
//!   connection.rs         ← StoreConnection, Connector, LazyConnection
//!   store_repository.rs   ← StoreRepository
//!   redis/
//!     mod.rs              ← RedisConnections, RedisCacheRepository
//!     connector.rs        ← StandaloneConnector, SentinelConnector
//!     handle.rs           ← RedisHandle, SentinelHandle
//! ```

pub mod connection;
pub mod redis;
pub mod store_repository;
pub mod traits;

#[cfg(test)]
mod testing;

pub use connection::{ConnectionProvider, Connector, LazyConnection, StoreConnection};
pub use redis::{RedisCacheRepository, RedisConnections};
pub use store_repository::StoreRepository;
pub use traits::*;
