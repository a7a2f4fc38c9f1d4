//! Repository trait definitions.

use async_trait::async_trait;
use pcache_core::{CacheEntry, CacheResult, Interface};

/// Storage contract for cache entries.
///
/// Absence is `Ok(None)`, never an error. A stored value that cannot be
/// decoded is reported as [`pcache_core::CacheError::Deserialization`].
#[async_trait]
pub trait CacheRepository: Interface + Send + Sync {
    /// Persists the entry under its normalized key with its expiry.
    ///
    /// Re-saving a key replaces the payload and resets the time-to-live.
    /// Returns the same entry on success.
    async fn save(&self, entry: CacheEntry) -> CacheResult<CacheEntry>;

    /// Finds an entry by its normalized key.
    async fn find_by_id(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Round-trips a PING through the active connection.
    async fn health_check(&self) -> CacheResult<()>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
