//! Cache service trait definition.

use async_trait::async_trait;
use pcache_core::{CacheEntry, CacheResult, Interface};

/// Cache service trait.
#[async_trait]
pub trait CacheService: Interface + Send + Sync {
    /// Looks up an entry by its store key. Absence is `Ok(None)`.
    async fn fetch(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Stores an entry and returns it.
    async fn save(&self, entry: CacheEntry) -> CacheResult<CacheEntry>;

    /// Checks that the store answers.
    async fn health_check(&self) -> CacheResult<()>;
}
