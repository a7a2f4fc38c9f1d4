//! Key-value store repository.

use crate::connection::ConnectionProvider;
use crate::traits::CacheRepository;
use async_trait::async_trait;
use pcache_core::{CacheEntry, CacheResult};
use tracing::{debug, instrument};

/// [`CacheRepository`] over any key-value store with native expiry.
///
/// Each entry is stored as its JSON envelope under the normalized key with a
/// single set-with-expiry command, so a write is never partially applied.
pub struct StoreRepository<P> {
    provider: P,
    backend: &'static str,
}

impl<P: ConnectionProvider> StoreRepository<P> {
    /// Creates a repository. No connection is opened until the first call.
    pub fn with_provider(provider: P, backend: &'static str) -> Self {
        Self { provider, backend }
    }

    /// Returns the connection provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> CacheRepository for StoreRepository<P>
where
    P: ConnectionProvider + 'static,
{
    #[instrument(skip_all, fields(backend = self.backend))]
    async fn save(&self, entry: CacheEntry) -> CacheResult<CacheEntry> {
        // Validate before touching the store.
        let key = entry.normalized_id()?;
        let expiry = entry.expiry()?;
        let json = entry.to_json()?;

        let conn = self.provider.connection().await?;
        conn.set_ex(&key, &json, expiry.as_secs()).await?;

        debug!(key = %key, ttl_secs = expiry.as_secs(), "Saved entry");
        Ok(entry)
    }

    #[instrument(skip_all, fields(backend = self.backend))]
    async fn find_by_id(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let conn = self.provider.connection().await?;

        match conn.get(key).await? {
            Some(json) => {
                debug!(key = %key, "Cache hit");
                CacheEntry::from_json(&json).map(Some)
            }
            None => {
                debug!(key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn health_check(&self) -> CacheResult<()> {
        self.provider.connection().await?.ping().await
    }

    fn backend_name(&self) -> &'static str {
        self.backend
    }
}
