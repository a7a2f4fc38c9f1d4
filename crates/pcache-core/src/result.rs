//! Result type aliases for pcache.

use crate::CacheError;

/// A specialized `Result` type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
