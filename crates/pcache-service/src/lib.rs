//! # pcache Service
//!
//! The seam request handlers call into: each operation is timed with the
//! pre-registered request timers and failures are counted per component
//! before the result is handed back.

pub mod cache_service;
pub mod r#impl;

pub use cache_service::*;
pub use r#impl::{CacheServiceComponent, CacheServiceImpl};
