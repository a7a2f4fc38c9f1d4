//! Cache service implementations.
//!
//! Trait definitions live in the parent module (`cache_service.rs`).

pub mod cache_service_impl;

pub use cache_service_impl::{CacheServiceComponent, CacheServiceImpl};
