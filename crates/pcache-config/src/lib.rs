//! # pcache Config
//!
//! Configuration management for pcache.
//! Supports layered configuration from files, environment variables,
//! and runtime refresh.

mod app_config;
mod loader;
mod topology;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use topology::*;
pub use validation::*;
