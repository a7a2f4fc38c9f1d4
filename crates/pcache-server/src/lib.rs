//! # pcache Server Library
//!
//! Composition root for the cache service: dependency injection wiring,
//! process lifecycle, and startup logging.

pub mod app;
pub mod di;
pub mod startup;
