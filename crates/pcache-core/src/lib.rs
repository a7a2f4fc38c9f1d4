//! # pcache Core
//!
//! Core types shared by every pcache crate: the cache entry model, the
//! unified error type, and logging initialization.

pub mod entry;
pub mod error;
pub mod result;
pub mod telemetry;

pub use entry::*;
pub use error::*;
pub use result::*;
pub use telemetry::{init_logging, LogFormat, LoggingConfig};

// Re-export shaku for DI
pub use shaku::Interface;
