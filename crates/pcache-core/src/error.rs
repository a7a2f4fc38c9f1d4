//! Unified error type for the cache core.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Error type shared by the repository, service, and configuration layers.
///
/// "Absent" is deliberately not a variant: a missing or expired key is a
/// successful `Ok(None)` so that it can never be conflated with a failure.
#[derive(Error, Debug)]
pub enum CacheError {
    // ============ Entry Errors ============
    /// The entry lacks an extractable key or expiry.
    #[error("Invalid cache entry: {0}")]
    InvalidEntry(String),

    // ============ Store Errors ============
    /// The store is unreachable, dropped the connection, or is changing roles.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store answered but rejected the command.
    #[error("Store error: {0}")]
    Store(String),

    /// The entry could not be encoded into its JSON envelope.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored value could not be decoded back into an entry.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns the HTTP status code the handler layer should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidEntry(_) => 400,
            Self::Transport(_)
            | Self::Store(_)
            | Self::Serialization(_)
            | Self::Deserialization(_)
            | Self::Configuration(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEntry(_) => "INVALID_ENTRY",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Deserialization(_) => "DESERIALIZATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates an invalid entry error.
    #[must_use]
    pub fn invalid_entry<T: Into<String>>(message: T) -> Self {
        Self::InvalidEntry(message.into())
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a store error.
    #[must_use]
    pub fn store<T: Into<String>>(message: T) -> Self {
        Self::Store(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable by the caller.
    ///
    /// The backend itself never retries.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Checks if this error was caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidEntry(_))
    }
}

/// Serializable error response for the handler layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response from a `CacheError`.
    #[must_use]
    pub fn from_error(error: &CacheError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<&CacheError> for ErrorResponse {
    fn from(error: &CacheError) -> Self {
        Self::from_error(error)
    }
}
