//! Cache entry model.
//!
//! An entry is built by the handler layer from caller input and handed to a
//! repository. The repository only needs two things out of it before talking
//! to the store: the normalized key and the expiry.

use crate::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest accepted time-to-live, in seconds.
///
/// The store converts the expiry to milliseconds and adds its own clock, so
/// half of the signed millisecond range is kept as headroom.
pub const MAX_EXPIRY_SECS: u64 = i64::MAX as u64 / 1000 / 2;

/// The opaque content of a cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Content type as declared by the caller (e.g. `json`, `xml`).
    #[serde(rename = "type")]
    pub payload_type: String,

    /// Caller-visible key of the payload.
    pub key: String,

    /// Arbitrary structured content.
    pub value: serde_json::Value,
}

impl Payload {
    /// Creates a new payload.
    #[must_use]
    pub fn new(payload_type: impl Into<String>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            payload_type: payload_type.into(),
            key: key.into(),
            value,
        }
    }
}

/// The unit of storage: a payload stored under `prefix + id` for `expiry` seconds.
///
/// `id`, `prefix`, and `expiry` are optional on the wire because the entry is
/// assembled from untrusted input; [`CacheEntry::normalized_id`] and
/// [`CacheEntry::expiry`] reject entries that lack them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Generated or caller-supplied identifier.
    pub id: Option<String>,

    /// Namespace prepended to the identifier to form the store key.
    pub prefix: Option<String>,

    /// Stored content.
    pub payload: Payload,

    /// Time-to-live in seconds.
    pub expiry: Option<u64>,

    /// Whether `id` was supplied by the caller rather than generated.
    #[serde(default)]
    pub is_external_id: bool,
}

impl CacheEntry {
    /// Creates a new entry with a generated identifier.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        prefix: impl Into<String>,
        payload: Payload,
        expiry_secs: u64,
    ) -> Self {
        Self {
            id: Some(id.into()),
            prefix: Some(prefix.into()),
            payload,
            expiry: Some(expiry_secs),
            is_external_id: false,
        }
    }

    /// Marks the identifier as caller-supplied.
    #[must_use]
    pub fn with_external_id(mut self) -> Self {
        self.is_external_id = true;
        self
    }

    /// Returns the store key: the prefix followed by the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidEntry`] when the identifier or prefix is
    /// missing, or the identifier is blank.
    pub fn normalized_id(&self) -> CacheResult<String> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| CacheError::invalid_entry("entry has no id"))?;
        let prefix = self
            .prefix
            .as_deref()
            .ok_or_else(|| CacheError::invalid_entry("entry has no prefix"))?;

        if id.trim().is_empty() {
            return Err(CacheError::invalid_entry("entry id is blank"));
        }

        Ok(format!("{prefix}{id}"))
    }

    /// Returns the time-to-live of the entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidEntry`] when the expiry is missing, zero,
    /// or above [`MAX_EXPIRY_SECS`].
    pub fn expiry(&self) -> CacheResult<Duration> {
        match self.expiry {
            Some(0) => Err(CacheError::invalid_entry("entry expiry must be positive")),
            Some(secs) if secs > MAX_EXPIRY_SECS => Err(CacheError::invalid_entry(format!(
                "entry expiry exceeds {MAX_EXPIRY_SECS} seconds"
            ))),
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Err(CacheError::invalid_entry("entry has no expiry")),
        }
    }

    /// Encodes the entry into the JSON envelope persisted by the store.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if the payload cannot be encoded.
    pub fn to_json(&self) -> CacheResult<String> {
        serde_json::to_string(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decodes an entry from its JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Deserialization`] if the envelope is malformed.
    pub fn from_json(json: &str) -> CacheResult<Self> {
        serde_json::from_str(json).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}
