//! Series identifiers.

use std::borrow::Cow;
use std::fmt;

/// Well-known owner components.
pub mod components {
    /// Fetch request handler.
    pub const FETCH_HANDLER: &str = "fetch_handler";
    /// Save request handler.
    pub const SAVE_HANDLER: &str = "save_handler";
    /// Request router (unknown routes, malformed requests).
    pub const API_ROUTER: &str = "api_router";
}

/// Kind of measurement recorded for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeasurementTag {
    /// Request latency.
    RequestDuration,
    /// Request throughput.
    RequestRate,
    /// Requests rejected as invalid.
    InvalidRequestRate,
    /// Requests that failed.
    ErrorRate,
    /// Request without a key.
    ErrMissingId,
    /// Malformed request.
    ErrBadRequest,
    /// Request that timed out.
    ErrTimedOut,
    /// Store failure.
    ErrDb,
}

impl MeasurementTag {
    /// Returns the series suffix for this tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RequestDuration => "request_duration",
            Self::RequestRate => "request_rate",
            Self::InvalidRequestRate => "invalid_request_rate",
            Self::ErrorRate => "error_rate",
            Self::ErrMissingId => "err.missingId",
            Self::ErrBadRequest => "err.badRequest",
            Self::ErrTimedOut => "err.timedOut",
            Self::ErrDb => "err.db",
        }
    }
}

impl fmt::Display for MeasurementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service operation being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    /// Lookup by key.
    Fetch,
    /// Store an entry.
    Save,
    /// Store reachability check.
    HealthCheck,
}

impl ServiceType {
    /// Returns the handler component that owns this operation's series.
    #[must_use]
    pub const fn component(&self) -> &'static str {
        match self {
            Self::Fetch => components::FETCH_HANDLER,
            Self::Save => components::SAVE_HANDLER,
            Self::HealthCheck => components::API_ROUTER,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Save => write!(f, "save"),
            Self::HealthCheck => write!(f, "health_check"),
        }
    }
}

/// Identifies one series by owner component and measurement kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    component: Cow<'static, str>,
    tag: MeasurementTag,
}

impl MetricKey {
    /// Creates a key.
    #[must_use]
    pub fn new(component: impl Into<Cow<'static, str>>, tag: MeasurementTag) -> Self {
        Self {
            component: component.into(),
            tag,
        }
    }

    /// Returns the owner component.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Returns the measurement kind.
    #[must_use]
    pub const fn tag(&self) -> MeasurementTag {
        self.tag
    }

    /// Returns the dotted series name, `<component>.<tag>`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}.{}", self.component, self.tag)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.tag)
    }
}
