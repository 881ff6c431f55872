//! Bus Error Types
//!
//! Defines error types raised by registration and emission.

use thiserror::Error;

use crate::bus::identifier::EventId;
use crate::bus::listener::ListenerId;

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur during bus operations
#[derive(Debug, Error)]
pub enum BusError {
    /// A textual identifier violates the wildcard syntax rules
    #[error("Invalid event identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// An explicit capacity was not a positive integer
    #[error("Invalid listener capacity {capacity}: capacity must be a positive integer")]
    InvalidCapacity { capacity: u32 },

    /// A listener returned an error mid-emission
    #[error("Listener {id} registered under '{identifier}' failed: {source}")]
    ListenerFailed {
        id: ListenerId,
        identifier: EventId,
        #[source]
        source: anyhow::Error,
    },
}

impl BusError {
    /// Create an invalid identifier error
    pub fn invalid_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a listener failure error
    pub fn listener_failed(id: ListenerId, identifier: EventId, source: anyhow::Error) -> Self {
        Self::ListenerFailed {
            id,
            identifier,
            source,
        }
    }

    /// True for errors caused by the caller's arguments rather than a listener
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::ListenerFailed { .. })
    }
}
