//! Error types
//!
//! Every fallible operation in the crate returns [`Result`]. Failures that
//! happen behind an asynchronous boundary (label announcements, snapshot
//! fetches) never propagate to the caller; they are reported on the
//! connection's status stream instead.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::subscription::SubscriptionId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by user supplied resource, topic and render callbacks
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of user supplied callbacks
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Crate error type
#[derive(Debug, Error)]
pub enum Error {
    /// Server answered with a non-2xx status
    #[error("{status} {url} {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Response body (may be empty)
        body: String,
    },

    /// Request could not be sent or the response could not be read
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Payload was not valid JSON
    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// URL could not be parsed or joined
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Push transport failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Listener bookkeeping failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Subscription descriptor rejected
    #[error("invalid subscription config: {0}")]
    InvalidConfig(String),

    /// Subscription id is not (or no longer) known to the connection
    #[error("unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    /// Operation needs a resource but the subscription has none
    #[error("subscription {0} has no resource")]
    NoResource(SubscriptionId),

    /// The connection driver has shut down
    #[error("connection closed")]
    Closed,
}

impl Error {
    /// Build an [`Error::Http`] from its parts
    pub fn http(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Error::Http {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// HTTP status code, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = Error::http(500, "http://localhost/state", "boom");
        assert_eq!(err.to_string(), "500 http://localhost/state boom");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_status_absent_for_non_http() {
        assert_eq!(Error::Closed.status(), None);
        assert_eq!(Error::Transport("reset".into()).status(), None);
    }
}
