//! Connection status events

use std::fmt;

use crate::subscription::SubscriptionId;

/// Which asynchronous operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Label announcement (control call)
    Announce,
    /// Snapshot fetch for a subscription
    Snapshot {
        /// Subscription the fetch belonged to
        subscription: SubscriptionId,
    },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Announce => write!(f, "announce"),
            FailureKind::Snapshot { subscription } => write!(f, "snapshot ({})", subscription),
        }
    }
}

/// Events published on a connection's status stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// `connection_open` received; fires again after every reconnect
    Opened {
        /// Server-assigned connection id
        connection_id: String,
    },
    /// Push session dropped; the transport is reconnecting
    TransportError {
        /// Transport error message
        message: String,
    },
    /// An announcement or snapshot fetch failed
    Error {
        /// Failed operation
        kind: FailureKind,
        /// Error message
        message: String,
    },
    /// Driver stopped
    Closed,
}
