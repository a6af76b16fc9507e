//! Listener entries

use std::fmt;

use crate::subscription::SubscriptionId;

/// Handle returned by [`register`](super::SubscriptionRegistry::register)
///
/// Passing it to [`unregister`](super::SubscriptionRegistry::unregister)
/// removes exactly the listener it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A single (label → subscription) registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerEntry {
    /// Listener handle
    pub id: ListenerId,
    /// Subscription the label's messages are routed to
    pub subscription: SubscriptionId,
}
