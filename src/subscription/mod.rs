//! Subscriptions
//!
//! A subscription groups one optional resource (snapshot endpoint) with one
//! or more topics, an optional visibility flag and an optional render
//! callback. Client code describes it with a [`SubscriptionConfig`], hands it
//! to [`Connection::subscribe`](crate::client::Connection::subscribe), and
//! controls it afterwards through the returned [`SubscriptionHandle`].

pub mod config;
pub mod handle;
pub(crate) mod state;

use std::fmt;

pub use config::{
    RenderFn, ResourceConfig, ResourceHandler, SubscriptionConfig, TopicConfig, TopicHandler,
};
pub use handle::SubscriptionHandle;
pub use state::SubscriptionInfo;

/// Identifier of a subscription within one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
