//! Statistics for connections and subscriptions

pub mod metrics;

pub use metrics::{ConnectionStats, SubscriptionStats};
