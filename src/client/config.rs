//! Client configuration

use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, Result};
use crate::protocol::{AnnounceFormat, DEFAULT_CONNECTION_PATH, DEFAULT_SUBSCRIBE_PATH};
use crate::reconcile::DedupPolicy;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the eventing server; relative paths resolve against it
    pub base_url: String,

    /// Path of the push stream endpoint
    pub connection_path: String,

    /// Path of the label announcement endpoint
    pub subscribe_path: String,

    /// Field name used for labels in announcements
    pub announce_format: AnnounceFormat,

    /// Delay before the push stream is re-opened after a drop
    pub reconnect_delay: Duration,

    /// Capacity of the handle-to-driver command channel (0 is treated as 1)
    pub command_capacity: usize,

    /// Capacity of the status broadcast channel (0 is treated as 1)
    pub status_capacity: usize,

    /// How queued events are matched against a snapshot cursor
    pub dedup_policy: DedupPolicy,

    /// Warn each time a boot queue grows by this many events (0 = never)
    pub queue_warn_threshold: usize,

    /// Timeout for control calls and snapshot fetches (None = no timeout)
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            connection_path: DEFAULT_CONNECTION_PATH.to_string(),
            subscribe_path: DEFAULT_SUBSCRIBE_PATH.to_string(),
            announce_format: AnnounceFormat::Topics,
            reconnect_delay: Duration::from_secs(1),
            command_capacity: 256,
            status_capacity: 64,
            dedup_policy: DedupPolicy::Ordered,
            queue_warn_threshold: 10_000,
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the push stream path
    pub fn connection_path(mut self, path: impl Into<String>) -> Self {
        self.connection_path = path.into();
        self
    }

    /// Set the announcement path
    pub fn subscribe_path(mut self, path: impl Into<String>) -> Self {
        self.subscribe_path = path.into();
        self
    }

    /// Announce labels as `eventTypes` (legacy servers)
    pub fn legacy_announce(mut self) -> Self {
        self.announce_format = AnnounceFormat::EventTypes;
        self
    }

    /// Set reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set command channel capacity (at least 1)
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Set status channel capacity (at least 1)
    pub fn status_capacity(mut self, capacity: usize) -> Self {
        self.status_capacity = capacity.max(1);
        self
    }

    /// Set dedup policy
    pub fn dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup_policy = policy;
        self
    }

    /// Set queue growth warning step
    pub fn queue_warn_threshold(mut self, threshold: usize) -> Self {
        self.queue_warn_threshold = threshold;
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Base URL, normalized to end with `/`
    pub fn base(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// Resolve a path or URI against the base URL
    pub fn resolve(&self, uri: &str) -> Result<Url> {
        self.base()?
            .join(uri)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", uri, e)))
    }

    /// URL of the push stream
    pub fn connection_url(&self) -> Result<Url> {
        self.resolve(&self.connection_path)
    }

    /// URL of the announcement endpoint
    pub fn subscribe_url(&self) -> Result<Url> {
        self.resolve(&self.subscribe_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.connection_path, "connection");
        assert_eq!(config.subscribe_path, "subscribe");
        assert_eq!(config.announce_format, AnnounceFormat::Topics);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.command_capacity, 256);
        assert_eq!(config.status_capacity, 64);
        assert_eq!(config.dedup_policy, DedupPolicy::Ordered);
        assert_eq!(config.queue_warn_threshold, 10_000);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_new_sets_base() {
        let config = ClientConfig::new("https://events.example.com/api");

        assert_eq!(config.base_url, "https://events.example.com/api");
        assert_eq!(config.connection_path, "connection");
    }

    #[test]
    fn test_endpoints_resolve_under_base_path() {
        let config = ClientConfig::new("https://events.example.com/api");

        assert_eq!(
            config.connection_url().unwrap().as_str(),
            "https://events.example.com/api/connection"
        );
        assert_eq!(
            config.subscribe_url().unwrap().as_str(),
            "https://events.example.com/api/subscribe"
        );
    }

    #[test]
    fn test_resolve_absolute_path_and_url() {
        let config = ClientConfig::new("https://events.example.com/api/");

        assert_eq!(
            config.resolve("/trade_executions").unwrap().as_str(),
            "https://events.example.com/trade_executions"
        );
        assert_eq!(
            config.resolve("http://other.host/state").unwrap().as_str(),
            "http://other.host/state"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::new("not a url");

        assert!(matches!(config.base(), Err(Error::InvalidUrl(_))));
        assert!(matches!(config.connection_url(), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_builder_legacy_announce() {
        let config = ClientConfig::default().legacy_announce();

        assert_eq!(config.announce_format, AnnounceFormat::EventTypes);
    }

    #[test]
    fn test_builder_capacities_floor() {
        let config = ClientConfig::default().command_capacity(0).status_capacity(0);

        assert_eq!(config.command_capacity, 1);
        assert_eq!(config.status_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ClientConfig::new("http://127.0.0.1:9000")
            .connection_path("events")
            .subscribe_path("events/subscribe")
            .reconnect_delay(Duration::from_millis(250))
            .dedup_policy(DedupPolicy::ExactMatch)
            .queue_warn_threshold(100)
            .request_timeout(Duration::from_secs(5));

        assert_eq!(config.connection_path, "events");
        assert_eq!(config.subscribe_path, "events/subscribe");
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.dedup_policy, DedupPolicy::ExactMatch);
        assert_eq!(config.queue_warn_threshold, 100);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(
            config.subscribe_url().unwrap().as_str(),
            "http://127.0.0.1:9000/events/subscribe"
        );
    }
}
