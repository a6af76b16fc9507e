//! Subscription descriptor

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::error::{Error, HandlerResult, Result};
use crate::render::VisibilityFlag;

/// Receives the full snapshot body
pub type ResourceHandler = Box<dyn FnMut(&Value) -> HandlerResult + Send>;

/// Receives each event payload
pub type TopicHandler = Box<dyn FnMut(&Value) -> HandlerResult + Send>;

/// Re-renders whatever displays the subscription's data
pub type RenderFn = Box<dyn FnMut() -> HandlerResult + Send>;

/// Snapshot endpoint and its handler
pub struct ResourceConfig {
    /// URI fetched with `GET`; relative URIs resolve against the base URL
    pub uri: String,
    /// Invoked with the snapshot body
    pub handler: ResourceHandler,
}

/// Topic label and its handler
pub struct TopicConfig {
    /// Topic label
    pub uri: String,
    /// Invoked with each event payload
    pub handler: TopicHandler,
}

/// Subscription descriptor
///
/// # Example
/// ```no_run
/// use topic_sync::subscription::SubscriptionConfig;
///
/// let config = SubscriptionConfig::new()
///     .resource("/trade_executions", |state| {
///         println!("snapshot: {}", state);
///         Ok(())
///     })
///     .topic("trade_execution", |trade| {
///         println!("trade: {}", trade);
///         Ok(())
///     })
///     .render(|| Ok(()));
/// ```
#[derive(Default)]
pub struct SubscriptionConfig {
    /// Optional snapshot endpoint
    pub resource: Option<ResourceConfig>,
    /// Topics (at least one)
    pub topics: Vec<TopicConfig>,
    /// Element visibility consulted before rendering
    pub visibility: Option<VisibilityFlag>,
    /// Render callback
    pub render: Option<RenderFn>,
}

impl SubscriptionConfig {
    /// Create an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot endpoint
    pub fn resource<F>(mut self, uri: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&Value) -> HandlerResult + Send + 'static,
    {
        self.resource = Some(ResourceConfig {
            uri: uri.into(),
            handler: Box::new(handler),
        });
        self
    }

    /// Add a topic
    pub fn topic<F>(mut self, uri: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&Value) -> HandlerResult + Send + 'static,
    {
        self.topics.push(TopicConfig {
            uri: uri.into(),
            handler: Box::new(handler),
        });
        self
    }

    /// Gate rendering on an element's visibility
    pub fn visibility(mut self, flag: VisibilityFlag) -> Self {
        self.visibility = Some(flag);
        self
    }

    /// Set the render callback
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: FnMut() -> HandlerResult + Send + 'static,
    {
        self.render = Some(Box::new(render));
        self
    }

    /// Topic labels in declaration order
    pub fn labels(&self) -> Vec<String> {
        self.topics.iter().map(|t| t.uri.clone()).collect()
    }

    /// Check the descriptor
    ///
    /// Requires at least one topic, non-empty labels without duplicates, and
    /// a non-empty resource URI.
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(Error::InvalidConfig("at least one topic is required".into()));
        }

        let mut seen = HashSet::new();
        for topic in &self.topics {
            if topic.uri.is_empty() {
                return Err(Error::InvalidConfig("topic label must not be empty".into()));
            }
            if !seen.insert(topic.uri.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate topic label: {}",
                    topic.uri
                )));
            }
        }

        if let Some(resource) = &self.resource {
            if resource.uri.is_empty() {
                return Err(Error::InvalidConfig("resource uri must not be empty".into()));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for SubscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionConfig")
            .field("resource", &self.resource.as_ref().map(|r| r.uri.as_str()))
            .field("topics", &self.labels())
            .field("visibility", &self.visibility.as_ref().map(VisibilityFlag::is_visible))
            .field("render", &self.render.is_some())
            .finish()
    }
}
