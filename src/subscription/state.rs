//! Runtime state of a subscription
//!
//! Owned exclusively by the connection driver. Tracks the reconciler, the
//! listeners currently registered for the subscription's labels, and the
//! user callbacks.

use crate::protocol::{Event, Snapshot};
use crate::reconcile::{DedupPolicy, Phase, Reconciled, Reconciler};
use crate::registry::ListenerId;
use crate::render::{dispatch, isolate, should_render, Callback, RenderOutcome, VisibilityFlag};
use crate::stats::SubscriptionStats;

use super::config::{RenderFn, ResourceConfig, SubscriptionConfig, TopicConfig};
use super::SubscriptionId;

/// Snapshot of a subscription's state, as reported to handles
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionInfo {
    /// Subscription id
    pub id: SubscriptionId,
    /// Reconciler phase
    pub phase: Phase,
    /// Whether listeners are currently removed
    pub suspended: bool,
    /// Events waiting for a snapshot
    pub queued: usize,
    /// Reconciler generation
    pub generation: u64,
    /// Topic labels
    pub labels: Vec<String>,
    /// Counters
    pub stats: SubscriptionStats,
}

pub(crate) struct SubscriptionState {
    pub(crate) id: SubscriptionId,
    resource: Option<ResourceConfig>,
    topics: Vec<TopicConfig>,
    visibility: Option<VisibilityFlag>,
    render: Option<RenderFn>,
    pub(crate) reconciler: Reconciler,
    pub(crate) suspended: bool,
    pub(crate) listeners: Vec<ListenerId>,
    pub(crate) stats: SubscriptionStats,
}

impl SubscriptionState {
    pub(crate) fn new(
        id: SubscriptionId,
        config: SubscriptionConfig,
        policy: DedupPolicy,
        warn_threshold: usize,
    ) -> Self {
        let reconciler = Reconciler::new(config.resource.is_some(), policy)
            .with_warn_threshold(warn_threshold);

        Self {
            id,
            resource: config.resource,
            topics: config.topics,
            visibility: config.visibility,
            render: config.render,
            reconciler,
            suspended: false,
            listeners: Vec::new(),
            stats: SubscriptionStats::new(),
        }
    }

    pub(crate) fn labels(&self) -> Vec<String> {
        self.topics.iter().map(|t| t.uri.clone()).collect()
    }

    pub(crate) fn resource_uri(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.uri.as_str())
    }

    /// Hand one event to its topic handler
    pub(crate) fn deliver(&mut self, event: &Event) -> bool {
        let id = self.id;
        let Some(topic) = self.topics.iter_mut().find(|t| t.uri == event.label) else {
            tracing::warn!(
                subscription = %id,
                label = %event.label,
                "No topic handler for label"
            );
            return false;
        };

        self.stats.events_delivered += 1;
        let ok = isolate(Callback::Topic, id, || (topic.handler)(&event.payload));
        if !ok {
            self.stats.handler_failures += 1;
        }
        ok
    }

    /// Run the resource handler, then replay the surviving queued events
    pub(crate) fn apply_snapshot(&mut self, snapshot: &Snapshot, reconciled: Reconciled) {
        let id = self.id;
        self.stats.snapshots_applied += 1;
        self.stats.events_discarded += reconciled.discarded as u64;

        if let Some(resource) = self.resource.as_mut() {
            if !isolate(Callback::Resource, id, || (resource.handler)(&snapshot.body)) {
                self.stats.handler_failures += 1;
            }
        }

        tracing::debug!(
            subscription = %id,
            cursor = ?snapshot.cursor,
            replayed = reconciled.replay.len(),
            discarded = reconciled.discarded,
            "Snapshot applied"
        );

        for event in &reconciled.replay {
            self.stats.events_replayed += 1;
            self.deliver(event);
        }
    }

    /// Render once if the visibility gate allows it
    pub(crate) fn render(&mut self, page_hidden: bool) -> RenderOutcome {
        let gate_open = should_render(page_hidden, self.visibility.as_ref(), self.suspended);
        let outcome = dispatch(self.render.as_mut(), gate_open, self.id);

        match outcome {
            RenderOutcome::Rendered => self.stats.renders += 1,
            RenderOutcome::Failed => {
                self.stats.renders += 1;
                self.stats.handler_failures += 1;
            }
            RenderOutcome::Skipped => {}
        }

        outcome
    }

    pub(crate) fn can_render(&self, page_hidden: bool) -> bool {
        self.render.is_some() && should_render(page_hidden, self.visibility.as_ref(), self.suspended)
    }

    pub(crate) fn info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            id: self.id,
            phase: self.reconciler.phase(),
            suspended: self.suspended,
            queued: self.reconciler.queued(),
            generation: self.reconciler.generation(),
            labels: self.labels(),
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use crate::error::HandlerResult;
    use crate::reconcile::Step;

    type Log = Arc<Mutex<Vec<String>>>;

    fn state_with_log(with_resource: bool) -> (SubscriptionState, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let topic_log = Arc::clone(&log);
        let render_log = Arc::clone(&log);
        let mut config = SubscriptionConfig::new()
            .topic("tick", move |payload: &Value| -> HandlerResult {
                topic_log.lock().unwrap().push(format!("tick:{}", payload["cursor"]));
                Ok(())
            })
            .render(move || {
                render_log.lock().unwrap().push("render".into());
                Ok(())
            });

        if with_resource {
            let resource_log = Arc::clone(&log);
            config = config.resource("/state", move |state: &Value| -> HandlerResult {
                resource_log.lock().unwrap().push(format!("resource:{}", state["cursor"]));
                Ok(())
            });
        }

        let state = SubscriptionState::new(SubscriptionId(1), config, DedupPolicy::Ordered, 0);
        (state, log)
    }

    fn event(cursor: u64) -> Event {
        Event::new("tick", Some(cursor.into()), json!({ "cursor": cursor }))
    }

    #[test]
    fn test_resource_runs_before_replay() {
        let (mut state, log) = state_with_log(true);

        let generation = match state.reconciler.on_event(event(3)) {
            Step::FetchSnapshot { generation } => generation,
            other => panic!("unexpected {:?}", other),
        };
        state.reconciler.on_event(event(6));

        let snapshot = Snapshot::from_value(json!({"cursor": 5}));
        let reconciled = state
            .reconciler
            .on_snapshot(generation, snapshot.cursor.as_ref())
            .unwrap();
        state.apply_snapshot(&snapshot, reconciled);

        assert_eq!(*log.lock().unwrap(), vec!["resource:5", "tick:6"]);
        assert_eq!(state.stats.events_discarded, 1);
        assert_eq!(state.stats.events_replayed, 1);
        assert_eq!(state.stats.snapshots_applied, 1);
    }

    #[test]
    fn test_render_gated_by_suspension() {
        let (mut state, log) = state_with_log(false);

        assert_eq!(state.render(false), RenderOutcome::Rendered);
        state.suspended = true;
        assert_eq!(state.render(false), RenderOutcome::Skipped);
        state.suspended = false;
        assert_eq!(state.render(true), RenderOutcome::Skipped);

        assert_eq!(*log.lock().unwrap(), vec!["render"]);
        assert_eq!(state.stats.renders, 1);
    }

    #[test]
    fn test_unknown_label_not_delivered() {
        let (mut state, log) = state_with_log(false);

        let stray = Event::new("other", None, json!({}));
        assert!(!state.deliver(&stray));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failing_handler_counted() {
        let config = SubscriptionConfig::new().topic("tick", |_: &Value| -> HandlerResult {
            Err("cannot apply".into())
        });
        let mut state = SubscriptionState::new(SubscriptionId(2), config, DedupPolicy::Ordered, 0);

        assert!(!state.deliver(&event(1)));
        assert_eq!(state.stats.events_delivered, 1);
        assert_eq!(state.stats.handler_failures, 1);
    }
}
