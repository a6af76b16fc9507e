//! Connection driver
//!
//! One task per connection owns every piece of mutable state: the listener
//! registry, all subscriptions and their reconcilers, and the connection id.
//! It multiplexes three inputs, in priority order:
//!
//! ```text
//!   transport stream ──┐
//!   completions ───────┼──► Driver ──► handlers / render
//!   commands ──────────┘       │
//!                              └──► spawned announce / snapshot tasks
//!                                        │
//!                                        └──► completions
//! ```
//!
//! Network round-trips run in spawned tasks and report back as completions,
//! so no user callback ever runs concurrently with another.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::control::ControlApi;
use crate::error::{Error, Result};
use crate::protocol::{
    AnnounceRequest, ConnectionOpen, Event, PushMessage, Snapshot, CONNECTION_OPEN_LABEL,
};
use crate::reconcile::Step;
use crate::registry::SubscriptionRegistry;
use crate::stats::ConnectionStats;
use crate::subscription::state::{SubscriptionInfo, SubscriptionState};
use crate::subscription::{SubscriptionConfig, SubscriptionId};
use crate::transport::{TransportEvent, TransportStream};

use super::config::ClientConfig;
use super::connection::{ConnectionInfo, ConnectionState};
use super::event::{ClientEvent, FailureKind};

/// Request from a handle to the driver
pub(crate) enum Command {
    Subscribe {
        config: SubscriptionConfig,
        reply: oneshot::Sender<Result<SubscriptionId>>,
    },
    Suspend {
        id: SubscriptionId,
        reply: oneshot::Sender<Result<()>>,
    },
    Resume {
        id: SubscriptionId,
        reply: oneshot::Sender<Result<()>>,
    },
    Refresh {
        id: SubscriptionId,
        reply: oneshot::Sender<Result<()>>,
    },
    Unsubscribe {
        id: SubscriptionId,
        reply: oneshot::Sender<Result<()>>,
    },
    SubscriptionInfo {
        id: SubscriptionId,
        reply: oneshot::Sender<Result<SubscriptionInfo>>,
    },
    SetPageHidden {
        hidden: bool,
        reply: oneshot::Sender<()>,
    },
    ConnectionInfo {
        reply: oneshot::Sender<ConnectionInfo>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Send a command and wait for its reply
pub(crate) async fn request<T>(
    commands: &mpsc::Sender<Command>,
    build: impl FnOnce(oneshot::Sender<T>) -> Command,
) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    commands.send(build(tx)).await.map_err(|_| Error::Closed)?;
    rx.await.map_err(|_| Error::Closed)
}

/// Result of a spawned network round-trip
enum Completion {
    Snapshot {
        id: SubscriptionId,
        generation: u64,
        result: Result<Snapshot>,
    },
    Announced {
        connection_id: String,
        result: Result<()>,
    },
}

pub(crate) struct Driver<C: ControlApi> {
    config: Arc<ClientConfig>,
    api: Arc<C>,
    connection_id: Option<String>,
    state: ConnectionState,
    page_hidden: bool,
    registry: SubscriptionRegistry,
    subscriptions: BTreeMap<SubscriptionId, SubscriptionState>,
    next_subscription_id: u64,
    completions: mpsc::UnboundedSender<Completion>,
    status: broadcast::Sender<ClientEvent>,
    stats: ConnectionStats,
}

impl<C: ControlApi> Driver<C> {
    /// Spawn the driver task
    pub(crate) fn spawn(
        config: Arc<ClientConfig>,
        api: Arc<C>,
        transport: TransportStream,
        commands: mpsc::Receiver<Command>,
        status: broadcast::Sender<ClientEvent>,
    ) {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let driver = Self {
            config,
            api,
            connection_id: None,
            state: ConnectionState::Connecting,
            page_hidden: false,
            registry: SubscriptionRegistry::new(),
            subscriptions: BTreeMap::new(),
            next_subscription_id: 0,
            completions: completions_tx,
            status,
            stats: ConnectionStats::new(),
        };

        tokio::spawn(driver.run(transport, commands, completions_rx));
    }

    async fn run(
        mut self,
        mut transport: TransportStream,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        let mut transport_live = true;

        loop {
            tokio::select! {
                biased;

                event = transport.next(), if transport_live => match event {
                    Some(event) => self.on_transport(event),
                    None => {
                        tracing::info!("Transport finished");
                        transport_live = false;
                    }
                },

                Some(completion) = completions.recv() => self.on_completion(completion),

                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
        }

        drop(transport);
        self.state = ConnectionState::Closed;
        tracing::info!(
            connection_id = ?self.connection_id,
            state = ?self.state,
            subscriptions = self.subscriptions.len(),
            "Connection closed"
        );
        self.emit(ClientEvent::Closed);
    }

    fn emit(&self, event: ClientEvent) {
        // No receivers is fine
        let _ = self.status.send(event);
    }

    // Transport

    fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                tracing::debug!("Transport session open");
            }
            TransportEvent::Message(message) => {
                self.stats.messages_received += 1;
                if message.label == CONNECTION_OPEN_LABEL {
                    self.on_open(&message);
                } else {
                    self.route(message);
                }
            }
            TransportEvent::Error(message) => {
                self.stats.transport_errors += 1;
                if self.state == ConnectionState::Open {
                    self.state = ConnectionState::Reconnecting;
                }
                tracing::warn!(error = %message, "Transport error");
                self.emit(ClientEvent::TransportError { message });
            }
        }
    }

    fn on_open(&mut self, message: &PushMessage) {
        let open = match message
            .json()
            .and_then(|value| serde_json::from_value::<ConnectionOpen>(value).map_err(Error::from))
        {
            Ok(open) => open,
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::error!(error = %e, data = %message.data, "Invalid connection_open payload");
                return;
            }
        };

        self.stats.opens += 1;
        self.state = ConnectionState::Open;
        self.connection_id = Some(open.connection_id.clone());

        if self.stats.opens > 1 {
            tracing::info!(connection_id = %open.connection_id, "Reconnected");
        } else {
            tracing::info!(connection_id = %open.connection_id, "Connection open");
        }

        // Labels must be re-announced and snapshots re-fetched on a new id
        for subscription in self.subscriptions.values_mut() {
            if subscription.reconciler.has_resource() {
                subscription.reconciler.reset();
            }
        }

        self.announce();
        self.emit(ClientEvent::Opened {
            connection_id: open.connection_id,
        });
    }

    fn route(&mut self, message: PushMessage) {
        let targets = self.registry.route(&message.label);
        if targets.is_empty() {
            self.stats.unroutable_messages += 1;
            tracing::debug!(label = %message.label, "No listener for label");
            return;
        }

        let event = match Event::from_message(&message) {
            Ok(event) => event,
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::warn!(label = %message.label, error = %e, "Dropping undecodable message");
                return;
            }
        };

        for id in targets {
            self.on_event(id, event.clone());
        }
    }

    fn on_event(&mut self, id: SubscriptionId, event: Event) {
        let page_hidden = self.page_hidden;
        let Some(subscription) = self.subscriptions.get_mut(&id) else {
            return;
        };

        subscription.stats.events_received += 1;
        let label = event.label.clone();
        let cursor = event.cursor.clone();

        match subscription.reconciler.on_event(event) {
            Step::FetchSnapshot { generation } => {
                tracing::debug!(
                    subscription = %id,
                    label = %label,
                    cursor = ?cursor,
                    generation = generation,
                    "Boot sequence started"
                );
                self.fetch_snapshot(id, generation);
            }
            Step::Queued => {
                tracing::debug!(
                    subscription = %id,
                    label = %label,
                    cursor = ?cursor,
                    queued = subscription.reconciler.queued(),
                    "Event queued"
                );
            }
            Step::Deliver(event) => {
                subscription.deliver(&event);
                subscription.render(page_hidden);
            }
            Step::Ignored => {
                subscription.stats.markers_ignored += 1;
                tracing::debug!(subscription = %id, label = %label, "Boot marker ignored");
            }
        }
    }

    // Spawned round-trips

    fn announce(&mut self) {
        let Some(connection_id) = self.connection_id.clone() else {
            tracing::debug!("No connection id yet; announcement deferred");
            return;
        };

        let labels = self.registry.desired_labels();
        if labels.is_empty() {
            return;
        }

        self.stats.announcements += 1;
        tracing::debug!(connection_id = %connection_id, labels = ?labels, "Announcing label set");

        let request =
            AnnounceRequest::new(self.config.announce_format, connection_id.clone(), labels);
        let api = Arc::clone(&self.api);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let result = api.announce(request).await;
            let _ = completions.send(Completion::Announced {
                connection_id,
                result,
            });
        });
    }

    fn fetch_snapshot(&mut self, id: SubscriptionId, generation: u64) {
        let Some(subscription) = self.subscriptions.get_mut(&id) else {
            return;
        };
        let Some(uri) = subscription.resource_uri().map(str::to_string) else {
            return;
        };

        subscription.stats.snapshots_requested += 1;
        let api = Arc::clone(&self.api);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let result = api.fetch_snapshot(&uri).await;
            let _ = completions.send(Completion::Snapshot {
                id,
                generation,
                result,
            });
        });
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Announced {
                connection_id,
                result,
            } => match result {
                Ok(()) => tracing::debug!(connection_id = %connection_id, "Label set announced"),
                Err(e) => {
                    self.stats.announce_failures += 1;
                    self.report_failure(FailureKind::Announce, &e);
                }
            },
            Completion::Snapshot {
                id,
                generation,
                result,
            } => self.on_snapshot(id, generation, result),
        }
    }

    fn on_snapshot(&mut self, id: SubscriptionId, generation: u64, result: Result<Snapshot>) {
        let page_hidden = self.page_hidden;
        let Some(subscription) = self.subscriptions.get_mut(&id) else {
            tracing::debug!(subscription = %id, "Snapshot for closed subscription dropped");
            return;
        };

        if !subscription.reconciler.is_current(generation) {
            subscription.stats.snapshots_stale += 1;
            tracing::debug!(
                subscription = %id,
                generation = generation,
                current = subscription.reconciler.generation(),
                "Stale snapshot dropped"
            );
            return;
        }

        match result {
            Ok(snapshot) => {
                if let Some(reconciled) = subscription
                    .reconciler
                    .on_snapshot(generation, snapshot.cursor.as_ref())
                {
                    subscription.apply_snapshot(&snapshot, reconciled);
                    subscription.render(page_hidden);
                }
            }
            Err(e) => {
                // Stays awaiting; refresh or reconnect retries
                subscription.stats.snapshots_failed += 1;
                self.report_failure(FailureKind::Snapshot { subscription: id }, &e);
            }
        }
    }

    fn report_failure(&self, kind: FailureKind, error: &Error) {
        tracing::error!(kind = %kind, error = %error, "Request failed");
        self.emit(ClientEvent::Error {
            kind,
            message: error.to_string(),
        });
    }

    // Commands

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Subscribe { config, reply } => {
                let _ = reply.send(self.subscribe(config));
            }
            Command::Suspend { id, reply } => {
                let _ = reply.send(self.suspend(id));
            }
            Command::Resume { id, reply } => {
                let _ = reply.send(self.resume(id));
            }
            Command::Refresh { id, reply } => {
                let _ = reply.send(self.refresh(id));
            }
            Command::Unsubscribe { id, reply } => {
                let _ = reply.send(self.unsubscribe(id));
            }
            Command::SubscriptionInfo { id, reply } => {
                let info = self
                    .subscriptions
                    .get(&id)
                    .map(SubscriptionState::info)
                    .ok_or(Error::UnknownSubscription(id));
                let _ = reply.send(info);
            }
            Command::SetPageHidden { hidden, reply } => {
                self.set_page_hidden(hidden);
                let _ = reply.send(());
            }
            Command::ConnectionInfo { reply } => {
                let _ = reply.send(self.info());
            }
            // Handled by the run loop
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn subscribe(&mut self, config: SubscriptionConfig) -> Result<SubscriptionId> {
        config.validate()?;

        self.next_subscription_id += 1;
        let id = SubscriptionId(self.next_subscription_id);
        let mut subscription = SubscriptionState::new(
            id,
            config,
            self.config.dedup_policy,
            self.config.queue_warn_threshold,
        );

        for label in subscription.labels() {
            let listener = self.registry.register(&label, id)?;
            subscription.listeners.push(listener);
        }

        tracing::info!(
            subscription = %id,
            labels = ?subscription.labels(),
            resource = ?subscription.resource_uri(),
            "Subscribed"
        );

        self.subscriptions.insert(id, subscription);
        self.announce();
        Ok(id)
    }

    fn suspend(&mut self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(&id)
            .ok_or(Error::UnknownSubscription(id))?;

        if subscription.suspended {
            return Ok(());
        }

        for listener in subscription.listeners.drain(..) {
            if let Err(e) = self.registry.unregister(listener) {
                tracing::warn!(subscription = %id, error = %e, "Listener already gone");
            }
        }
        subscription.suspended = true;

        tracing::info!(subscription = %id, phase = ?subscription.reconciler.phase(), "Suspended");
        Ok(())
    }

    fn resume(&mut self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(&id)
            .ok_or(Error::UnknownSubscription(id))?;

        if !subscription.suspended {
            return Ok(());
        }

        for label in subscription.labels() {
            let listener = self.registry.register(&label, id)?;
            subscription.listeners.push(listener);
        }
        subscription.suspended = false;

        tracing::info!(subscription = %id, phase = ?subscription.reconciler.phase(), "Resumed");
        self.announce();
        Ok(())
    }

    fn refresh(&mut self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .get_mut(&id)
            .ok_or(Error::UnknownSubscription(id))?;

        let generation = subscription.reconciler.refresh().ok_or(Error::NoResource(id))?;
        tracing::info!(
            subscription = %id,
            generation = generation,
            queued = subscription.reconciler.queued(),
            "Refreshing snapshot"
        );

        self.fetch_snapshot(id, generation);
        Ok(())
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .remove(&id)
            .ok_or(Error::UnknownSubscription(id))?;

        let removed = self.registry.unregister_subscription(id);
        tracing::info!(
            subscription = %id,
            listeners = removed,
            dropped = subscription.reconciler.queued(),
            "Unsubscribed"
        );
        Ok(())
    }

    fn set_page_hidden(&mut self, hidden: bool) {
        let was_hidden = self.page_hidden;
        self.page_hidden = hidden;

        if !(was_hidden && !hidden) {
            return;
        }

        let mut rendered = 0;
        for subscription in self.subscriptions.values_mut() {
            if subscription.can_render(false) {
                subscription.render(false);
                rendered += 1;
            }
        }
        tracing::debug!(rendered = rendered, "Page visible; re-rendered subscriptions");
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            connection_id: self.connection_id.clone(),
            state: self.state,
            labels: self.registry.desired_labels(),
            subscriptions: self.subscriptions.len(),
            page_hidden: self.page_hidden,
            stats: self.stats.clone(),
        }
    }
}
