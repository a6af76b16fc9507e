//! Connection handle

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::control::ControlApi;
use crate::error::Result;
use crate::stats::ConnectionStats;
use crate::subscription::{SubscriptionConfig, SubscriptionHandle};
use crate::transport::Transport;

use super::config::ClientConfig;
use super::driver::{request, Command, Driver};
use super::event::ClientEvent;

/// Push session state as seen by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the first `connection_open`
    Connecting,
    /// Connection id assigned
    Open,
    /// Transport dropped; waiting for the next `connection_open`
    Reconnecting,
    /// Driver stopped
    Closed,
}

/// Snapshot of a connection's state
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    /// Current server-assigned id, if any
    pub connection_id: Option<String>,
    /// Session state
    pub state: ConnectionState,
    /// Desired label set (labels with at least one listener)
    pub labels: Vec<String>,
    /// Number of live subscriptions
    pub subscriptions: usize,
    /// Whether the page is marked hidden
    pub page_hidden: bool,
    /// Counters
    pub stats: ConnectionStats,
}

/// Handle to a running connection
///
/// Cheap to clone; every clone talks to the same driver task. The driver
/// stops on [`close`](Self::close) or
/// [`EventingClient::shutdown`](super::EventingClient::shutdown).
#[derive(Debug, Clone)]
pub struct Connection {
    commands: mpsc::Sender<Command>,
    status: broadcast::Sender<ClientEvent>,
}

impl Connection {
    /// Connect the transport and start a driver task
    pub(crate) fn spawn<T, C>(config: Arc<ClientConfig>, transport: &T, api: Arc<C>) -> Self
    where
        T: Transport,
        C: ControlApi,
    {
        let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity.max(1));
        let (status_tx, _) = broadcast::channel(config.status_capacity.max(1));

        Driver::spawn(config, api, transport.connect(), commands_rx, status_tx.clone());

        Self {
            commands: commands_tx,
            status: status_tx,
        }
    }

    /// Add a subscription
    ///
    /// Its labels are registered immediately and the full label set is
    /// announced if the connection already has an id. Fails with
    /// [`Error::InvalidConfig`](crate::Error::InvalidConfig) for an invalid
    /// descriptor.
    pub async fn subscribe(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle> {
        let id = request(&self.commands, |reply| Command::Subscribe { config, reply }).await??;
        Ok(SubscriptionHandle::new(id, self.commands.clone()))
    }

    /// Mark the page hidden or visible
    ///
    /// Going from hidden to visible re-renders every subscription whose
    /// visibility gate is open.
    pub async fn set_page_hidden(&self, hidden: bool) -> Result<()> {
        request(&self.commands, |reply| Command::SetPageHidden { hidden, reply }).await
    }

    /// Current state and counters
    pub async fn info(&self) -> Result<ConnectionInfo> {
        request(&self.commands, |reply| Command::ConnectionInfo { reply }).await
    }

    /// Session state; [`ConnectionState::Closed`] once the driver has stopped
    pub async fn state(&self) -> ConnectionState {
        match self.info().await {
            Ok(info) => info.state,
            Err(_) => ConnectionState::Closed,
        }
    }

    /// Subscribe to status events
    ///
    /// Only events emitted after this call are received.
    pub fn status(&self) -> broadcast::Receiver<ClientEvent> {
        self.status.subscribe()
    }

    /// Stop the driver and the transport session
    pub async fn close(&self) -> Result<()> {
        request(&self.commands, |reply| Command::Shutdown { reply }).await
    }

    /// Whether the driver has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
