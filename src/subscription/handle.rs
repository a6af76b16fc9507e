//! Subscription handle

use tokio::sync::mpsc;

use crate::client::driver::{request, Command};
use crate::error::Result;

use super::state::SubscriptionInfo;
use super::SubscriptionId;

/// Controls one subscription on a live connection
///
/// Cheap to clone. All operations are executed by the connection driver in
/// arrival order.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    commands: mpsc::Sender<Command>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: SubscriptionId, commands: mpsc::Sender<Command>) -> Self {
        Self { id, commands }
    }

    /// Subscription id
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop event delivery
    ///
    /// Listeners for the subscription's labels are removed; reconciler state
    /// is kept as is. An in-flight snapshot is still applied when it arrives,
    /// without rendering.
    pub async fn suspend(&self) -> Result<()> {
        let id = self.id;
        request(&self.commands, |reply| Command::Suspend { id, reply }).await?
    }

    /// Restore event delivery after [`suspend`](Self::suspend)
    ///
    /// Listeners are registered again and the label set is announced once.
    /// The resource is not re-fetched.
    pub async fn resume(&self) -> Result<()> {
        let id = self.id;
        request(&self.commands, |reply| Command::Resume { id, reply }).await?
    }

    /// Re-fetch the snapshot now
    ///
    /// Queued events are kept and reconciled against the new snapshot; any
    /// in-flight fetch is invalidated. Fails with
    /// [`Error::NoResource`](crate::Error::NoResource) if no resource is
    /// configured.
    pub async fn refresh(&self) -> Result<()> {
        let id = self.id;
        request(&self.commands, |reply| Command::Refresh { id, reply }).await?
    }

    /// Current state and counters
    pub async fn info(&self) -> Result<SubscriptionInfo> {
        let id = self.id;
        request(&self.commands, |reply| Command::SubscriptionInfo { id, reply }).await?
    }

    /// Remove the subscription from the connection
    ///
    /// Further calls on this handle fail with
    /// [`Error::UnknownSubscription`](crate::Error::UnknownSubscription).
    pub async fn close(&self) -> Result<()> {
        let id = self.id;
        request(&self.commands, |reply| Command::Unsubscribe { id, reply }).await?
    }
}
