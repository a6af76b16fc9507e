//! Registry implementation
//!
//! Owned by the connection driver; all mutation happens on the driver task,
//! so no locking is needed.

use std::collections::BTreeMap;

use crate::subscription::SubscriptionId;

use super::entry::{ListenerEntry, ListenerId};
use super::error::RegistryError;

/// Maps topic labels to the subscriptions listening on them
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// Label to ordered listener list
    listeners: BTreeMap<String, Vec<ListenerEntry>>,

    /// Next listener id to hand out
    next_listener_id: u64,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `label`
    ///
    /// Returns the handle needed to remove it again. Registering the same
    /// subscription twice on one label yields two independent listeners.
    pub fn register(
        &mut self,
        label: &str,
        subscription: SubscriptionId,
    ) -> Result<ListenerId, RegistryError> {
        if label.is_empty() {
            return Err(RegistryError::EmptyLabel);
        }

        self.next_listener_id += 1;
        let id = ListenerId(self.next_listener_id);

        self.listeners
            .entry(label.to_string())
            .or_default()
            .push(ListenerEntry { id, subscription });

        tracing::debug!(
            label = label,
            listener = %id,
            subscription = %subscription,
            "Listener registered"
        );

        Ok(id)
    }

    /// Remove a listener
    ///
    /// Removal is local only; the server is not told that the label is no
    /// longer wanted.
    pub fn unregister(&mut self, id: ListenerId) -> Result<(), RegistryError> {
        let mut emptied = None;
        let mut found = false;

        for (label, entries) in self.listeners.iter_mut() {
            if let Some(pos) = entries.iter().position(|e| e.id == id) {
                entries.remove(pos);
                found = true;
                if entries.is_empty() {
                    emptied = Some(label.clone());
                }
                break;
            }
        }

        if let Some(label) = emptied {
            self.listeners.remove(&label);
        }

        if found {
            tracing::debug!(listener = %id, "Listener removed");
            Ok(())
        } else {
            Err(RegistryError::ListenerNotFound(id))
        }
    }

    /// Remove every listener belonging to `subscription`
    ///
    /// Returns the number of listeners removed.
    pub fn unregister_subscription(&mut self, subscription: SubscriptionId) -> usize {
        let mut removed = 0;

        self.listeners.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.subscription != subscription);
            removed += before - entries.len();
            !entries.is_empty()
        });

        removed
    }

    /// Subscriptions listening on `label`, in registration order
    pub fn route(&self, label: &str) -> Vec<SubscriptionId> {
        self.listeners
            .get(label)
            .map(|entries| entries.iter().map(|e| e.subscription).collect())
            .unwrap_or_default()
    }

    /// The full desired label set: every label with at least one listener
    ///
    /// Sorted, without duplicates.
    pub fn desired_labels(&self) -> Vec<String> {
        self.listeners.keys().cloned().collect()
    }

    /// Whether any listener exists for `label`
    pub fn has_label(&self, label: &str) -> bool {
        self.listeners.contains_key(label)
    }

    /// Number of distinct labels
    pub fn label_count(&self) -> usize {
        self.listeners.len()
    }

    /// Total number of listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }
}
