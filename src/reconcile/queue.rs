//! Boot-time event queue
//!
//! Holds events that arrive while a snapshot fetch is in flight. The queue is
//! unbounded; a warning is logged every time another `warn_threshold` events
//! have accumulated.

use std::collections::VecDeque;

use crate::protocol::Event;

/// Ordered queue of events awaiting reconciliation
#[derive(Debug)]
pub struct EventQueue {
    /// Queued events in wire order
    events: VecDeque<Event>,
    /// Length at which the next growth warning fires (0 = never)
    next_warn_at: usize,
    /// Warning step
    warn_threshold: usize,
}

impl EventQueue {
    /// Create an empty queue without growth warnings
    pub fn new() -> Self {
        Self::with_warn_threshold(0)
    }

    /// Create an empty queue that warns every `warn_threshold` events
    pub fn with_warn_threshold(warn_threshold: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_warn_at: warn_threshold,
            warn_threshold,
        }
    }

    /// Append an event
    ///
    /// Returns true if this push crossed a warning threshold.
    pub fn push(&mut self, event: Event) -> bool {
        self.events.push_back(event);

        if self.warn_threshold > 0 && self.events.len() >= self.next_warn_at {
            self.next_warn_at += self.warn_threshold;
            tracing::warn!(
                queued = self.events.len(),
                "Event queue still growing while waiting for snapshot"
            );
            return true;
        }

        false
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate queued events in wire order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Take all queued events, leaving the queue empty
    pub fn take(&mut self) -> Vec<Event> {
        self.next_warn_at = self.warn_threshold;
        self.events.drain(..).collect()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
