//! Counters for connections and subscriptions
//!
//! Counters are plain integers owned by the connection driver; callers get
//! copies through the connection and subscription handles.

/// Per-subscription counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Events routed to this subscription
    pub events_received: u64,
    /// Events handed to a topic handler (live or replayed)
    pub events_delivered: u64,
    /// Events handed to a topic handler during reconciliation
    pub events_replayed: u64,
    /// Queued events dropped as subsumed by a snapshot
    pub events_discarded: u64,
    /// Boot markers seen in steady state
    pub markers_ignored: u64,
    /// Snapshot fetches issued
    pub snapshots_requested: u64,
    /// Snapshots applied
    pub snapshots_applied: u64,
    /// Snapshot fetches that failed
    pub snapshots_failed: u64,
    /// Snapshot responses dropped as stale
    pub snapshots_stale: u64,
    /// Render callbacks invoked
    pub renders: u64,
    /// Callbacks that returned an error or panicked
    pub handler_failures: u64,
}

impl SubscriptionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received but not yet delivered or discarded
    ///
    /// Markers count as handled once ignored or discarded.
    pub fn pending(&self) -> u64 {
        self.events_received
            .saturating_sub(self.events_delivered)
            .saturating_sub(self.events_discarded)
            .saturating_sub(self.markers_ignored)
    }
}

/// Connection-level counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// `connection_open` messages processed
    pub opens: u64,
    /// Transport errors reported (each usually followed by a reconnect)
    pub transport_errors: u64,
    /// Label announcements issued
    pub announcements: u64,
    /// Label announcements that failed
    pub announce_failures: u64,
    /// Messages received
    pub messages_received: u64,
    /// Messages for labels without a listener
    pub unroutable_messages: u64,
    /// Messages whose payload was not valid JSON
    pub decode_failures: u64,
}

impl ConnectionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reconnects (every open after the first)
    pub fn reconnects(&self) -> u64 {
        self.opens.saturating_sub(1)
    }
}
