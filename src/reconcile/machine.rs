//! Reconciler state machine

use crate::protocol::{Cursor, Event};

use super::policy::DedupPolicy;
use super::queue::EventQueue;

/// Boot state, carrying the queue while a snapshot is in flight
#[derive(Debug)]
pub enum BootState {
    /// No snapshot requested yet
    Empty,
    /// Snapshot fetch in flight; arriving events are queued
    AwaitingSnapshot {
        /// Events received since the boot sequence started
        queue: EventQueue,
    },
    /// Events pass straight through to topic handlers
    Steady,
}

/// Payload-free view of [`BootState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No snapshot requested yet
    Empty,
    /// Snapshot fetch in flight
    AwaitingSnapshot,
    /// Steady-state delivery
    Steady,
}

/// What the driver must do with an event handed to the reconciler
#[derive(Debug, PartialEq)]
pub enum Step {
    /// Event queued and a boot sequence started; fetch the snapshot and
    /// report it back tagged with `generation`
    FetchSnapshot {
        /// Generation the snapshot response must carry to be accepted
        generation: u64,
    },
    /// Event queued behind an in-flight snapshot
    Queued,
    /// Deliver this event to its topic handler now
    Deliver(Event),
    /// Boot marker; nothing to deliver
    Ignored,
}

/// Outcome of applying a snapshot
#[derive(Debug, PartialEq)]
pub struct Reconciled {
    /// Queued events not subsumed by the snapshot, in wire order
    pub replay: Vec<Event>,
    /// Number of queued events dropped (subsumed or markers)
    pub discarded: usize,
}

/// Per-subscription snapshot/stream merge state machine
#[derive(Debug)]
pub struct Reconciler {
    /// Current boot state
    state: BootState,
    /// Whether a resource is configured
    has_resource: bool,
    /// Rule for discarding subsumed events
    policy: DedupPolicy,
    /// Incremented for every snapshot request and every reset; a snapshot
    /// response tagged with an older value is stale
    generation: u64,
    /// Growth warning step for the boot queue
    warn_threshold: usize,
}

impl Reconciler {
    /// Create a reconciler in the `Empty` state
    pub fn new(has_resource: bool, policy: DedupPolicy) -> Self {
        Self {
            state: BootState::Empty,
            has_resource,
            policy,
            generation: 0,
            warn_threshold: 0,
        }
    }

    /// Warn every `threshold` queued events while awaiting a snapshot
    pub fn with_warn_threshold(mut self, threshold: usize) -> Self {
        self.warn_threshold = threshold;
        self
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        match self.state {
            BootState::Empty => Phase::Empty,
            BootState::AwaitingSnapshot { .. } => Phase::AwaitingSnapshot,
            BootState::Steady => Phase::Steady,
        }
    }

    /// Current boot state
    pub fn state(&self) -> &BootState {
        &self.state
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of events waiting for the snapshot
    pub fn queued(&self) -> usize {
        match &self.state {
            BootState::AwaitingSnapshot { queue } => queue.len(),
            _ => 0,
        }
    }

    /// Whether a resource is configured
    pub fn has_resource(&self) -> bool {
        self.has_resource
    }

    /// Whether a snapshot response tagged `generation` would be accepted
    pub fn is_current(&self, generation: u64) -> bool {
        matches!(self.state, BootState::AwaitingSnapshot { .. }) && generation == self.generation
    }

    /// Feed an arriving event through the machine
    pub fn on_event(&mut self, event: Event) -> Step {
        match &mut self.state {
            BootState::Empty if self.has_resource => {
                let mut queue = EventQueue::with_warn_threshold(self.warn_threshold);
                queue.push(event);
                self.generation += 1;
                self.state = BootState::AwaitingSnapshot { queue };
                Step::FetchSnapshot {
                    generation: self.generation,
                }
            }
            BootState::Empty => {
                // Nothing to reconcile against
                self.state = BootState::Steady;
                Self::pass_through(event)
            }
            BootState::AwaitingSnapshot { queue } => {
                queue.push(event);
                Step::Queued
            }
            BootState::Steady => Self::pass_through(event),
        }
    }

    fn pass_through(event: Event) -> Step {
        if event.is_marker() {
            Step::Ignored
        } else {
            Step::Deliver(event)
        }
    }

    /// Apply a successfully fetched snapshot
    ///
    /// Returns `None` if the response is stale (another generation) or no
    /// snapshot is awaited. Otherwise the machine moves to `Steady` and the
    /// caller must run the resource handler, then replay the returned events
    /// in order.
    pub fn on_snapshot(&mut self, generation: u64, cursor: Option<&Cursor>) -> Option<Reconciled> {
        match std::mem::replace(&mut self.state, BootState::Steady) {
            BootState::AwaitingSnapshot { mut queue } if generation == self.generation => {
                let (replay, discarded) = self.policy.partition(queue.take(), cursor);
                Some(Reconciled { replay, discarded })
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Start a new boot sequence now, without waiting for an event
    ///
    /// Events already queued are kept. Any in-flight snapshot becomes stale.
    /// Returns the generation to fetch for, or `None` without a resource.
    pub fn refresh(&mut self) -> Option<u64> {
        if !self.has_resource {
            return None;
        }

        let queue = match std::mem::replace(&mut self.state, BootState::Empty) {
            BootState::AwaitingSnapshot { queue } => queue,
            _ => EventQueue::with_warn_threshold(self.warn_threshold),
        };

        self.generation += 1;
        self.state = BootState::AwaitingSnapshot { queue };
        Some(self.generation)
    }

    /// Return to `Empty`, dropping queued events and invalidating any
    /// in-flight snapshot
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = BootState::Empty;
    }
}
