//! Rules deciding which queued events a snapshot already subsumes

use crate::protocol::{Cursor, Event};

/// How queued events are matched against the snapshot cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Discard every event whose cursor is ≤ the snapshot cursor
    ///
    /// Events without a cursor cannot be positioned and are kept, unless
    /// they are boot markers.
    #[default]
    Ordered,
    /// Discard up to and including the first event whose cursor equals the
    /// snapshot cursor
    ///
    /// If no event matches exactly, nothing is discarded.
    ExactMatch,
}

impl DedupPolicy {
    /// Split the queue into events to replay (in wire order) and the number
    /// of events discarded
    ///
    /// Boot markers are always discarded. A snapshot without a cursor
    /// subsumes nothing.
    pub fn partition(self, events: Vec<Event>, snapshot: Option<&Cursor>) -> (Vec<Event>, usize) {
        let total = events.len();

        let survivors: Vec<Event> = match (self, snapshot) {
            (_, None) => events,
            (DedupPolicy::Ordered, Some(snapshot)) => events
                .into_iter()
                .filter(|e| e.cursor.as_ref().map_or(true, |c| c > snapshot))
                .collect(),
            (DedupPolicy::ExactMatch, Some(snapshot)) => {
                match events.iter().position(|e| e.cursor.as_ref() == Some(snapshot)) {
                    Some(pos) => events.into_iter().skip(pos + 1).collect(),
                    None => events,
                }
            }
        };

        let replay: Vec<Event> = survivors.into_iter().filter(|e| !e.is_marker()).collect();
        let discarded = total - replay.len();

        (replay, discarded)
    }
}
