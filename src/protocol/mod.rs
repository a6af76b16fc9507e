//! Wire-level types
//!
//! Labeled push messages as delivered by the transport, the events and
//! snapshots derived from them, and the body of the label announcement
//! control call.

pub mod constants;
pub mod message;

pub use constants::*;
pub use message::{
    AnnounceFormat, AnnounceRequest, ConnectionOpen, Cursor, Event, PushMessage, Snapshot,
};
