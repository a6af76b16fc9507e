//! Push transports
//!
//! A transport owns the server-push session and turns it into an ordered
//! stream of [`TransportEvent`]s. Reconnecting after a drop is the
//! transport's job; the connection driver only reacts to the resulting
//! `connection_open` message.

pub mod channel;
pub mod sse;

use std::pin::Pin;

use futures::Stream;

use crate::protocol::PushMessage;

pub use channel::{ChannelTransport, TransportFeed};
pub use sse::SseTransport;

/// Lifecycle signals and messages from a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Transport-level session established (before any message)
    Open,
    /// A labeled message
    Message(PushMessage),
    /// Session dropped or failed; the transport will reconnect
    Error(String),
}

/// Stream of transport events, in wire order
pub type TransportStream = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

/// Source of a push session
pub trait Transport: Send + Sync + 'static {
    /// Start the session
    ///
    /// The stream runs until the session is given up for good; dropping it
    /// tears the session down. Must be called from within a Tokio runtime.
    fn connect(&self) -> TransportStream;
}
