//! In-memory transport
//!
//! Lets embedders bridge any message source into a connection, and lets
//! tests script the exact wire order of opens, messages and errors.

use std::sync::Mutex;

use futures::stream;
use tokio::sync::mpsc;

use crate::protocol::{PushMessage, CONNECTION_OPEN_LABEL};

use super::{Transport, TransportEvent, TransportStream};

/// Transport fed through a [`TransportFeed`]
///
/// The first [`connect`](Transport::connect) takes the feed's receiving end;
/// later calls yield an already finished stream.
#[derive(Debug)]
pub struct ChannelTransport {
    rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
}

/// Sending side of a [`ChannelTransport`]
#[derive(Debug, Clone)]
pub struct TransportFeed {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelTransport {
    /// Create a transport and its feed
    pub fn new() -> (Self, TransportFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            TransportFeed { tx },
        )
    }
}

impl Transport for ChannelTransport {
    fn connect(&self) -> TransportStream {
        let rx = self.rx.lock().ok().and_then(|mut slot| slot.take());

        match rx {
            Some(mut rx) => Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))),
            None => {
                tracing::warn!("Channel transport already connected");
                Box::pin(stream::empty())
            }
        }
    }
}

impl TransportFeed {
    /// Push a raw transport event
    ///
    /// Returns false if the connection is gone.
    pub fn push(&self, event: TransportEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Simulate a (re)connect: transport open followed by `connection_open`
    pub fn open(&self, connection_id: &str) -> bool {
        let data = serde_json::json!({ "connectionId": connection_id }).to_string();
        self.push(TransportEvent::Open)
            && self.push(TransportEvent::Message(PushMessage::new(
                CONNECTION_OPEN_LABEL,
                data,
            )))
    }

    /// Deliver a labeled JSON message
    pub fn send(&self, label: &str, payload: serde_json::Value) -> bool {
        self.push(TransportEvent::Message(PushMessage::new(
            label,
            payload.to_string(),
        )))
    }

    /// Deliver a payload-less boot marker on `label`
    pub fn marker(&self, label: &str) -> bool {
        self.push(TransportEvent::Message(PushMessage::new(label, "null")))
    }

    /// Simulate a dropped session
    pub fn error(&self, message: &str) -> bool {
        self.push(TransportEvent::Error(message.to_string()))
    }

    /// Whether the connection has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_feed_order() {
        let (transport, feed) = ChannelTransport::new();
        let mut stream = transport.connect();

        assert!(feed.open("c1"));
        assert!(feed.send("tick", json!({"cursor": 1})));
        assert!(feed.error("reset"));
        drop(feed);

        let events: Vec<_> = stream.by_ref().collect().await;
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], TransportEvent::Open);
        assert!(matches!(
            &events[1],
            TransportEvent::Message(m) if m.label == CONNECTION_OPEN_LABEL && m.data.contains("c1")
        ));
        assert!(matches!(&events[2], TransportEvent::Message(m) if m.label == "tick"));
        assert_eq!(events[3], TransportEvent::Error("reset".into()));
    }

    #[tokio::test]
    async fn test_second_connect_is_finished() {
        let (transport, _feed) = ChannelTransport::new();
        let _first = transport.connect();
        let second: Vec<_> = transport.connect().collect().await;
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_feed_reports_closed() {
        let (transport, feed) = ChannelTransport::new();
        let stream = transport.connect();
        assert!(!feed.is_closed());
        drop(stream);
        assert!(feed.is_closed());
        assert!(!feed.send("tick", json!({})));
    }
}
