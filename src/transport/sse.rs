//! Server-sent events transport

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::{PushMessage, DEFAULT_MESSAGE_LABEL};

use super::{Transport, TransportEvent, TransportStream};

/// Push stream over `text/event-stream`
///
/// Every [`connect`](Transport::connect) spawns a session task that opens the
/// stream, forwards events, and re-opens it after `reconnect_delay` whenever
/// it ends or fails. A `retry:` field from the server replaces the delay.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: Client,
    url: Url,
    reconnect_delay: Duration,
}

impl SseTransport {
    /// Create a transport for an explicit stream URL
    pub fn new(client: Client, url: Url, reconnect_delay: Duration) -> Self {
        Self {
            client,
            url,
            reconnect_delay,
        }
    }

    /// Build from the connection config
    ///
    /// The request timeout is not applied; the stream is expected to stay
    /// open indefinitely.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(
            Client::builder().build()?,
            config.connection_url()?,
            config.reconnect_delay,
        ))
    }

    /// Stream URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for SseTransport {
    fn connect(&self) -> TransportStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(session_loop(
            self.client.clone(),
            self.url.clone(),
            self.reconnect_delay,
            tx,
        ));

        Box::pin(SessionStream { rx, task })
    }
}

/// Receiving end of a session; aborts the session task when dropped
struct SessionStream {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
    task: JoinHandle<()>,
}

impl Stream for SessionStream {
    type Item = TransportEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn session_loop(
    client: Client,
    url: Url,
    mut delay: Duration,
    tx: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        let message = match stream_once(&client, &url, &mut delay, &tx).await {
            Ok(()) => "event stream ended".to_string(),
            Err(e) => e.to_string(),
        };

        if tx.is_closed() {
            break;
        }

        tracing::warn!(url = %url, error = %message, retry_in = ?delay, "Push stream dropped");
        if tx.send(TransportEvent::Error(message)).is_err() {
            break;
        }

        tokio::time::sleep(delay).await;
        tracing::info!(url = %url, "Reconnecting push stream");
    }

    tracing::debug!(url = %url, "Push session stopped");
}

/// Run one stream session until it ends, fails, or nobody listens
async fn stream_once(
    client: &Client,
    url: &Url,
    delay: &mut Duration,
    tx: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<()> {
    let response = client
        .get(url.clone())
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::http(status.as_u16(), url.as_str(), body));
    }

    tracing::debug!(url = %url, "Push stream open");
    if tx.send(TransportEvent::Open).is_err() {
        return Ok(());
    }

    let mut events = response.bytes_stream().eventsource();
    while let Some(item) = events.next().await {
        let event = item.map_err(|e| Error::Transport(e.to_string()))?;

        if let Some(retry) = event.retry {
            *delay = retry;
        }

        let label = if event.event.is_empty() {
            DEFAULT_MESSAGE_LABEL.to_string()
        } else {
            event.event
        };

        let mut message = PushMessage::new(label, event.data);
        if !event.id.is_empty() {
            message = message.with_id(event.id);
        }

        if tx.send(TransportEvent::Message(message)).is_err() {
            return Ok(());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::protocol::CONNECTION_OPEN_LABEL;

    fn transport_for(server: &MockServer, delay: Duration) -> SseTransport {
        let config = ClientConfig::new(server.uri()).reconnect_delay(delay);
        SseTransport::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_stream_decodes_events() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: connection_open\n",
            "data: {\"connectionId\":\"c1\"}\n\n",
            "data: {\"plain\":true}\n\n",
            "event: tick\n",
            "id: 4\n",
            "data: {\"value\":1}\n\n",
        );
        Mock::given(method("GET"))
            .and(path("/connection"))
            .and(header("accept", "text/event-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let transport = transport_for(&server, Duration::from_secs(60));
        let events: Vec<_> = transport.connect().take(5).collect().await;

        assert_eq!(events[0], TransportEvent::Open);
        assert_eq!(
            events[1],
            TransportEvent::Message(PushMessage::new(
                CONNECTION_OPEN_LABEL,
                r#"{"connectionId":"c1"}"#
            ))
        );
        assert_eq!(
            events[2],
            TransportEvent::Message(PushMessage::new(DEFAULT_MESSAGE_LABEL, r#"{"plain":true}"#))
        );
        assert_eq!(
            events[3],
            TransportEvent::Message(PushMessage::new("tick", r#"{"value":1}"#).with_id("4"))
        );
        // Body exhausted: the session reports the drop before reconnecting
        assert!(matches!(events[4], TransportEvent::Error(_)));
    }

    #[tokio::test]
    async fn test_reconnects_after_drop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/connection"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("event: ping\ndata: 1\n\n", "text/event-stream"),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server, Duration::from_millis(10));
        let opens = transport
            .connect()
            .filter(|e| futures::future::ready(*e == TransportEvent::Open))
            .take(2)
            .count()
            .await;

        assert_eq!(opens, 2);
    }

    #[tokio::test]
    async fn test_http_error_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("draining"))
            .mount(&server)
            .await;

        let transport = transport_for(&server, Duration::from_secs(60));
        let first = transport.connect().next().await;

        match first {
            Some(TransportEvent::Error(message)) => {
                assert!(message.contains("503"));
                assert!(message.contains("draining"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }
}
