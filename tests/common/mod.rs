#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing_subscriber::EnvFilter;

use topic_sync::client::ClientEvent;
use topic_sync::control::ControlApi;
use topic_sync::protocol::{AnnounceRequest, Snapshot};
use topic_sync::{ChannelTransport, ClientConfig, Error, EventingClient, Result, TransportFeed};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Scripted snapshot outcome: body or HTTP status
pub type Outcome = std::result::Result<Value, u16>;

enum Reply {
    Now(Outcome),
    Held(oneshot::Receiver<Outcome>),
}

#[derive(Default)]
struct Inner {
    announces: Mutex<Vec<AnnounceRequest>>,
    fetches: Mutex<Vec<String>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    fail_announces: AtomicBool,
}

/// In-memory control surface recording every call
#[derive(Clone, Default)]
pub struct FakeControl {
    inner: Arc<Inner>,
}

impl FakeControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an immediate reply for the next fetch of `uri`
    pub fn reply_snapshot(&self, uri: &str, outcome: Outcome) {
        self.push_reply(uri, Reply::Now(outcome));
    }

    /// Queue a reply for the next fetch of `uri` that completes when the
    /// returned sender fires
    pub fn hold_snapshot(&self, uri: &str) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.push_reply(uri, Reply::Held(rx));
        tx
    }

    pub fn fail_announces(&self, fail: bool) {
        self.inner.fail_announces.store(fail, Ordering::SeqCst);
    }

    pub fn announces(&self) -> Vec<AnnounceRequest> {
        self.inner.announces.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.inner.fetches.lock().unwrap().clone()
    }

    fn push_reply(&self, uri: &str, reply: Reply) {
        self.inner
            .replies
            .lock()
            .unwrap()
            .entry(uri.to_string())
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, uri: &str) -> Option<Reply> {
        self.inner.fetches.lock().unwrap().push(uri.to_string());
        self.inner
            .replies
            .lock()
            .unwrap()
            .get_mut(uri)
            .and_then(VecDeque::pop_front)
    }

    fn record_announce(&self, request: AnnounceRequest) -> bool {
        self.inner.announces.lock().unwrap().push(request);
        self.inner.fail_announces.load(Ordering::SeqCst)
    }
}

impl ControlApi for FakeControl {
    async fn announce(&self, request: AnnounceRequest) -> Result<()> {
        if self.record_announce(request) {
            return Err(Error::http(503, "/subscribe", "scripted"));
        }
        Ok(())
    }

    async fn fetch_snapshot(&self, uri: &str) -> Result<Snapshot> {
        let outcome = match self.next_reply(uri) {
            Some(Reply::Now(outcome)) => outcome,
            Some(Reply::Held(gate)) => gate.await.unwrap_or(Err(503)),
            None => Err(404),
        };

        outcome
            .map(Snapshot::from_value)
            .map_err(|status| Error::http(status, uri, "scripted"))
    }
}

pub type TestClient = EventingClient<ChannelTransport, FakeControl>;

pub fn test_client(config: ClientConfig) -> (TestClient, TransportFeed, FakeControl) {
    init_tracing();
    let (transport, feed) = ChannelTransport::new();
    let control = FakeControl::new();
    let client = EventingClient::new(config, transport, control.clone());
    (client, feed, control)
}

pub fn default_config() -> ClientConfig {
    ClientConfig::new("http://events.test/")
}

/// Poll `check` until it holds; panics after a few seconds
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(polled.is_ok(), "condition not reached in time");
}

/// Next status event matching `pred`, skipping others
pub async fn next_status<P>(status: &mut broadcast::Receiver<ClientEvent>, mut pred: P) -> ClientEvent
where
    P: FnMut(&ClientEvent) -> bool,
{
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match status.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("status channel closed"),
            }
        }
    })
    .await;

    found.expect("status event not received in time")
}
