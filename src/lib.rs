//! topic-sync: live topic subscriptions over a server-push stream
//!
//! A client holds one push connection to an eventing server and multiplexes
//! any number of subscriptions over it. Each subscription pairs an optional
//! snapshot endpoint (the *resource*) with one or more event labels (the
//! *topics*). The first event on a subscription triggers a snapshot fetch;
//! events arriving meanwhile are queued, and once the snapshot lands the
//! queue is reconciled against the snapshot's cursor so that no event is
//! lost and none is applied twice.
//!
//! # Features
//!
//! - Server-sent events transport with automatic reconnect
//! - Full label set re-announced on every (re)connect
//! - Snapshot/stream reconciliation with stale-response protection
//! - Visibility-gated, coalesced render callbacks
//! - Callback failure isolation (errors and panics)
//!
//! # Example
//!
//! ```no_run
//! use topic_sync::{ClientConfig, EventingClient, SubscriptionConfig};
//!
//! #[tokio::main]
//! async fn main() -> topic_sync::Result<()> {
//!     let client = EventingClient::http(ClientConfig::new("http://localhost:8080/"))?;
//!     let connection = client.open().await;
//!
//!     let mut status = connection.status();
//!     tokio::spawn(async move {
//!         while let Ok(event) = status.recv().await {
//!             println!("status: {:?}", event);
//!         }
//!     });
//!
//!     connection
//!         .subscribe(
//!             SubscriptionConfig::new()
//!                 .resource("/orders", |orders| {
//!                     println!("orders: {}", orders);
//!                     Ok(())
//!                 })
//!                 .topic("order", |order| {
//!                     println!("order: {}", order);
//!                     Ok(())
//!                 })
//!                 .render(|| Ok(())),
//!         )
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     client.shutdown().await
//! }
//! ```

pub mod client;
pub mod control;
pub mod error;
pub mod protocol;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod stats;
pub mod subscription;
pub mod transport;

pub use client::{ClientConfig, ClientEvent, Connection, ConnectionInfo, EventingClient};
pub use control::{ControlApi, HttpControl};
pub use error::{Error, HandlerError, HandlerResult, Result};
pub use protocol::{Cursor, Event, Snapshot};
pub use reconcile::DedupPolicy;
pub use render::VisibilityFlag;
pub use subscription::{SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionInfo};
pub use transport::{ChannelTransport, SseTransport, Transport, TransportFeed};
