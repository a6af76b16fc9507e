//! Eventing client
//!
//! [`EventingClient`] owns the connection configuration plus the transport
//! and control implementations, and hands out the process-wide
//! [`Connection`]. Opening is idempotent: every caller shares the same live
//! connection until it is shut down.
//!
//! # Example
//! ```no_run
//! use topic_sync::client::{ClientConfig, EventingClient};
//! use topic_sync::subscription::SubscriptionConfig;
//!
//! # async fn example() -> topic_sync::Result<()> {
//! let client = EventingClient::http(ClientConfig::new("https://events.example.com/"))?;
//! let connection = client.open().await;
//!
//! let trades = connection
//!     .subscribe(
//!         SubscriptionConfig::new()
//!             .resource("/trade_executions", |state| {
//!                 println!("snapshot: {}", state);
//!                 Ok(())
//!             })
//!             .topic("trade_execution", |trade| {
//!                 println!("trade: {}", trade);
//!                 Ok(())
//!             }),
//!     )
//!     .await?;
//!
//! trades.suspend().await?;
//! trades.resume().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub(crate) mod driver;
pub mod event;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::control::{ControlApi, HttpControl};
use crate::error::{Error, Result};
use crate::transport::{SseTransport, Transport};

pub use config::ClientConfig;
pub use connection::{Connection, ConnectionInfo, ConnectionState};
pub use event::{ClientEvent, FailureKind};

/// Entry point owning the shared connection
pub struct EventingClient<T: Transport, C: ControlApi> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    api: Arc<C>,
    live: Mutex<Option<Connection>>,
}

impl EventingClient<SseTransport, HttpControl> {
    /// Client speaking SSE and HTTP to `config.base_url`
    pub fn http(config: ClientConfig) -> Result<Self> {
        let transport = SseTransport::from_config(&config)?;
        let api = HttpControl::new(&config)?;
        Ok(Self::new(config, transport, api))
    }
}

impl<T: Transport, C: ControlApi> EventingClient<T, C> {
    /// Create a client from its parts
    pub fn new(config: ClientConfig, transport: T, api: C) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            api: Arc::new(api),
            live: Mutex::new(None),
        }
    }

    /// Get the live connection, starting one if needed
    ///
    /// Returns the existing connection while it is running; otherwise
    /// connects the transport again and starts a fresh driver with no
    /// subscriptions.
    pub async fn open(&self) -> Connection {
        let mut live = self.live.lock().await;

        if let Some(connection) = live.as_ref() {
            if !connection.is_closed() {
                return connection.clone();
            }
        }

        tracing::info!(base_url = %self.config.base_url, "Opening connection");
        let connection = Connection::spawn(
            Arc::clone(&self.config),
            self.transport.as_ref(),
            Arc::clone(&self.api),
        );
        *live = Some(connection.clone());
        connection
    }

    /// Close the live connection, if any
    pub async fn shutdown(&self) -> Result<()> {
        let Some(connection) = self.live.lock().await.take() else {
            return Ok(());
        };

        match connection.close().await {
            Ok(()) | Err(Error::Closed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Control implementation
    pub fn api(&self) -> &C {
        &self.api
    }
}
