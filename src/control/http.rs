//! HTTP control client

use reqwest::{Client, Response, Url};

use crate::client::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::{AnnounceRequest, Snapshot};

use super::ControlApi;

/// [`ControlApi`] over HTTP
///
/// Announcements are `POST`ed as JSON to the subscribe endpoint; snapshots
/// are fetched with `GET`, resolving relative URIs against the base URL.
#[derive(Debug, Clone)]
pub struct HttpControl {
    client: Client,
    base: Url,
    subscribe_url: Url,
}

impl HttpControl {
    /// Build a control client from the connection config
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Self::with_client(builder.build()?, config)
    }

    /// Use an existing reqwest client
    pub fn with_client(client: Client, config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client,
            base: config.base()?,
            subscribe_url: config.subscribe_url()?,
        })
    }

    /// Resolve a resource URI against the base URL
    pub fn resolve(&self, uri: &str) -> Result<Url> {
        self.base
            .join(uri)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", uri, e)))
    }
}

impl ControlApi for HttpControl {
    async fn announce(&self, request: AnnounceRequest) -> Result<()> {
        tracing::debug!(
            url = %self.subscribe_url,
            connection_id = %request.connection_id,
            labels = request.labels().len(),
            "Announcing labels"
        );

        let response = self
            .client
            .post(self.subscribe_url.clone())
            .json(&request)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_snapshot(&self, uri: &str) -> Result<Snapshot> {
        let url = self.resolve(uri)?;
        tracing::debug!(url = %url, "Fetching snapshot");

        let response = self.client.get(url).send().await?;
        let body = ensure_success(response).await?.text().await?;
        let value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&body)?
        };

        Ok(Snapshot::from_value(value))
    }
}

/// Turn a non-2xx response into [`Error::Http`]
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(Error::http(status.as_u16(), url, body))
}
