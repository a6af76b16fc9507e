//! Outbound control calls
//!
//! Two calls leave the client besides the push stream itself: the label
//! announcement for a connection, and the snapshot fetch for a resource.
//! [`ControlApi`] abstracts both so the connection driver can be run against
//! an HTTP server ([`HttpControl`]) or an in-process fake.

pub mod http;

use std::future::Future;

use crate::error::Result;
use crate::protocol::{AnnounceRequest, Snapshot};

pub use http::HttpControl;

/// Server control surface
pub trait ControlApi: Send + Sync + 'static {
    /// Tell the server which labels to push on a connection
    ///
    /// Always carries the full desired label set.
    fn announce(&self, request: AnnounceRequest) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the current state of a resource
    fn fetch_snapshot(&self, uri: &str) -> impl Future<Output = Result<Snapshot>> + Send;
}
