//! Protocol constants

/// Reserved label signalling a (re)connect; payload is `{"connectionId": "..."}`
pub const CONNECTION_OPEN_LABEL: &str = "connection_open";

/// Label used by server-sent events without an explicit `event:` field
pub const DEFAULT_MESSAGE_LABEL: &str = "message";

/// Default path (relative to the base URL) of the push stream endpoint
pub const DEFAULT_CONNECTION_PATH: &str = "connection";

/// Default path (relative to the base URL) of the announcement endpoint
pub const DEFAULT_SUBSCRIBE_PATH: &str = "subscribe";

/// Payload fields consulted for a cursor, in order of preference
///
/// `cursor` is the canonical name; `_timeLineIndex` and `_id` are accepted
/// from older servers.
pub const CURSOR_FIELDS: &[&str] = &["cursor", "_timeLineIndex", "_id"];
