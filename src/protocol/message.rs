//! Messages, events and snapshots

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::constants::CURSOR_FIELDS;

/// Position in a topic's timeline
///
/// Snapshots and events share the same cursor domain. Numeric cursors order
/// numerically; opaque tokens order lexicographically and sort after all
/// numeric cursors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cursor {
    /// Monotonically increasing index
    Index(u64),
    /// Opaque, lexicographically ordered token (e.g. an object id)
    Token(String),
}

impl Cursor {
    /// Parse a textual cursor; all-digit strings become [`Cursor::Index`]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match text.parse::<u64>() {
            Ok(index) => Some(Cursor::Index(index)),
            Err(_) => Some(Cursor::Token(text.to_string())),
        }
    }

    /// Read a cursor from a JSON value (number or string)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Cursor::Index),
            Value::String(s) => Cursor::parse(s),
            _ => None,
        }
    }

    /// Read the cursor field of a JSON object payload
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;
        CURSOR_FIELDS
            .iter()
            .filter_map(|field| object.get(*field))
            .find_map(Cursor::from_value)
    }
}

impl From<u64> for Cursor {
    fn from(index: u64) -> Self {
        Cursor::Index(index)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Index(i) => write!(f, "{}", i),
            Cursor::Token(t) => write!(f, "{}", t),
        }
    }
}

/// A labeled message exactly as the transport delivered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    /// Routing label (SSE `event:` field)
    pub label: String,
    /// UTF-8 JSON text (SSE `data:` field)
    pub data: String,
    /// Transport-level message id (SSE `id:` field), if any
    pub id: Option<String>,
}

impl PushMessage {
    /// Create a message without a transport id
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
            id: None,
        }
    }

    /// Attach a transport-level id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parse the data field; an empty body is treated as `null`
    pub fn json(&self) -> Result<Value> {
        if self.data.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// A decoded topic event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Topic label the event was published on
    pub label: String,
    /// Timeline position, if the event carries one
    pub cursor: Option<Cursor>,
    /// Parsed payload
    pub payload: Value,
}

impl Event {
    /// Create an event
    pub fn new(label: impl Into<String>, cursor: Option<Cursor>, payload: Value) -> Self {
        Self {
            label: label.into(),
            cursor,
            payload,
        }
    }

    /// Decode a push message
    ///
    /// The cursor is taken from the payload's cursor field, falling back to
    /// the transport message id.
    pub fn from_message(message: &PushMessage) -> Result<Self> {
        let payload = message.json()?;
        let cursor = Cursor::from_payload(&payload)
            .or_else(|| message.id.as_deref().and_then(Cursor::parse));

        Ok(Self {
            label: message.label.clone(),
            cursor,
            payload,
        })
    }

    /// Whether this is a payload-less boot marker
    ///
    /// Servers emit one such event per topic right after a subscribe call.
    /// Markers start a boot sequence but are never handed to topic handlers.
    pub fn is_marker(&self) -> bool {
        self.payload.is_null()
    }
}

/// Point-in-time state returned by a resource fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Cursor of the last event folded into this snapshot
    pub cursor: Option<Cursor>,
    /// Full response body, handed to the resource handler
    pub body: Value,
}

impl Snapshot {
    /// Wrap a response body, extracting its cursor
    pub fn from_value(body: Value) -> Self {
        Self {
            cursor: Cursor::from_payload(&body),
            body,
        }
    }
}

/// Payload of the reserved `connection_open` message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOpen {
    /// Identifier assigned by the server to this push connection
    pub connection_id: String,
}

/// Field name used for the label list in the announcement body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnounceFormat {
    /// `{"connectionId": .., "topics": [..]}`
    #[default]
    Topics,
    /// `{"connectionId": .., "eventTypes": [..]}` (legacy servers)
    EventTypes,
}

/// Body of the control call announcing the desired label set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceRequest {
    /// Connection the labels apply to
    pub connection_id: String,
    /// Labels (current format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    /// Labels (legacy format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
}

impl AnnounceRequest {
    /// Build an announcement in the given format
    pub fn new(format: AnnounceFormat, connection_id: impl Into<String>, labels: Vec<String>) -> Self {
        let (topics, event_types) = match format {
            AnnounceFormat::Topics => (Some(labels), None),
            AnnounceFormat::EventTypes => (None, Some(labels)),
        };

        Self {
            connection_id: connection_id.into(),
            topics,
            event_types,
        }
    }

    /// The announced labels, regardless of format
    pub fn labels(&self) -> &[String] {
        self.topics
            .as_deref()
            .or(self.event_types.as_deref())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_parse() {
        assert_eq!(Cursor::parse("42"), Some(Cursor::Index(42)));
        assert_eq!(
            Cursor::parse("5f1d7a"),
            Some(Cursor::Token("5f1d7a".into()))
        );
        assert_eq!(Cursor::parse("  "), None);
    }

    #[test]
    fn test_cursor_ordering() {
        assert!(Cursor::Index(3) < Cursor::Index(5));
        assert!(Cursor::Token("5f00".into()) < Cursor::Token("5f01".into()));
        // Numeric cursors sort before tokens
        assert!(Cursor::Index(u64::MAX) < Cursor::Token("0a".into()));
    }

    #[test]
    fn test_cursor_field_preference() {
        let payload = json!({"_id": 9, "cursor": 4});
        assert_eq!(Cursor::from_payload(&payload), Some(Cursor::Index(4)));

        let legacy = json!({"_timeLineIndex": 7, "price": 1.5});
        assert_eq!(Cursor::from_payload(&legacy), Some(Cursor::Index(7)));

        assert_eq!(Cursor::from_payload(&json!([1, 2])), None);
        assert_eq!(Cursor::from_payload(&json!({"cursor": null})), None);
    }

    #[test]
    fn test_event_from_message() {
        let msg = PushMessage::new("tick", r#"{"cursor": 6, "value": 1}"#);
        let event = Event::from_message(&msg).unwrap();

        assert_eq!(event.label, "tick");
        assert_eq!(event.cursor, Some(Cursor::Index(6)));
        assert_eq!(event.payload["value"], 1);
        assert!(!event.is_marker());
    }

    #[test]
    fn test_event_cursor_falls_back_to_message_id() {
        let msg = PushMessage::new("tick", r#"{"value": 1}"#).with_id("12");
        let event = Event::from_message(&msg).unwrap();
        assert_eq!(event.cursor, Some(Cursor::Index(12)));
    }

    #[test]
    fn test_marker_event() {
        for data in ["null", ""] {
            let event = Event::from_message(&PushMessage::new("tick", data)).unwrap();
            assert!(event.is_marker());
            assert_eq!(event.cursor, None);
        }
    }

    #[test]
    fn test_event_invalid_json() {
        let msg = PushMessage::new("tick", "{not json");
        assert!(matches!(
            Event::from_message(&msg),
            Err(crate::error::Error::Decode(_))
        ));
    }

    #[test]
    fn test_snapshot_cursor() {
        let snapshot = Snapshot::from_value(json!({"cursor": 5, "data": [1, 2]}));
        assert_eq!(snapshot.cursor, Some(Cursor::Index(5)));

        let empty = Snapshot::from_value(json!({"schema": {}}));
        assert_eq!(empty.cursor, None);
    }

    #[test]
    fn test_announce_request_formats() {
        let labels = vec!["tick".to_string(), "zen".to_string()];

        let current = AnnounceRequest::new(AnnounceFormat::Topics, "c1", labels.clone());
        assert_eq!(
            serde_json::to_value(&current).unwrap(),
            json!({"connectionId": "c1", "topics": ["tick", "zen"]})
        );

        let legacy = AnnounceRequest::new(AnnounceFormat::EventTypes, "c1", labels.clone());
        assert_eq!(
            serde_json::to_value(&legacy).unwrap(),
            json!({"connectionId": "c1", "eventTypes": ["tick", "zen"]})
        );
        assert_eq!(legacy.labels(), labels.as_slice());
    }

    #[test]
    fn test_connection_open_payload() {
        let open: ConnectionOpen = serde_json::from_str(r#"{"connectionId": "ab12"}"#).unwrap();
        assert_eq!(open.connection_id, "ab12");
    }
}
