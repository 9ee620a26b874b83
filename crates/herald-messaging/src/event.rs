//! Event models for publish and consume lifecycles

use herald_core::{Headers, ResultView};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const TIMESTAMP_HEADER: &str = "timestamp";
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// An event ready to publish
///
/// # Example
///
/// ```rust
/// use herald_messaging::OutboundEvent;
/// use serde_json::json;
///
/// let event = OutboundEvent::new("user-events")
///     .key("user-7")
///     .body(json!({"type": "UserCreated", "id": 7}))
///     .header("source", "signup");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    /// Empty means "use the producer's default topic"
    pub topic: String,
    pub key: Option<String>,
    pub body: Value,
    pub headers: Headers,
    /// Overrides `key` for partition selection
    pub partition_key: Option<String>,
    pub content_type: String,
}

impl Default for OutboundEvent {
    fn default() -> Self {
        Self {
            topic: String::new(),
            key: None,
            body: Value::Object(Default::default()),
            headers: Headers::new(),
            partition_key: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl OutboundEvent {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Key used for partition selection
    pub fn routing_key(&self) -> Option<&str> {
        self.partition_key.as_deref().or(self.key.as_deref())
    }
}

/// How a transport answered a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Accepted { partition: Option<u32>, offset: Option<u64> },
    /// The broker refused the event; not a transport fault
    Rejected { reason: String },
}

/// Outcome of one publish lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub success: bool,
    pub topic: String,
    pub partition: Option<u32>,
    pub offset: Option<u64>,
    /// Time spent in transport-send only
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub error: Option<String>,
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64() * 1000.0)
}

impl PublishResult {
    pub fn from_delivery(topic: impl Into<String>, delivery: Delivery, elapsed: Duration) -> Self {
        let topic = topic.into();
        match delivery {
            Delivery::Accepted { partition, offset } => Self {
                success: true,
                topic,
                partition,
                offset,
                elapsed,
                error: None,
            },
            Delivery::Rejected { reason } => Self {
                success: false,
                topic,
                partition: None,
                offset: None,
                elapsed,
                error: Some(reason),
            },
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

impl ResultView for PublishResult {
    fn status_code(&self) -> Option<u16> {
        None
    }

    fn json_body(&self) -> Option<&Value> {
        None
    }

    fn body_len(&self) -> usize {
        0
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// A message as the broker delivered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: Headers,
    pub partition: Option<u32>,
    pub offset: Option<u64>,
    pub timestamp_ms: Option<i64>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            payload: payload.into(),
            headers: Headers::new(),
            partition: None,
            offset: None,
            timestamp_ms: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A consumed message, normalized
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedEvent {
    pub topic: String,
    pub key: Option<String>,
    /// Parsed payload, when the payload is JSON
    pub body: Option<Value>,
    pub raw_body: Vec<u8>,
    pub headers: Headers,
    pub partition: Option<u32>,
    pub offset: Option<u64>,
    pub timestamp_ms: Option<i64>,
}

impl ConsumedEvent {
    pub fn from_raw(raw: RawMessage) -> Self {
        let body = serde_json::from_slice(&raw.payload).ok();
        Self {
            topic: raw.topic,
            key: raw.key,
            body,
            raw_body: raw.payload,
            headers: raw.headers,
            partition: raw.partition,
            offset: raw.offset,
            timestamp_ms: raw.timestamp_ms,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw_body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
