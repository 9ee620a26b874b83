//! Response model produced by the lifecycle

use herald_core::retry::HttpStatusSource;
use herald_core::{Headers, ResultView};
use serde_json::Value;
use std::time::Duration;

/// What a transport hands back; the lifecycle turns it into an [`ApiResponse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, body: &Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body.to_string())
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: Headers,
    pub body: Vec<u8>,
    /// Parsed body, when the body is valid JSON
    pub json: Option<Value>,
    /// Time spent in transport-send only
    pub elapsed: Duration,
}

impl ApiResponse {
    pub fn from_raw(raw: RawResponse, elapsed: Duration) -> Self {
        let json = if raw.body.is_empty() {
            None
        } else {
            serde_json::from_slice(&raw.body).ok()
        };
        let headers = raw
            .headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        Self {
            status: raw.status,
            headers,
            body: raw.body,
            json,
            elapsed,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Equality of everything except the timing
    pub fn same_outcome(&self, other: &ApiResponse) -> bool {
        self.status == other.status
            && self.headers == other.headers
            && self.body == other.body
            && self.json == other.json
    }
}

impl ResultView for ApiResponse {
    fn status_code(&self) -> Option<u16> {
        Some(self.status)
    }

    fn json_body(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    fn body_len(&self) -> usize {
        self.body.len()
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl HttpStatusSource for ApiResponse {
    fn status_code(&self) -> Option<u16> {
        Some(self.status)
    }
}
