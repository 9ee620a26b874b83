//! Fluent assertions over publish results and consumed events
//!
//! ```rust,ignore
//! assert_published(&result).succeeded().topic("user-events");
//! assert_event(&event)
//!     .key("user-7")
//!     .header("type", "UserCreated")
//!     .json_path("data.id", &json!(7));
//! ```

use crate::event::{ConsumedEvent, PublishResult};
use herald_core::json_path;
use serde_json::Value;

pub fn assert_published(result: &PublishResult) -> PublishAssertions<'_> {
    PublishAssertions { result }
}

pub struct PublishAssertions<'a> {
    result: &'a PublishResult,
}

impl PublishAssertions<'_> {
    #[track_caller]
    pub fn succeeded(self) -> Self {
        assert!(
            self.result.success,
            "publish to '{}' failed: {}",
            self.result.topic,
            self.result.error.as_deref().unwrap_or("no reason given")
        );
        self
    }

    #[track_caller]
    pub fn failed(self) -> Self {
        assert!(
            !self.result.success,
            "publish to '{}' unexpectedly succeeded",
            self.result.topic
        );
        self
    }

    #[track_caller]
    pub fn topic(self, expected: &str) -> Self {
        assert_eq!(self.result.topic, expected, "published to the wrong topic");
        self
    }

    #[track_caller]
    pub fn partition(self, expected: u32) -> Self {
        assert_eq!(self.result.partition, Some(expected), "unexpected partition");
        self
    }
}

pub fn assert_event(event: &ConsumedEvent) -> EventAssertions<'_> {
    EventAssertions { event }
}

pub struct EventAssertions<'a> {
    event: &'a ConsumedEvent,
}

impl<'a> EventAssertions<'a> {
    #[track_caller]
    pub fn topic(self, expected: &str) -> Self {
        assert_eq!(self.event.topic, expected, "event came from the wrong topic");
        self
    }

    #[track_caller]
    pub fn key(self, expected: &str) -> Self {
        assert_eq!(
            self.event.key.as_deref(),
            Some(expected),
            "event key mismatch"
        );
        self
    }

    #[track_caller]
    pub fn header(self, name: &str, expected: &str) -> Self {
        assert_eq!(
            self.event.header(name),
            Some(expected),
            "event header '{}' mismatch",
            name
        );
        self
    }

    #[track_caller]
    fn body(&self) -> &'a Value {
        match self.event.body.as_ref() {
            Some(body) => body,
            None => panic!("event payload is not JSON: {}", self.event.text()),
        }
    }

    #[track_caller]
    pub fn json_path(self, path: &str, expected: &Value) -> Self {
        let actual = json_path::resolve(self.body(), path)
            .unwrap_or_else(|e| panic!("json_path '{}': {}", path, e));
        assert_eq!(actual, expected, "json_path '{}' mismatch", path);
        self
    }

    #[track_caller]
    pub fn body_equals(self, expected: &Value) -> Self {
        assert_eq!(self.body(), expected, "event body mismatch");
        self
    }
}
