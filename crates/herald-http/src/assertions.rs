//! Fluent assertions over [`ApiResponse`]
//!
//! Every method panics with a descriptive message on failure and returns
//! `self` otherwise, so checks chain:
//!
//! ```rust,ignore
//! assert_response(&response)
//!     .status(201)
//!     .header("content-type", Some("application/json"))
//!     .json_path("data.id", &json!(7))
//!     .elapsed_below(Duration::from_millis(500));
//! ```

use crate::response::ApiResponse;
use herald_core::{json_path, BodyValidator, SchemaValidator};
use serde_json::Value;
use std::time::Duration;

pub fn assert_response(response: &ApiResponse) -> ResponseAssertions<'_> {
    ResponseAssertions { response }
}

pub struct ResponseAssertions<'a> {
    response: &'a ApiResponse,
}

impl<'a> ResponseAssertions<'a> {
    #[track_caller]
    pub fn status(self, expected: u16) -> Self {
        assert_eq!(
            self.response.status, expected,
            "expected status {}, got {} (body: {})",
            expected,
            self.response.status,
            self.response.text()
        );
        self
    }

    #[track_caller]
    pub fn success(self) -> Self {
        assert!(
            self.response.is_success(),
            "expected a 2xx status, got {}",
            self.response.status
        );
        self
    }

    /// Header must exist and, when `value` is given, equal it
    #[track_caller]
    pub fn header(self, name: &str, value: Option<&str>) -> Self {
        let actual = self.response.header(name);
        assert!(actual.is_some(), "header '{}' not found in response", name);
        if let Some(expected) = value {
            assert_eq!(
                actual,
                Some(expected),
                "header '{}' expected '{}'",
                name,
                expected
            );
        }
        self
    }

    #[track_caller]
    fn body(&self) -> &'a Value {
        match self.response.json.as_ref() {
            Some(body) => body,
            None => panic!("response body is not JSON: {}", self.response.text()),
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
    pub fn json_path_exists(self, path: &str) -> Self {
        if let Err(e) = json_path::resolve(self.body(), path) {
            panic!("json_path '{}': {}", path, e);
        }
        self
    }

    #[track_caller]
    pub fn body_equals(self, expected: &Value) -> Self {
        assert_eq!(self.body(), expected, "response body mismatch");
        self
    }

    /// Top-level key present, optionally with a value
    #[track_caller]
    pub fn body_contains(self, key: &str, value: Option<&Value>) -> Self {
        let object = self
            .body()
            .as_object()
            .unwrap_or_else(|| panic!("response body is not a JSON object"));
        let actual = object
            .get(key)
            .unwrap_or_else(|| panic!("key '{}' not in response body", key));
        if let Some(expected) = value {
            assert_eq!(actual, expected, "body['{}'] mismatch", key);
        }
        self
    }

    #[track_caller]
    pub fn elapsed_below(self, max: Duration) -> Self {
        assert!(
            self.response.elapsed <= max,
            "response took {:.1}ms, expected <= {}ms",
            self.response.elapsed_ms(),
            max.as_millis()
        );
        self
    }

    /// Validate the body against an inline schema document
    #[track_caller]
    pub fn matches_schema(self, schema: &Value) -> Self {
        let outcome = SchemaValidator::validate_inline(schema, self.body())
            .unwrap_or_else(|e| panic!("invalid schema: {}", e));
        assert!(outcome.valid, "schema validation failed: {}", outcome);
        self
    }

    /// Validate the body against a named schema held by a validator
    #[track_caller]
    pub fn matches_named_schema(self, validator: &dyn BodyValidator, schema_name: &str) -> Self {
        let outcome = validator.validate(self.body(), schema_name);
        assert!(outcome.valid, "schema validation failed: {}", outcome);
        self
    }

    pub fn response(&self) -> &'a ApiResponse {
        self.response
    }
}
