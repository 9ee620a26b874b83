//! Built-in handlers

use super::{HandlerError, ResultHandler, ResultView};
use crate::error::Result;
use crate::report::{attach_best_effort, ReportSink, CONTENT_TYPE_JSON};
use crate::schema::{BodyValidator, SchemaValidator};
use serde_json::Value;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Rejects results whose status falls in any configured range
///
/// With no ranges configured this is a pass-through.
#[derive(Debug, Clone, Default)]
pub struct StatusCheckHandler {
    rejected: Vec<RangeInclusive<u16>>,
}

impl StatusCheckHandler {
    pub fn new(statuses: Vec<u16>) -> Self {
        Self {
            rejected: statuses.into_iter().map(|s| s..=s).collect(),
        }
    }

    /// Reject every 5xx status
    pub fn server_errors() -> Self {
        Self {
            rejected: vec![500..=599],
        }
    }

    pub fn with_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.rejected.push(range);
        self
    }

    pub fn rejects(&self, status: u16) -> bool {
        self.rejected.iter().any(|r| r.contains(&status))
    }
}

impl<R: ResultView> ResultHandler<R> for StatusCheckHandler {
    fn name(&self) -> &str {
        "status-check"
    }

    fn process(&self, result: R) -> std::result::Result<R, HandlerError<R>> {
        match result.status_code() {
            Some(status) if self.rejects(status) => {
                Err(HandlerError::unexpected_status("status-check", status, result))
            }
            _ => Ok(result),
        }
    }
}

/// Validates the JSON body against a schema, when one is configured
///
/// Results without a JSON body pass through untouched.
#[derive(Clone, Default)]
pub struct SchemaValidationHandler {
    target: Option<(Arc<dyn BodyValidator>, String)>,
}

impl SchemaValidationHandler {
    /// A handler with no schema; always passes
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Validate against a schema document
    pub fn inline(schema: &Value) -> Result<Self> {
        let mut validator = SchemaValidator::new();
        validator.register("inline", schema)?;
        Ok(Self::named(Arc::new(validator), "inline"))
    }

    /// Validate against a schema held by an external validator
    pub fn named(validator: Arc<dyn BodyValidator>, schema_name: impl Into<String>) -> Self {
        Self {
            target: Some((validator, schema_name.into())),
        }
    }
}

impl<R: ResultView> ResultHandler<R> for SchemaValidationHandler {
    fn name(&self) -> &str {
        "schema-validation"
    }

    fn process(&self, result: R) -> std::result::Result<R, HandlerError<R>> {
        let Some((validator, schema_name)) = &self.target else {
            return Ok(result);
        };
        let Some(body) = result.json_body() else {
            return Ok(result);
        };

        let outcome = validator.validate(body, schema_name);
        if outcome.valid {
            Ok(result)
        } else {
            Err(HandlerError::schema_violation(
                "schema-validation",
                outcome.errors,
                result,
            ))
        }
    }
}

/// Logs status, body size and elapsed time at DEBUG
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl LoggingHandler {
    pub fn new() -> Self {
        Self
    }
}

impl<R: ResultView> ResultHandler<R> for LoggingHandler {
    fn name(&self) -> &str {
        "logging"
    }

    fn process(&self, result: R) -> std::result::Result<R, HandlerError<R>> {
        tracing::debug!(
            status = ?result.status_code(),
            bytes = result.body_len(),
            elapsed_ms = result.elapsed().as_secs_f64() * 1000.0,
            "result received"
        );
        Ok(result)
    }
}

/// Attaches the JSON body to a report sink; sink failures are swallowed
#[derive(Clone)]
pub struct ReportAttachmentHandler {
    sink: Arc<dyn ReportSink>,
    attachment_name: String,
}

impl ReportAttachmentHandler {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            attachment_name: "Response Body".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.attachment_name = name.into();
        self
    }
}

impl<R: ResultView> ResultHandler<R> for ReportAttachmentHandler {
    fn name(&self) -> &str {
        "report-attachment"
    }

    fn process(&self, result: R) -> std::result::Result<R, HandlerError<R>> {
        if let Some(body) = result.json_body() {
            match serde_json::to_vec_pretty(body) {
                Ok(pretty) => attach_best_effort(
                    self.sink.as_ref(),
                    &self.attachment_name,
                    &pretty,
                    CONTENT_TYPE_JSON,
                ),
                Err(err) => tracing::warn!(error = %err, "could not render body for report"),
            }
        }
        Ok(result)
    }
}
