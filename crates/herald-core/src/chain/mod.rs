//! Post-processing handler chain
//!
//! An ordered list of handlers run over every result after transport-send.
//! Each handler inspects or transforms the result and passes it on, or
//! raises a terminal [`HandlerError`] that stops the remaining handlers.

mod handlers;

pub use handlers::{
    LoggingHandler, ReportAttachmentHandler, SchemaValidationHandler, StatusCheckHandler,
};

use crate::report::ReportSink;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The read-only view of a result that handlers rely on
pub trait ResultView {
    /// HTTP-style status, when the result has one
    fn status_code(&self) -> Option<u16>;

    /// Parsed JSON body, when the body is JSON
    fn json_body(&self) -> Option<&Value>;

    /// Raw body size in bytes
    fn body_len(&self) -> usize;

    /// Time spent in transport-send
    fn elapsed(&self) -> Duration;
}

/// Terminal rejection of a result, carrying the offending result
#[derive(Debug, Error)]
pub enum HandlerError<R> {
    #[error("unexpected status {status} (rejected by {handler})")]
    UnexpectedStatus {
        handler: String,
        status: u16,
        result: Box<R>,
    },

    #[error("schema validation failed (rejected by {handler}):\n{}", .errors.join("\n"))]
    SchemaViolation {
        handler: String,
        errors: Vec<String>,
        result: Box<R>,
    },

    #[error("{handler} rejected result: {message}")]
    Rejected {
        handler: String,
        message: String,
        result: Box<R>,
    },
}

impl<R> HandlerError<R> {
    pub fn unexpected_status(handler: impl Into<String>, status: u16, result: R) -> Self {
        Self::UnexpectedStatus {
            handler: handler.into(),
            status,
            result: Box::new(result),
        }
    }

    pub fn schema_violation(handler: impl Into<String>, errors: Vec<String>, result: R) -> Self {
        Self::SchemaViolation {
            handler: handler.into(),
            errors,
            result: Box::new(result),
        }
    }

    pub fn rejected(handler: impl Into<String>, message: impl Into<String>, result: R) -> Self {
        Self::Rejected {
            handler: handler.into(),
            message: message.into(),
            result: Box::new(result),
        }
    }

    /// Name of the handler that stopped the chain
    pub fn handler(&self) -> &str {
        match self {
            Self::UnexpectedStatus { handler, .. }
            | Self::SchemaViolation { handler, .. }
            | Self::Rejected { handler, .. } => handler,
        }
    }

    /// The result that was rejected
    pub fn result(&self) -> &R {
        match self {
            Self::UnexpectedStatus { result, .. }
            | Self::SchemaViolation { result, .. }
            | Self::Rejected { result, .. } => result,
        }
    }

    pub fn into_result(self) -> R {
        match self {
            Self::UnexpectedStatus { result, .. }
            | Self::SchemaViolation { result, .. }
            | Self::Rejected { result, .. } => *result,
        }
    }
}

/// One step of the chain
pub trait ResultHandler<R>: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, result: R) -> Result<R, HandlerError<R>>;
}

/// Ordered handler list; runs in insertion order and stops on the first error
pub struct HandlerChain<R> {
    handlers: Vec<Arc<dyn ResultHandler<R>>>,
}

impl<R> Clone for HandlerChain<R> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<R> Default for HandlerChain<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for HandlerChain<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<R> HandlerChain<R> {
    /// An empty chain; `run` returns its input unchanged
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn push(&mut self, handler: impl ResultHandler<R> + 'static) {
        self.handlers.push(Arc::new(handler));
    }

    pub fn push_shared(&mut self, handler: Arc<dyn ResultHandler<R>>) {
        self.handlers.push(handler);
    }

    pub fn with(mut self, handler: impl ResultHandler<R> + 'static) -> Self {
        self.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn run(&self, result: R) -> Result<R, HandlerError<R>> {
        self.handlers
            .iter()
            .try_fold(result, |result, handler| handler.process(result))
    }
}

impl<R: ResultView + 'static> HandlerChain<R> {
    /// Status check (no rejected statuses) then debug logging
    pub fn standard() -> Self {
        Self::new()
            .with(StatusCheckHandler::new(Vec::new()))
            .with(LoggingHandler::new())
    }

    /// Status check, logging, then report attachment of the body
    pub fn default_chain(sink: Arc<dyn ReportSink>) -> Self {
        Self::standard().with(ReportAttachmentHandler::new(sink))
    }
}
