//! Error types for messaging lifecycles

use crate::event::PublishResult;
use herald_core::auth::AuthError;
use herald_core::{HandlerError, Transient};
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a messaging transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker connection is gone; polling cannot continue
    #[error("broker connection lost: {0}")]
    Connection(String),

    #[error("poll failed: {0}")]
    Poll(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    #[error("send failed: {0}")]
    Send(String),

    #[error("could not deserialize message: {0}")]
    Deserialize(String),
}

impl TransportError {
    /// Connection-level faults end a poll loop; everything else is a lost cycle
    pub fn is_connection_fault(&self) -> bool {
        matches!(self, TransportError::Connection(_))
    }
}

impl Transient for TransportError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Connection(_) | TransportError::Timeout(_)
        )
    }
}

/// Failures of one publish lifecycle
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("event has no topic and no default topic is configured")]
    MissingTopic,

    #[error("producer is closed")]
    Closed,

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rejected(Box<HandlerError<PublishResult>>),
}

impl From<HandlerError<PublishResult>> for ProducerError {
    fn from(err: HandlerError<PublishResult>) -> Self {
        ProducerError::Rejected(Box::new(err))
    }
}

impl Transient for ProducerError {
    fn is_transient(&self) -> bool {
        match self {
            ProducerError::Auth(err) => err.is_transient(),
            ProducerError::Transport(err) => err.is_transient(),
            ProducerError::MissingTopic | ProducerError::Closed | ProducerError::Rejected(_) => {
                false
            }
        }
    }
}

/// Failures of a consumer
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("consumer is not connected")]
    NotConnected,

    #[error("consumer is closed")]
    Closed,

    /// A connection fault recorded during polling, or raised by connect/close
    #[error(transparent)]
    Connection(TransportError),
}
