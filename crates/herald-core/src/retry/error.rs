//! How a retried operation ended without a value

use std::time::Duration;
use thiserror::Error;

/// Terminal outcome of a retried operation
///
/// The operation's own error is carried unchanged; [`RetryError::into_source`]
/// hands it back so callers see the same fault a single attempt would raise.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `source` is the last one
    #[error("gave up after {attempts} attempts ({total_duration:?}): {source}")]
    Exhausted {
        attempts: u32,
        source: E,
        /// Wall-clock time across attempts, waits included
        total_duration: Duration,
    },

    /// The first failure was not retryable
    #[error("not retryable: {0}")]
    NonRetryable(#[source] E),

    /// The policy allowed zero attempts
    #[error("policy allows no attempts")]
    Cancelled,
}

impl<E> RetryError<E> {
    pub fn exhausted(attempts: u32, source: E, total_duration: Duration) -> Self {
        RetryError::Exhausted {
            attempts,
            source,
            total_duration,
        }
    }

    pub fn non_retryable(source: E) -> Self {
        RetryError::NonRetryable(source)
    }

    /// Attempts actually made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::NonRetryable(_) => 1,
            RetryError::Cancelled => 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    pub fn is_non_retryable(&self) -> bool {
        matches!(self, RetryError::NonRetryable(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }

    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonRetryable(source) => Some(source),
            RetryError::Cancelled => None,
        }
    }

    /// The operation's last error; `None` only when nothing ran
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonRetryable(source) => Some(source),
            RetryError::Cancelled => None,
        }
    }
}
