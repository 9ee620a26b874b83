//! What the retry controller reports as it decides

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One decision point of a retried call
///
/// Reasons are `Display` so a retried value (a 503 response) is reported the
/// same way as a retried error.
#[derive(Clone, Copy)]
pub enum RetryEvent<'a> {
    /// Attempt `attempt` (1-based) is about to run
    Attempt { attempt: u32, max_attempts: u32 },
    /// The attempt will be repeated after `delay`
    Retrying {
        attempt: u32,
        reason: &'a dyn Display,
        delay: Duration,
    },
    /// A value goes back to the caller
    Succeeded { attempt: u32, elapsed: Duration },
    /// The final attempt failed with a retryable error
    Exhausted { attempts: u32, error: &'a dyn Display },
    /// A non-retryable error, or no attempt allowed at all
    GaveUp {
        attempt: u32,
        error: Option<&'a dyn Display>,
    },
}

pub trait RetryObserver: Send + Sync {
    fn observe(&self, event: RetryEvent<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn observe(&self, _: RetryEvent<'_>) {}
}

/// Logs every event; retries at WARN, exhaustion at ERROR
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    /// `operation` names the call in every log line (e.g. "GET /users")
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn observe(&self, event: RetryEvent<'_>) {
        let op = self.operation.as_str();
        match event {
            RetryEvent::Attempt {
                attempt,
                max_attempts,
            } => tracing::debug!(operation = op, attempt, max_attempts, "starting attempt"),
            RetryEvent::Retrying {
                attempt,
                reason,
                delay,
            } => tracing::warn!(
                operation = op,
                attempt,
                reason = %reason,
                delay_ms = delay.as_millis() as u64,
                "attempt failed, will retry"
            ),
            RetryEvent::Succeeded { attempt: 1, elapsed } => tracing::debug!(
                operation = op,
                elapsed_ms = elapsed.as_millis() as u64,
                "completed on first attempt"
            ),
            RetryEvent::Succeeded { attempt, elapsed } => tracing::info!(
                operation = op,
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                "completed after retry"
            ),
            RetryEvent::Exhausted { attempts, error } => tracing::error!(
                operation = op,
                attempts,
                error = %error,
                "all retry attempts exhausted"
            ),
            RetryEvent::GaveUp {
                attempt,
                error: Some(error),
            } => tracing::warn!(operation = op, attempt, error = %error, "not retrying"),
            RetryEvent::GaveUp { error: None, .. } => {
                tracing::warn!(operation = op, "policy allows no attempts")
            }
        }
    }
}

/// Counts events per kind; handy in tests
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    failures: AtomicU32,
    successes: AtomicU32,
    exhaustions: AtomicU32,
    cancellations: AtomicU32,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Attempts that were followed by a retry
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn observe(&self, event: RetryEvent<'_>) {
        let counter = match event {
            RetryEvent::Attempt { .. } => &self.attempt_starts,
            RetryEvent::Retrying { .. } => &self.failures,
            RetryEvent::Succeeded { .. } => &self.successes,
            RetryEvent::Exhausted { .. } => &self.exhaustions,
            RetryEvent::GaveUp { .. } => &self.cancellations,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Arc<T> {
    fn observe(&self, event: RetryEvent<'_>) {
        (**self).observe(event)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn observe(&self, event: RetryEvent<'_>) {
        (**self).observe(event)
    }
}
