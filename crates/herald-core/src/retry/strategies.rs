//! Retry delay strategies and classification predicates
//!
//! Two independent classifications drive the retry decision:
//! [`RetryPredicate`] looks at errors raised by an attempt, and
//! [`OutcomePredicate`] looks at values an attempt returned successfully
//! (for example an HTTP response carrying a 503).

use crate::error::Transient;
use crate::types::{RetryPolicy, RetryStrategy};
use rand::Rng;
use std::time::Duration;

/// Wait after a failed attempt, capped at `max_delay_ms` when one is set
///
/// `attempt` is the 1-indexed number of the attempt that just failed, so
/// the wait before attempt `k` is `calculate_delay(policy, k - 1, ..)`.
///
/// # Example
///
/// ```rust
/// use herald_core::retry::calculate_delay;
/// use herald_core::types::{RetryPolicy, RetryStrategy};
///
/// let policy = RetryPolicy {
///     strategy: RetryStrategy::ExponentialBackoff,
///     backoff_multiplier: 2.0,
///     initial_delay_ms: 1000,
///     ..RetryPolicy::default()
/// };
///
/// assert_eq!(calculate_delay(&policy, 1, false).as_millis(), 1000);
/// assert_eq!(calculate_delay(&policy, 2, false).as_millis(), 2000);
/// ```
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32, jitter: bool) -> Duration {
    let steps = attempt.saturating_sub(1);

    let delay_ms = match policy.strategy {
        RetryStrategy::None => 0,

        RetryStrategy::FixedDelay => policy.initial_delay_ms,

        RetryStrategy::ExponentialBackoff => {
            (policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(steps as i32)) as u64
        }

        RetryStrategy::LinearBackoff => {
            policy.initial_delay_ms.saturating_mul(steps as u64 + 1)
        }
    };

    let capped = policy.max_delay_ms.map_or(delay_ms, |max| delay_ms.min(max));

    // up to 25% on top of the capped delay
    if jitter && capped > 0 {
        Duration::from_millis(capped.saturating_add(rand::rng().random_range(0..=capped / 4)))
    } else {
        Duration::from_millis(capped)
    }
}

/// Classifies errors raised by an attempt
///
/// ```rust
/// use herald_core::retry::RetryPredicate;
///
/// /// Retry only failures the token endpoint reports as 5xx
/// struct TokenOutage;
///
/// impl RetryPredicate<u16> for TokenOutage {
///     fn should_retry(&self, status: &u16) -> bool {
///         (500..600).contains(status)
///     }
/// }
///
/// assert!(TokenOutage.should_retry(&503));
/// assert!(!TokenOutage.should_retry(&401));
/// ```
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    fn should_retry(&self, error: &E) -> bool;
}

/// Classifies values an attempt returned without error
pub trait OutcomePredicate<T: ?Sized>: Send + Sync {
    fn should_retry_outcome(&self, value: &T) -> bool;

    /// Short reason reported to observers when a value is retried
    fn describe(&self, _value: &T) -> String {
        "retryable outcome".to_string()
    }
}

/// All errors are retryable
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// Nothing is retryable
///
/// As an outcome predicate this accepts every returned value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

impl<T: ?Sized> OutcomePredicate<T> for NeverRetry {
    fn should_retry_outcome(&self, _value: &T) -> bool {
        false
    }
}

/// Retries only errors that classify themselves as transient
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientOnly;

impl<E: Transient + ?Sized> RetryPredicate<E> for TransientOnly {
    fn should_retry(&self, error: &E) -> bool {
        error.is_transient()
    }
}

/// A predicate backed by a closure
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

impl<T, F> OutcomePredicate<T> for ClosurePredicate<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn should_retry_outcome(&self, value: &T) -> bool {
        (self.predicate)(value)
    }
}

/// Anything that carries an HTTP-style status code
pub trait HttpStatusSource {
    /// Get the status code if available
    fn status_code(&self) -> Option<u16>;
}

/// Retries values whose status code is in a configured set
#[derive(Debug, Clone)]
pub struct HttpStatusPredicate {
    retryable_codes: Vec<u16>,
}

impl HttpStatusPredicate {
    /// Retry 500, 502, 503 and 504
    pub fn default_http() -> Self {
        Self {
            retryable_codes: vec![500, 502, 503, 504],
        }
    }

    pub fn with_codes(codes: Vec<u16>) -> Self {
        Self {
            retryable_codes: codes,
        }
    }

    pub fn is_retryable_code(&self, code: u16) -> bool {
        self.retryable_codes.contains(&code)
    }
}

impl Default for HttpStatusPredicate {
    fn default() -> Self {
        Self::default_http()
    }
}

impl<T: HttpStatusSource> OutcomePredicate<T> for HttpStatusPredicate {
    fn should_retry_outcome(&self, value: &T) -> bool {
        value
            .status_code()
            .map(|code| self.is_retryable_code(code))
            .unwrap_or(false)
    }

    fn describe(&self, value: &T) -> String {
        match value.status_code() {
            Some(code) => format!("retryable status {}", code),
            None => "retryable outcome".to_string(),
        }
    }
}
