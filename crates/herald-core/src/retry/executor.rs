//! Retry execution engine
//!
//! `RetryExecutor` runs an operation up to `max_attempts` times. The
//! cooperative (`execute`) and blocking (`execute_blocking`) variants share
//! a single decision routine and differ only in how they wait between
//! attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::types::RetryPolicy;

use super::error::RetryError;
use super::observer::{NoOpObserver, RetryEvent, RetryObserver};
use super::strategies::{calculate_delay, AlwaysRetry, NeverRetry, OutcomePredicate, RetryPredicate};

/// Execute an async operation with retry logic based on a policy
///
/// Every error is retried and every returned value is accepted. For
/// status-driven retries or error classification, use `RetryExecutorBuilder`.
///
/// # Example
///
/// ```rust,no_run
/// use herald_core::retry::retry_with_policy;
/// use herald_core::types::RetryPolicy;
///
/// async fn example() {
///     let policy = RetryPolicy::default();
///
///     let result = retry_with_policy(&policy, || async {
///         Ok::<_, std::io::Error>("success")
///     }).await;
/// }
/// ```
pub async fn retry_with_policy<F, Fut, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryExecutorBuilder::new()
        .with_policy(policy.clone())
        .build()
        .execute(op)
        .await
}

/// Blocking counterpart of [`retry_with_policy`]
pub fn retry_blocking_with_policy<F, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    RetryExecutorBuilder::new()
        .with_policy(policy.clone())
        .build()
        .execute_blocking(op)
}

/// Builder for configuring a `RetryExecutor`
///
/// # Example
///
/// ```rust
/// use herald_core::retry::{HttpStatusPredicate, RetryExecutorBuilder, TracingObserver, TransientOnly};
/// use herald_core::types::RetryPolicy;
///
/// let executor = RetryExecutorBuilder::new()
///     .with_policy(RetryPolicy::default())
///     .with_predicate(TransientOnly)
///     .with_outcome_predicate(HttpStatusPredicate::default_http())
///     .with_observer(TracingObserver::new("GET /users"))
///     .build();
/// ```
pub struct RetryExecutorBuilder<P = AlwaysRetry, R = NeverRetry, O = NoOpObserver> {
    policy: RetryPolicy,
    predicate: P,
    outcome_predicate: R,
    observer: O,
    jitter: Option<bool>,
}

impl Default for RetryExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder {
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            predicate: AlwaysRetry,
            outcome_predicate: NeverRetry,
            observer: NoOpObserver,
            jitter: None,
        }
    }
}

impl<P, R, O> RetryExecutorBuilder<P, R, O> {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the error classification
    pub fn with_predicate<P2>(self, predicate: P2) -> RetryExecutorBuilder<P2, R, O> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate,
            outcome_predicate: self.outcome_predicate,
            observer: self.observer,
            jitter: self.jitter,
        }
    }

    /// Set the classification of successfully returned values
    pub fn with_outcome_predicate<R2>(self, outcome_predicate: R2) -> RetryExecutorBuilder<P, R2, O> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate: self.predicate,
            outcome_predicate,
            observer: self.observer,
            jitter: self.jitter,
        }
    }

    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<P, R, O2> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate: self.predicate,
            outcome_predicate: self.outcome_predicate,
            observer,
            jitter: self.jitter,
        }
    }

    /// Override the policy's jitter setting
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn build(self) -> RetryExecutor<P, R, O> {
        let jitter = self.jitter.unwrap_or(self.policy.jitter);
        RetryExecutor {
            policy: self.policy,
            predicate: self.predicate,
            outcome_predicate: self.outcome_predicate,
            observer: self.observer,
            jitter,
        }
    }
}

/// What to do after an attempt
enum Step<T, E> {
    Done(Result<T, RetryError<E>>),
    Wait(Duration),
}

/// A retry executor with configurable policy, predicates and observer
///
/// Use `RetryExecutorBuilder` to create an instance. One executor can be
/// shared by any number of concurrent callers.
pub struct RetryExecutor<P, R, O> {
    policy: RetryPolicy,
    predicate: P,
    outcome_predicate: R,
    observer: O,
    jitter: bool,
}

impl<P, R, O> RetryExecutor<P, R, O>
where
    O: RetryObserver,
{
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an async operation, suspending between attempts
    pub async fn execute<F, Fut, T, E>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: RetryPredicate<E>,
        R: OutcomePredicate<T>,
    {
        let start = Instant::now();

        for attempt in 1..=self.policy.max_attempts {
            self.observer.observe(RetryEvent::Attempt {
                attempt,
                max_attempts: self.policy.max_attempts,
            });

            match self.assess(attempt, op().await, start) {
                Step::Done(result) => return result,
                Step::Wait(delay) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        self.no_attempts()
    }

    /// Execute a blocking operation, sleeping the calling thread between attempts
    pub fn execute_blocking<F, T, E>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Display,
        P: RetryPredicate<E>,
        R: OutcomePredicate<T>,
    {
        let start = Instant::now();

        for attempt in 1..=self.policy.max_attempts {
            self.observer.observe(RetryEvent::Attempt {
                attempt,
                max_attempts: self.policy.max_attempts,
            });

            match self.assess(attempt, op(), start) {
                Step::Done(result) => return result,
                Step::Wait(delay) => {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        self.no_attempts()
    }

    /// Classify one attempt's outcome
    ///
    /// The final attempt is always handed back as-is: a retryable value is
    /// returned and a retryable error becomes `Exhausted` with the error
    /// unchanged.
    fn assess<T, E>(&self, attempt: u32, outcome: Result<T, E>, start: Instant) -> Step<T, E>
    where
        E: Display,
        P: RetryPredicate<E>,
        R: OutcomePredicate<T>,
    {
        let is_final = attempt >= self.policy.max_attempts;

        match outcome {
            Ok(value) => {
                if !is_final && self.outcome_predicate.should_retry_outcome(&value) {
                    let delay = calculate_delay(&self.policy, attempt, self.jitter);
                    let reason = self.outcome_predicate.describe(&value);
                    self.observer.observe(RetryEvent::Retrying {
                        attempt,
                        reason: &reason,
                        delay,
                    });
                    return Step::Wait(delay);
                }

                self.observer.observe(RetryEvent::Succeeded {
                    attempt,
                    elapsed: start.elapsed(),
                });
                Step::Done(Ok(value))
            }
            Err(err) => {
                if !self.predicate.should_retry(&err) {
                    self.observer.observe(RetryEvent::GaveUp {
                        attempt,
                        error: Some(&err as &dyn Display),
                    });
                    return Step::Done(Err(RetryError::non_retryable(err)));
                }

                if is_final {
                    self.observer.observe(RetryEvent::Exhausted {
                        attempts: attempt,
                        error: &err,
                    });
                    return Step::Done(Err(RetryError::exhausted(attempt, err, start.elapsed())));
                }

                let delay = calculate_delay(&self.policy, attempt, self.jitter);
                self.observer.observe(RetryEvent::Retrying {
                    attempt,
                    reason: &err,
                    delay,
                });
                Step::Wait(delay)
            }
        }
    }

    fn no_attempts<T, E>(&self) -> Result<T, RetryError<E>> {
        self.observer.observe(RetryEvent::GaveUp {
            attempt: 0,
            error: None,
        });
        Err(RetryError::Cancelled)
    }
}
