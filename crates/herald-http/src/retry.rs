//! Retry preset for HTTP lifecycles

use herald_core::retry::{
    HttpStatusPredicate, RetryExecutor, RetryExecutorBuilder, TracingObserver, TransientOnly,
};
use herald_core::RetryPolicy;

/// Executor type returned by [`http_retry_executor`]
pub type HttpRetryExecutor = RetryExecutor<TransientOnly, HttpStatusPredicate, TracingObserver>;

/// Retries transient send/auth failures and `policy.retryable_statuses`
///
/// Post-processing rejections and configuration faults are never retried.
pub fn http_retry_executor(policy: RetryPolicy, operation: impl Into<String>) -> HttpRetryExecutor {
    let statuses = HttpStatusPredicate::with_codes(policy.retryable_statuses.clone());
    RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_predicate(TransientOnly)
        .with_outcome_predicate(statuses)
        .with_observer(TracingObserver::new(operation))
        .build()
}
