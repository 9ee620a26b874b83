//! Retry controller with policy-based configuration
//!
//! Wraps any zero-argument operation (an HTTP lifecycle call, a publish, or
//! any other idempotent callable) with bounded, backing-off re-attempts.
//!
//! # Features
//!
//! - Multiple retry strategies: None, Fixed, Exponential, Linear backoff
//! - Error classification via `RetryPredicate` (e.g. `TransientOnly`)
//! - Outcome classification via `OutcomePredicate` (e.g. retryable HTTP statuses)
//! - Cooperative (`execute`) and blocking (`execute_blocking`) variants that
//!   differ only in how the inter-attempt wait suspends
//! - Observable retry attempts via the `RetryObserver` trait
//!
//! # Example
//!
//! ```rust,no_run
//! use herald_core::retry::{retry_with_policy, RetryError};
//! use herald_core::types::RetryPolicy;
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     let policy = RetryPolicy::default();
//!
//!     retry_with_policy(&policy, || async {
//!         Ok("success".to_string())
//!     }).await
//! }
//! ```

mod error;
mod executor;
mod observer;
mod strategies;

pub use error::RetryError;
pub use executor::{
    retry_blocking_with_policy, retry_with_policy, RetryExecutor, RetryExecutorBuilder,
};
pub use observer::{NoOpObserver, RetryEvent, RetryObserver, StatsObserver, TracingObserver};
pub use strategies::{
    calculate_delay, AlwaysRetry, ClosurePredicate, HttpStatusPredicate, HttpStatusSource,
    NeverRetry, OutcomePredicate, RetryPredicate, TransientOnly,
};
