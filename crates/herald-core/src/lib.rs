//! # herald-core
//!
//! Core library for the Herald API/event test harness providing:
//! - Harness configuration types and the hierarchical loader (herald.yaml)
//! - Retry execution engine with policy-based configuration
//! - Post-processing handler chain shared by HTTP and messaging results
//! - Per-task/per-thread observation store for "last call" reporting
//! - Authenticators (bearer, API key, OAuth2 client credentials)
//! - Report sinks and JSON Schema body validation

pub mod auth;
pub mod chain;
pub mod config;
pub mod error;
pub mod json_path;
pub mod observation;
pub mod report;
pub mod retry;
pub mod schema;
pub mod telemetry;
pub mod types;

pub use auth::{Authenticator, Headers};
pub use chain::{HandlerChain, HandlerError, ResultHandler, ResultView};
pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result, Transient};
pub use observation::{Observation, ObservationStore, Scope};
pub use report::{MemorySink, ReportSink};
pub use schema::{BodyValidator, CompositeValidator, SchemaValidator, ValidationOutcome};
pub use types::{HarnessConfig, RetryPolicy, RetryStrategy};
