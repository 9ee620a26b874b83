//! # herald-http
//!
//! HTTP lifecycle engine for the Herald test harness:
//! - Blocking and async API clients running prepare → authenticate → send →
//!   post-process → observe
//! - Pluggable transports with reqwest-backed defaults
//! - API version routing
//! - Per-task/per-thread record of the last exchange, for failure reports
//! - Retry preset and fluent response assertions

pub mod assertions;
pub mod client;
pub mod error;
pub mod observe;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod version;

pub use assertions::{assert_response, ResponseAssertions};
pub use client::{ApiClient, AsyncApiClient, ClientBuilder};
pub use error::{ClientError, Stage, TransportError};
pub use observe::{attach_last_exchange, clear_last_exchange, last_request, last_response};
pub use request::{FilePart, Method, OutboundRequest, RequestBody, RequestOptions};
pub use response::{ApiResponse, RawResponse};
pub use retry::{http_retry_executor, HttpRetryExecutor};
pub use transport::{AsyncHttpTransport, BlockingReqwestTransport, HttpTransport, ReqwestTransport};
pub use version::{VersionConfig, VersionRegistry};
