//! Blocking API client

use super::ClientCore;
use crate::error::{ClientError, Result};
use crate::request::{Method, RequestOptions};
use crate::response::ApiResponse;
use crate::transport::HttpTransport;
use herald_core::retry::{OutcomePredicate, RetryError, RetryExecutor, RetryObserver, RetryPredicate};
use herald_core::Authenticator;
use std::sync::Arc;
use std::time::Instant;

/// Blocking client over any [`HttpTransport`]
///
/// Safe to share between threads; each thread's last exchange is recorded
/// separately.
pub struct ApiClient<T> {
    core: ClientCore,
    transport: T,
}

impl<T: HttpTransport> ApiClient<T> {
    pub(crate) fn from_parts(core: ClientCore, transport: T) -> Self {
        Self { core, transport }
    }

    /// Run the full lifecycle for one request
    pub fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let mut request = self.core.prepare(method, endpoint, options)?;

        if let Some(auth) = self.core.auth() {
            auth.apply(&mut request.headers)?;
        }

        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let start = Instant::now();
        let raw = self.transport.send(&request, self.core.timeout())?;
        let elapsed = start.elapsed();

        self.core.finish(request, raw, elapsed)
    }

    pub fn get(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Get, endpoint, options)
    }

    pub fn post(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Post, endpoint, options)
    }

    pub fn put(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Put, endpoint, options)
    }

    pub fn patch(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Patch, endpoint, options)
    }

    pub fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Delete, endpoint, options)
    }

    /// Run the lifecycle under a retry executor; every attempt starts at prepare
    pub fn request_with_retry<P, R, O>(
        &self,
        executor: &RetryExecutor<P, R, O>,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> std::result::Result<ApiResponse, RetryError<ClientError>>
    where
        P: RetryPredicate<ClientError>,
        R: OutcomePredicate<ApiResponse>,
        O: RetryObserver,
    {
        executor.execute_blocking(move || self.request(method, endpoint, options.clone()))
    }

    /// Replace the authenticator; `None` sends requests unauthenticated
    pub fn set_auth(&mut self, auth: Option<Arc<dyn Authenticator>>) {
        self.core.auth = auth;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Release the transport's pooled connections
    pub fn close(&self) {
        self.transport.close();
    }
}
