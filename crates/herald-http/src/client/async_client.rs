//! Async API client

use super::ClientCore;
use crate::error::{ClientError, Result};
use crate::request::{Method, RequestOptions};
use crate::response::ApiResponse;
use crate::transport::AsyncHttpTransport;
use herald_core::retry::{OutcomePredicate, RetryError, RetryExecutor, RetryObserver, RetryPredicate};
use herald_core::Authenticator;
use std::sync::Arc;
use std::time::Instant;

/// Cooperative client over any [`AsyncHttpTransport`]
///
/// Runs the same lifecycle as [`super::ApiClient`]; only transport-send and
/// authentication suspend. Inside a spawned task the exchange is recorded for
/// that task; under `block_on` it is recorded for the blocked thread.
pub struct AsyncApiClient<T> {
    core: ClientCore,
    transport: T,
}

impl<T: AsyncHttpTransport> AsyncApiClient<T> {
    pub(crate) fn from_parts(core: ClientCore, transport: T) -> Self {
        Self { core, transport }
    }

    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let mut request = self.core.prepare(method, endpoint, options)?;

        if let Some(auth) = self.core.auth() {
            auth.apply_async(&mut request.headers).await?;
        }

        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let start = Instant::now();
        let raw = self.transport.send(&request, self.core.timeout()).await?;
        let elapsed = start.elapsed();

        self.core.finish(request, raw, elapsed)
    }

    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Get, endpoint, options).await
    }

    pub async fn post(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Post, endpoint, options).await
    }

    pub async fn put(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Put, endpoint, options).await
    }

    pub async fn patch(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Patch, endpoint, options).await
    }

    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Delete, endpoint, options).await
    }

    /// Retry the lifecycle; waits between attempts suspend instead of blocking
    pub async fn request_with_retry<P, R, O>(
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
        executor
            .execute(move || self.request(method, endpoint, options.clone()))
            .await
    }

    pub fn set_auth(&mut self, auth: Option<Arc<dyn Authenticator>>) {
        self.core.auth = auth;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn close(&self) {
        self.transport.close();
    }
}
