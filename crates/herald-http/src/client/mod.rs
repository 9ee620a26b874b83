//! API clients
//!
//! Both clients run the same five-stage lifecycle:
//!
//! 1. prepare: base URL + version prefix + endpoint, default headers merged
//!    with per-call headers (per-call wins)
//! 2. authenticate: the configured [`Authenticator`] edits the headers
//! 3. send: the transport performs the exchange; elapsed time is measured
//!    around this stage only
//! 4. post-process: the handler chain runs over the response
//! 5. observe: the (request, response) pair is recorded for this task or thread
//!
//! A failure in any stage stops the lifecycle; later stages do not run.

mod async_client;
mod blocking;

pub use async_client::AsyncApiClient;
pub use blocking::ApiClient;

use crate::error::{ClientError, Result};
use crate::observe;
use crate::request::{Method, OutboundRequest, RequestOptions};
use crate::response::{ApiResponse, RawResponse};
use crate::transport::{AsyncHttpTransport, HttpTransport};
use crate::version::VersionRegistry;
use herald_core::{Authenticator, HandlerChain, HarnessConfig, Headers};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// State and stages shared by the blocking and async clients
pub(crate) struct ClientCore {
    base_url: String,
    api_version: Option<String>,
    registry: VersionRegistry,
    default_headers: Headers,
    timeout: Duration,
    auth: Option<Arc<dyn Authenticator>>,
    chain: HandlerChain<ApiResponse>,
}

impl ClientCore {
    fn url_for(&self, endpoint: &str) -> Result<String> {
        let url = match &self.api_version {
            Some(version) => format!(
                "{}/{}/{}",
                self.base_url,
                self.registry.prefix_for(version),
                self.registry.resolve_endpoint(version, endpoint)
            ),
            None => format!("{}/{}", self.base_url, endpoint.trim_start_matches('/')),
        };

        Url::parse(&url).map_err(|e| ClientError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(url)
    }

    /// Stage 1
    pub(crate) fn prepare(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<OutboundRequest> {
        let mut headers = self.default_headers.clone();
        headers.extend(options.headers);

        Ok(OutboundRequest {
            method,
            url: self.url_for(endpoint)?,
            headers,
            query: options.query,
            body: options.body,
            files: options.files,
        })
    }

    /// Stages 4 and 5
    pub(crate) fn finish(
        &self,
        request: OutboundRequest,
        raw: RawResponse,
        elapsed: Duration,
    ) -> Result<ApiResponse> {
        let response = self.chain.run(ApiResponse::from_raw(raw, elapsed))?;
        observe::record(request, response.clone());
        Ok(response)
    }

    pub(crate) fn auth(&self) -> Option<&Arc<dyn Authenticator>> {
        self.auth.as_ref()
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder shared by [`ApiClient`] and [`AsyncApiClient`]
///
/// # Example
///
/// ```rust,no_run
/// use herald_http::{ApiClient, BlockingReqwestTransport, ClientBuilder, RequestOptions};
///
/// let client = ClientBuilder::new("https://api.example.com")
///     .api_version("v1")
///     .header("Accept", "application/json")
///     .build(BlockingReqwestTransport::default());
///
/// let users = client.get("/users", RequestOptions::new());
/// ```
pub struct ClientBuilder {
    base_url: String,
    api_version: Option<String>,
    registry: VersionRegistry,
    default_headers: Headers,
    timeout: Duration,
    auth: Option<Arc<dyn Authenticator>>,
    chain: Option<HandlerChain<ApiResponse>>,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: None,
            registry: VersionRegistry::default(),
            default_headers: Headers::new(),
            timeout: DEFAULT_TIMEOUT,
            auth: None,
            chain: None,
        }
    }

    /// Base URL, API version and timeout from the harness configuration
    pub fn from_config(config: &HarnessConfig) -> Self {
        let builder = Self::new(config.base_url.clone()).timeout(config.network.http_timeout());
        if config.api_version.trim().is_empty() {
            builder
        } else {
            builder.api_version(config.api_version.trim())
        }
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn registry(mut self, registry: VersionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn auth(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Replace the default chain (status check + logging)
    pub fn chain(mut self, chain: HandlerChain<ApiResponse>) -> Self {
        self.chain = Some(chain);
        self
    }

    fn into_core(self) -> ClientCore {
        ClientCore {
            base_url: self.base_url,
            api_version: self.api_version,
            registry: self.registry,
            default_headers: self.default_headers,
            timeout: self.timeout,
            auth: self.auth,
            chain: self.chain.unwrap_or_else(HandlerChain::standard),
        }
    }

    pub fn build<T: HttpTransport>(self, transport: T) -> ApiClient<T> {
        ApiClient::from_parts(self.into_core(), transport)
    }

    pub fn build_async<T: AsyncHttpTransport>(self, transport: T) -> AsyncApiClient<T> {
        AsyncApiClient::from_parts(self.into_core(), transport)
    }
}
