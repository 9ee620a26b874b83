//! Blocking transport backed by `reqwest::blocking`

use super::{collect_headers, HttpTransport};
use crate::error::TransportError;
use crate::request::OutboundRequest;
use crate::response::RawResponse;
use herald_core::types::NetworkConfig;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Blocking reqwest transport with a lazily created, shared client
///
/// Must not be used from inside an async runtime; async code uses
/// [`super::ReqwestTransport`].
#[derive(Debug)]
pub struct BlockingReqwestTransport {
    user_agent: String,
    client: Mutex<Option<Client>>,
    created: AtomicU32,
}

impl Default for BlockingReqwestTransport {
    fn default() -> Self {
        Self::new(NetworkConfig::default().user_agent)
    }
}

impl BlockingReqwestTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            client: Mutex::new(None),
            created: AtomicU32::new(0),
        }
    }

    pub fn from_config(network: &NetworkConfig) -> Self {
        Self::new(network.user_agent.clone())
    }

    /// How many underlying clients have been created so far
    pub fn clients_created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    fn client(&self) -> Result<Client, TransportError> {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        self.created.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("created blocking HTTP client");
        *slot = Some(client.clone());
        Ok(client)
    }
}

request_builder!(Client, RequestBuilder, multipart);

impl HttpTransport for BlockingReqwestTransport {
    fn send(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let client = self.client()?;
        let response = build(&client, request, timeout)?
            .send()
            .map_err(|e| TransportError::from_reqwest(&request.url, e))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes()
            .map_err(|e| TransportError::from_reqwest(&request.url, e))?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    fn close(&self) {
        let previous = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::debug!("closed blocking HTTP client");
        }
    }
}
