//! Transport capability
//!
//! A transport performs exactly one network exchange for a fully prepared
//! request. Everything around it (URL building, auth, post-processing,
//! observation) belongs to the client lifecycle.

/// Expands to `fn build(client, request, timeout)` for one reqwest flavor
///
/// The blocking and async builders expose the same methods without sharing
/// a trait, so the body-kind dispatch is written once here.
macro_rules! request_builder {
    ($client:ty, $builder:ty, $multipart:ident) => {
        fn build(
            client: &$client,
            request: &crate::request::OutboundRequest,
            timeout: std::time::Duration,
        ) -> Result<$builder, crate::error::TransportError> {
            use crate::request::RequestBody;

            let mut builder = client
                .request(request.method.into(), &request.url)
                .timeout(timeout);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }

            if request.files.is_empty() {
                return Ok(match &request.body {
                    Some(RequestBody::Json(value)) => builder.json(value),
                    Some(RequestBody::Text(text)) => builder.body(text.clone()),
                    Some(RequestBody::Bytes(bytes)) => builder.body(bytes.clone()),
                    Some(RequestBody::Form(fields)) => builder.form(fields),
                    None => builder,
                });
            }

            let mut form = $multipart::Form::new();
            for (name, value) in crate::transport::multipart_fields(request) {
                form = form.text(name.clone(), value.clone());
            }
            for file in &request.files {
                let mut part = $multipart::Part::bytes(file.content.clone())
                    .file_name(file.file_name.clone());
                if let Some(content_type) = &file.content_type {
                    part = part.mime_str(content_type).map_err(|e| {
                        crate::error::TransportError::request(&request.url, e.to_string())
                    })?;
                }
                form = form.part(file.field.clone(), part);
            }
            Ok(builder.multipart(form))
        }
    };
}

mod async_transport;
mod blocking;

pub use async_transport::ReqwestTransport;
pub use blocking::BlockingReqwestTransport;

use crate::error::TransportError;
use crate::request::{OutboundRequest, RequestBody};
use crate::response::RawResponse;
use async_trait::async_trait;
use herald_core::Headers;
use std::sync::Arc;
use std::time::Duration;

/// Blocking transport-send
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &OutboundRequest, timeout: Duration)
        -> Result<RawResponse, TransportError>;

    /// Release pooled resources; a later `send` starts afresh
    fn close(&self) {}
}

/// Cooperative transport-send
#[async_trait]
pub trait AsyncHttpTransport: Send + Sync {
    async fn send(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;

    fn close(&self) {}
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn send(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        (**self).send(request, timeout)
    }

    fn close(&self) {
        (**self).close()
    }
}

#[async_trait]
impl<T: AsyncHttpTransport + ?Sized> AsyncHttpTransport for Arc<T> {
    async fn send(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        (**self).send(request, timeout).await
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Text fields sent alongside files; only a form body contributes any
fn multipart_fields(request: &OutboundRequest) -> &[(String, String)] {
    match &request.body {
        Some(RequestBody::Form(fields)) => fields,
        _ => &[],
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
