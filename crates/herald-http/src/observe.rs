//! Last HTTP exchange per task or thread, for failure reporting

use crate::request::OutboundRequest;
use crate::response::ApiResponse;
use herald_core::report::{attach_best_effort, ReportSink, CONTENT_TYPE_JSON};
use herald_core::{Headers, ObservationStore};
use serde_json::{json, Value};
use std::sync::LazyLock;

static EXCHANGES: LazyLock<ObservationStore<OutboundRequest, ApiResponse>> =
    LazyLock::new(ObservationStore::new);

const REDACTED: &str = "***";

/// The process-wide HTTP observation store
pub fn exchanges() -> &'static ObservationStore<OutboundRequest, ApiResponse> {
    &EXCHANGES
}

pub(crate) fn record(request: OutboundRequest, response: ApiResponse) {
    EXCHANGES.record(request, response);
}

/// Last request completed in the calling context
pub fn last_request() -> Option<OutboundRequest> {
    EXCHANGES.last_request()
}

/// Last response completed in the calling context
pub fn last_response() -> Option<ApiResponse> {
    EXCHANGES.last_result()
}

pub fn clear_last_exchange() {
    EXCHANGES.clear_current();
}

fn is_secret(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "authorization" || name.contains("api-key") || name.contains("token")
}

fn redacted(headers: &Headers) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_secret(name) {
                REDACTED.to_string()
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

fn request_document(request: &OutboundRequest) -> Value {
    let mut document = json!({
        "method": request.method,
        "url": request.url,
        "headers": redacted(&request.headers),
        "query": request.query,
        "body": request.body,
    });
    if !request.files.is_empty() {
        document["files"] = json!(request.files);
    }
    document
}

fn response_document(response: &ApiResponse) -> Value {
    json!({
        "status": response.status,
        "headers": response.headers,
        "elapsed_ms": response.elapsed_ms(),
        "body": response.json.clone().unwrap_or_else(|| Value::String(response.text())),
    })
}

/// Attach the calling context's last exchange to a report
///
/// Credential headers are masked. Returns false when nothing was recorded.
pub fn attach_last_exchange(sink: &dyn ReportSink) -> bool {
    let Some(exchange) = EXCHANGES.last() else {
        return false;
    };

    for (name, document) in [
        ("Last Request", request_document(&exchange.request)),
        ("Last Response", response_document(&exchange.result)),
    ] {
        match serde_json::to_vec_pretty(&document) {
            Ok(content) => attach_best_effort(sink, name, &content, CONTENT_TYPE_JSON),
            Err(err) => tracing::warn!(error = %err, attachment = name, "could not render exchange"),
        }
    }
    true
}
