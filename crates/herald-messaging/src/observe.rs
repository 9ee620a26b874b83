//! Last publish per task or thread, for failure reporting

use crate::event::{OutboundEvent, PublishResult};
use herald_core::report::{attach_best_effort, ReportSink, CONTENT_TYPE_JSON};
use herald_core::ObservationStore;
use serde_json::json;
use std::sync::LazyLock;

static PUBLISHES: LazyLock<ObservationStore<OutboundEvent, PublishResult>> =
    LazyLock::new(ObservationStore::new);

pub fn publishes() -> &'static ObservationStore<OutboundEvent, PublishResult> {
    &PUBLISHES
}

pub(crate) fn record(event: OutboundEvent, result: PublishResult) {
    PUBLISHES.record(event, result);
}

/// Last event published in the calling context
pub fn last_event() -> Option<OutboundEvent> {
    PUBLISHES.last_request()
}

pub fn last_publish_result() -> Option<PublishResult> {
    PUBLISHES.last_result()
}

pub fn clear_last_publish() {
    PUBLISHES.clear_current();
}

/// Attach the calling context's last publish; false when there is none
pub fn attach_last_publish(sink: &dyn ReportSink) -> bool {
    let Some(last) = PUBLISHES.last() else {
        return false;
    };

    let document = json!({"event": last.request, "result": last.result});
    match serde_json::to_vec_pretty(&document) {
        Ok(content) => attach_best_effort(sink, "Last Published Event", &content, CONTENT_TYPE_JSON),
        Err(err) => tracing::warn!(error = %err, "could not render published event"),
    }
    true
}
