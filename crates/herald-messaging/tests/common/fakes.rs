//! Test doubles for messaging transports and authenticators

use herald_core::auth::AuthError;
use herald_core::{Authenticator, Headers};
use herald_messaging::{
    ConsumedEvent, Delivery, OutboundEvent, PollTransport, PublishTransport, RawMessage,
    TransportError,
};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

mock! {
    pub Publisher {}

    impl PublishTransport for Publisher {
        fn send(&self, event: &OutboundEvent, timeout: Duration) -> Result<Delivery, TransportError>;
        fn flush(&self, timeout: Duration) -> Result<(), TransportError>;
    }
}

mock! {
    pub Poller {}

    impl PollTransport for Poller {
        fn connect(&self) -> Result<(), TransportError>;
        fn poll(&self, timeout: Duration) -> Result<Option<RawMessage>, TransportError>;
        fn deserialize(&self, raw: RawMessage) -> Result<ConsumedEvent, TransportError>;
        fn close(&self) -> Result<(), TransportError>;
    }
}

pub fn accepted(offset: u64) -> Delivery {
    Delivery::Accepted {
        partition: Some(0),
        offset: Some(offset),
    }
}

/// Writes `X-Auth-Seq` with a running counter
#[derive(Default)]
pub struct CountingAuth {
    calls: AtomicUsize,
}

impl CountingAuth {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Authenticator for CountingAuth {
    fn apply(&self, headers: &mut Headers) -> Result<(), AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        headers.insert("X-Auth-Seq".to_string(), n.to_string());
        Ok(())
    }
}

/// Always fails as if the token endpoint were down
pub struct FailingAuth;

impl Authenticator for FailingAuth {
    fn apply(&self, _: &mut Headers) -> Result<(), AuthError> {
        Err(AuthError::TokenStatus { status: 503 })
    }
}
