//! Test doubles for transports and authenticators

use async_trait::async_trait;
use herald_core::auth::AuthError;
use herald_core::{Authenticator, HandlerError, Headers, ResultHandler};
use herald_http::{
    ApiResponse, AsyncHttpTransport, HttpTransport, OutboundRequest, RawResponse, TransportError,
};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Transport {}

    impl HttpTransport for Transport {
        fn send(&self, request: &OutboundRequest, timeout: Duration) -> Result<RawResponse, TransportError>;
    }
}

mock! {
    pub AsyncTransport {}

    #[async_trait]
    impl AsyncHttpTransport for AsyncTransport {
        async fn send(&self, request: &OutboundRequest, timeout: Duration) -> Result<RawResponse, TransportError>;
    }
}

/// Transport that sleeps for a fixed time and answers 200
pub struct SlowTransport {
    pub delay: Duration,
}

impl HttpTransport for SlowTransport {
    fn send(&self, _: &OutboundRequest, _: Duration) -> Result<RawResponse, TransportError> {
        std::thread::sleep(self.delay);
        Ok(RawResponse::new(200))
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

/// Counts how many results reached it
pub struct CountingHandler(pub Arc<AtomicUsize>);

impl ResultHandler<ApiResponse> for CountingHandler {
    fn name(&self) -> &str {
        "counting"
    }

    fn process(&self, result: ApiResponse) -> Result<ApiResponse, HandlerError<ApiResponse>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }
}

/// Holds every result for a fixed time
pub struct SleepyHandler(pub Duration);

impl ResultHandler<ApiResponse> for SleepyHandler {
    fn name(&self) -> &str {
        "sleepy"
    }

    fn process(&self, result: ApiResponse) -> Result<ApiResponse, HandlerError<ApiResponse>> {
        std::thread::sleep(self.0);
        Ok(result)
    }
}
