//! Mock server helpers
//!
//! Blocking clients must not run inside an async runtime, so blocking tests
//! use [`BlockingServer`], which owns its own runtime and only enters it to
//! mount mocks or read received requests.

use super::constants::*;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A wiremock server driven from synchronous test code
pub struct BlockingServer {
    server: MockServer,
    runtime: Runtime,
}

impl BlockingServer {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn received(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    pub fn verify(&self) {
        self.runtime.block_on(self.server.verify());
    }
}

/// GET `path` returns `status` `fail_count` times, then 200 with `body`
pub fn flaky_json(status: u16, fail_count: u64, route: &str, body: serde_json::Value) -> Vec<Mock> {
    vec![
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(ResponseTemplate::new(status))
            .up_to_n_times(fail_count),
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body)),
    ]
}

/// GET `/api/v1/users/7` returns the test user
pub async fn mock_user(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(V1_USER_7_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(server)
        .await;
}

/// Every request to `route` returns `status`
pub async fn mock_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(path(route.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn mock_flaky(server: &MockServer, route: &str, status: u16, fail_count: u64) {
    for mock in flaky_json(status, fail_count, route, user_json()) {
        mock.mount(server).await;
    }
}
