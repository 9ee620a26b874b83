//! Async client against a mock server and mock transports

mod common;
use common::*;

use herald_core::auth::{HttpTokenSource, OAuth2ClientCredentials};
use herald_core::{RetryPolicy, RetryStrategy};
use herald_http::{
    http_retry_executor, last_request, ClientBuilder, ClientError, Method, RawResponse,
    ReqwestTransport, RequestOptions, Stage,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_with_version_prefix() {
    let server = MockServer::start().await;
    mock_user(&server).await;

    let client = ClientBuilder::new(server.uri())
        .api_version("v1")
        .build_async(ReqwestTransport::default());

    let response = client.get(USER_7_ENDPOINT, RequestOptions::new()).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json, Some(user_json()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(16)
        .mount(&server)
        .await;

    let client = Arc::new(ClientBuilder::new(server.uri()).build_async(ReqwestTransport::default()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .get(&format!("/items/{}", i), RequestOptions::new())
                    .await
                    .map(|r| r.status)
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 200);
    }
    assert_eq!(client.transport().clients_created(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_each_task_observes_its_own_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = Arc::new(ClientBuilder::new(server.uri()).build_async(ReqwestTransport::default()));

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let endpoint = format!("/tasks/{}", i);
                client.get(&endpoint, RequestOptions::new()).await.unwrap();
                tokio::task::yield_now().await;
                let last = last_request().unwrap();
                assert!(last.url.ends_with(&endpoint), "{} saw {}", endpoint, last.url);
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oauth2_token_fetched_once_for_many_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/me"))
        .and(header("authorization", "Bearer issued-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(8)
        .mount(&server)
        .await;

    let source = HttpTokenSource::new(format!("{}/oauth/token", server.uri()), "client", "secret");
    let client = Arc::new(
        ClientBuilder::new(server.uri())
            .api_version("v2")
            .auth(Arc::new(OAuth2ClientCredentials::new(source)))
            .build_async(ReqwestTransport::default()),
    );

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get("/me", RequestOptions::new()).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().status, 200);
    }
}

#[tokio::test]
async fn test_async_retry_recovers() {
    let server = MockServer::start().await;
    mock_flaky(&server, "/users/7", 502, 2).await;

    let client = ClientBuilder::new(server.uri()).build_async(ReqwestTransport::default());
    let policy = RetryPolicy {
        max_attempts: 3,
        strategy: RetryStrategy::FixedDelay,
        initial_delay_ms: 10,
        ..RetryPolicy::default()
    };
    let executor = http_retry_executor(policy, "GET /users/7");

    let response = client
        .request_with_retry(&executor, Method::Get, "/users/7", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_auth_failure_stops_async_lifecycle() {
    let mut transport = MockAsyncTransport::new();
    transport.expect_send().times(0);

    let client = ClientBuilder::new("http://api.test")
        .auth(Arc::new(FailingAuth))
        .build_async(transport);

    let err = client.delete("/users/7", RequestOptions::new()).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Authenticate);
    assert!(matches!(err, ClientError::Auth(_)));
}

#[tokio::test]
async fn test_async_mock_transport_receives_prepared_request() {
    let mut transport = MockAsyncTransport::new();
    transport
        .expect_send()
        .withf(|request, _| {
            request.method == Method::Patch && request.url == "http://api.test/api/v2/users/7"
        })
        .times(1)
        .returning(|_, _| Ok(RawResponse::new(200).with_json(&json!({"patched": true}))));

    let client = ClientBuilder::new("http://api.test")
        .api_version("v2")
        .build_async(transport);

    let response = client
        .patch(USER_7_ENDPOINT, RequestOptions::new().json(json!({"name": "Grace"})))
        .await
        .unwrap();

    assert_eq!(response.json, Some(json!({"patched": true})));
}
