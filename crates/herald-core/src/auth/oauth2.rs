//! OAuth 2.0 client-credentials authenticator with a shared token cache

use super::{AuthError, Authenticator, Headers, AUTHORIZATION};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens are refreshed this long before they actually expire
const EARLY_REFRESH: Duration = Duration::from_secs(60);
const DEFAULT_EXPIRES_IN: u64 = 3600;
/// Longest a token is cached when the issued lifetime is out of range
const MAX_CACHED_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// A freshly issued token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    pub value: String,
    /// Lifetime in seconds; 3600 when the issuer omits it
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Issues access tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn fetch(&self) -> Result<AccessToken, AuthError>;

    async fn fetch_async(&self) -> Result<AccessToken, AuthError>;
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn from_token(token: AccessToken) -> Self {
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN))
            .saturating_sub(EARLY_REFRESH);
        let now = Instant::now();
        let refresh_at = now
            .checked_add(lifetime)
            .or_else(|| now.checked_add(MAX_CACHED_LIFETIME))
            .unwrap_or(now);
        Self {
            value: token.value,
            refresh_at,
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// Caches a client-credentials token and refreshes it when it nears expiry
///
/// The cache sits behind one mutex shared by the blocking and async paths,
/// so when N callers find the token stale together exactly one of them
/// refreshes and the rest wait for the new value.
///
/// The blocking path (`apply`) must not be called from inside an async
/// runtime; async code uses `apply_async`.
pub struct OAuth2ClientCredentials<S> {
    source: S,
    cache: Mutex<Option<CachedToken>>,
    refreshes: AtomicU32,
}

impl<S: TokenSource> OAuth2ClientCredentials<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
            refreshes: AtomicU32::new(0),
        }
    }

    /// Number of token fetches performed so far
    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Drop the cached token; the next caller refreshes
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    fn token(&self) -> Result<String, AuthError> {
        let mut cache = self.cache.blocking_lock();
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.value.clone());
        }

        self.refreshes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("refreshing OAuth2 access token");
        let fresh = CachedToken::from_token(self.source.fetch()?);
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }

    async fn token_async(&self) -> Result<String, AuthError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.value.clone());
        }

        self.refreshes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("refreshing OAuth2 access token");
        let fresh = CachedToken::from_token(self.source.fetch_async().await?);
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }
}

#[async_trait]
impl<S: TokenSource> Authenticator for OAuth2ClientCredentials<S> {
    fn apply(&self, headers: &mut Headers) -> Result<(), AuthError> {
        let token = self.token()?;
        headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        Ok(())
    }

    async fn apply_async(&self, headers: &mut Headers) -> Result<(), AuthError> {
        let token = self.token_async().await?;
        headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        Ok(())
    }
}

/// Client-credentials grant against a token endpoint
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    timeout: Duration,
}

impl HttpTokenSource {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }
        form
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    fn fetch(&self) -> Result<AccessToken, AuthError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client.post(&self.token_url).form(&self.form()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::TokenStatus {
                status: status.as_u16(),
            });
        }
        response
            .json::<AccessToken>()
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))
    }

    async fn fetch_async(&self) -> Result<AccessToken, AuthError> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let response = client
            .post(&self.token_url)
            .form(&self.form())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::TokenStatus {
                status: status.as_u16(),
            });
        }
        response
            .json::<AccessToken>()
            .await
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Counts fetches and sleeps a little to widen the race window
    struct SlowSource {
        expires_in: Option<u64>,
    }

    #[async_trait]
    impl TokenSource for SlowSource {
        fn fetch(&self) -> Result<AccessToken, AuthError> {
            std::thread::sleep(Duration::from_millis(50));
            Ok(AccessToken {
                value: "tok".into(),
                expires_in: self.expires_in,
            })
        }

        async fn fetch_async(&self) -> Result<AccessToken, AuthError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(AccessToken {
                value: "tok".into(),
                expires_in: self.expires_in,
            })
        }
    }

    #[test]
    fn test_concurrent_blocking_callers_refresh_once() {
        let auth = Arc::new(OAuth2ClientCredentials::new(SlowSource { expires_in: None }));
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let auth = auth.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let mut headers = Headers::new();
                    auth.apply(&mut headers).unwrap();
                    headers.get(AUTHORIZATION).cloned()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("Bearer tok"));
        }
        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_async_callers_refresh_once() {
        let auth = Arc::new(OAuth2ClientCredentials::new(SlowSource { expires_in: None }));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let auth = auth.clone();
                tokio::spawn(async move {
                    let mut headers = Headers::new();
                    auth.apply_async(&mut headers).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_token_within_early_refresh_window_is_refetched() {
        // 30s lifetime is inside the 60s early-refresh margin
        let auth = OAuth2ClientCredentials::new(SlowSource {
            expires_in: Some(30),
        });

        let mut headers = Headers::new();
        auth.apply_async(&mut headers).await.unwrap();
        auth.apply_async(&mut headers).await.unwrap();

        assert_eq!(auth.refresh_count(), 2);
    }

    #[test]
    fn test_out_of_range_lifetime_is_cached() {
        let auth = OAuth2ClientCredentials::new(SlowSource {
            expires_in: Some(u64::MAX),
        });

        let mut headers = Headers::new();
        auth.apply(&mut headers).unwrap();
        auth.apply(&mut headers).unwrap();

        assert_eq!(headers.get(AUTHORIZATION).map(String::as_str), Some("Bearer tok"));
        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_async() {
        let auth = OAuth2ClientCredentials::new(SlowSource {
            expires_in: Some(u64::MAX),
        });

        let mut headers = Headers::new();
        auth.apply_async(&mut headers).await.unwrap();
        auth.apply_async(&mut headers).await.unwrap();

        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let auth = OAuth2ClientCredentials::new(SlowSource { expires_in: None });
        let mut headers = Headers::new();

        auth.apply_async(&mut headers).await.unwrap();
        auth.apply_async(&mut headers).await.unwrap();
        assert_eq!(auth.refresh_count(), 1);

        auth.invalidate().await;
        auth.apply_async(&mut headers).await.unwrap();
        assert_eq!(auth.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_http_token_source_posts_client_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=users.read"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "issued",
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpTokenSource::new(format!("{}/oauth/token", server.uri()), "id", "secret")
            .with_scope("users.read");

        let token = source.fetch_async().await.unwrap();
        assert_eq!(token.value, "issued");
        assert_eq!(token.expires_in, None);
    }

    #[tokio::test]
    async fn test_http_token_source_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = HttpTokenSource::new(server.uri(), "id", "wrong");

        let err = source.fetch_async().await.unwrap_err();
        assert!(matches!(err, AuthError::TokenStatus { status: 401 }));
    }
}
