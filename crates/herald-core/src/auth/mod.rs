//! Authenticators applied to outbound requests and events
//!
//! An authenticator only touches the header map of a fully prepared request
//! or event. One instance may be shared by any number of concurrent callers.

mod oauth2;

pub use oauth2::{AccessToken, HttpTokenSource, OAuth2ClientCredentials, TokenSource};

use crate::error::Transient;
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Header map used by requests and events
pub type Headers = BTreeMap<String, String>;

pub const AUTHORIZATION: &str = "Authorization";
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {message}")]
    TokenRequest { message: String, transient: bool },

    #[error("token endpoint returned status {status}")]
    TokenStatus { status: u16 },

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),
}

impl AuthError {
    pub fn token_request(message: impl Into<String>, transient: bool) -> Self {
        Self::TokenRequest {
            message: message.into(),
            transient,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        let transient = err.is_timeout() || err.is_connect();
        Self::token_request(err.to_string(), transient)
    }
}

impl Transient for AuthError {
    fn is_transient(&self) -> bool {
        match self {
            AuthError::TokenRequest { transient, .. } => *transient,
            AuthError::TokenStatus { status } => *status >= 500,
            AuthError::InvalidTokenResponse(_) => false,
        }
    }
}

/// Applies credentials to a header map
///
/// `apply` is used by blocking lifecycles and `apply_async` by cooperative
/// ones; stateless authenticators only implement `apply`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn apply(&self, headers: &mut Headers) -> Result<(), AuthError>;

    async fn apply_async(&self, headers: &mut Headers) -> Result<(), AuthError> {
        self.apply(headers)
    }
}

/// `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authenticator for BearerAuth {
    fn apply(&self, headers: &mut Headers) -> Result<(), AuthError> {
        headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", self.token));
        Ok(())
    }
}

/// Static API key in a custom header (`X-API-Key` by default)
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    key: String,
    header_name: String,
}

impl ApiKeyAuth {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header_name: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }

    pub fn with_header(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }
}

impl Authenticator for ApiKeyAuth {
    fn apply(&self, headers: &mut Headers) -> Result<(), AuthError> {
        headers.insert(self.header_name.clone(), self.key.clone());
        Ok(())
    }
}
