//! Error types for HTTP lifecycles

use crate::response::ApiResponse;
use herald_core::auth::AuthError;
use herald_core::{HandlerError, Transient};
use std::fmt;
use thiserror::Error;

/// Failures raised by a transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("could not build HTTP client: {0}")]
    ClientBuild(String),
}

impl TransportError {
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn connect(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn request(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            message: message.into(),
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(url)
        } else if err.is_connect() {
            Self::connect(url, err.to_string())
        } else {
            Self::request(url, err.to_string())
        }
    }
}

impl Transient for TransportError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connect { .. })
    }
}

/// Lifecycle stage a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    Authenticate,
    Send,
    PostProcess,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::Authenticate => "authenticate",
            Stage::Send => "send",
            Stage::PostProcess => "post-process",
        };
        f.write_str(name)
    }
}

/// Failures of one HTTP lifecycle
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rejected(Box<HandlerError<ApiResponse>>),
}

impl ClientError {
    pub fn stage(&self) -> Stage {
        match self {
            ClientError::InvalidUrl { .. } => Stage::Prepare,
            ClientError::Auth(_) => Stage::Authenticate,
            ClientError::Transport(_) => Stage::Send,
            ClientError::Rejected(_) => Stage::PostProcess,
        }
    }

    /// The response a handler rejected, if that is what failed
    pub fn rejected_response(&self) -> Option<&ApiResponse> {
        match self {
            ClientError::Rejected(err) => Some(err.result()),
            _ => None,
        }
    }
}

impl From<HandlerError<ApiResponse>> for ClientError {
    fn from(err: HandlerError<ApiResponse>) -> Self {
        ClientError::Rejected(Box::new(err))
    }
}

impl Transient for ClientError {
    fn is_transient(&self) -> bool {
        match self {
            ClientError::Auth(err) => err.is_transient(),
            ClientError::Transport(err) => err.is_transient(),
            ClientError::InvalidUrl { .. } | ClientError::Rejected(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
