//! Harness configuration types
//!
//! These types control how the harness talks to the system under test:
//! the target API, network timeouts, retry policy and messaging defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Complete harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarnessConfig {
    /// Base URL of the API under test
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default API version (e.g. "v1")
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Target environment
    #[serde(default)]
    pub environment: Environment,

    /// Network and polling configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Retry policy applied to outbound calls
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Producer/consumer defaults
    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            environment: Environment::default(),
            network: NetworkConfig::default(),
            retry: RetryPolicy::default(),
            messaging: MessagingConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Base URL with the API version path appended: `{base}/api/{version}`
    pub fn versioned_base_url(&self) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Reject configurations the harness cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base-url"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::invalid_config("retry.max-attempts must be at least 1"));
        }
        if self.retry.backoff_multiplier <= 0.0 || !self.retry.backoff_multiplier.is_finite() {
            return Err(Error::invalid_config(
                "retry.backoff-multiplier must be a positive number",
            ));
        }
        if self.network.poll_slice_ms == 0 {
            return Err(Error::invalid_config("network.poll-slice-ms must be non-zero"));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_api_version() -> String {
    "v1".to_string()
}

/// Target environment of a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" => Ok(Environment::Prod),
            other => Err(Error::invalid_environment(other)),
        }
    }
}

/// Network and polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Default consumer poll timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Upper bound on a single poll wait inside consume-until loops
    #[serde(default = "default_poll_slice")]
    pub poll_slice_ms: u64,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl NetworkConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_slice(&self) -> Duration {
        Duration::from_millis(self.poll_slice_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            poll_timeout_secs: default_poll_timeout(),
            poll_slice_ms: default_poll_slice(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_poll_slice() -> u64 {
    1000
}
fn default_user_agent() -> String {
    format!("herald/{}", env!("CARGO_PKG_VERSION"))
}

/// Retry policy for an outbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound on a single wait in milliseconds; waits grow unbounded when unset
    #[serde(default)]
    pub max_delay_ms: Option<u64>,

    /// Add up to 25% random jitter to each wait
    #[serde(default)]
    pub jitter: bool,

    /// Status codes that are retried when returned by a successful call
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: None,
            jitter: false,
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            strategy: RetryStrategy::None,
            ..Self::default()
        }
    }

    /// Exponential policy where the wait after attempt `k` is `factor^(k-1)` seconds
    pub fn exponential(max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            strategy: RetryStrategy::ExponentialBackoff,
            backoff_multiplier: backoff_factor,
            initial_delay_ms: 1000,
            ..Self::default()
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_retryable_statuses() -> Vec<u16> {
    vec![500, 502, 503, 504]
}

/// Retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Retry immediately
    None,

    /// Fixed delay between retries
    FixedDelay,

    /// Exponential backoff (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

/// Producer and consumer defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessagingConfig {
    /// Topic used when a published event leaves its topic empty
    #[serde(default = "default_topic")]
    pub default_topic: String,

    /// Consumer group identifier
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Event budget for a single consume-until call
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            default_topic: default_topic(),
            group_id: default_group_id(),
            max_messages: default_max_messages(),
        }
    }
}

fn default_topic() -> String {
    "test-events".to_string()
}
fn default_group_id() -> String {
    "herald-tests".to_string()
}
fn default_max_messages() -> usize {
    100
}
