//! Error types for herald-core

use thiserror::Error;

/// Result type alias using herald-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and usage faults
///
/// These are never retried: a harness that is wired up wrong fails fast.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Schema validation error
    #[error("Schema validation failed:\n{errors}")]
    SchemaValidation { errors: String },

    /// Schema not found
    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Unknown environment name
    #[error("Unknown environment: {environment}. Valid environments: dev, staging, prod")]
    InvalidEnvironment { environment: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a schema validation error from a list of errors
    pub fn schema_validation(errors: Vec<String>) -> Self {
        Self::SchemaValidation {
            errors: errors.join("\n"),
        }
    }

    /// Create a schema not found error
    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound { name: name.into() }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid environment error
    pub fn invalid_environment(environment: impl Into<String>) -> Self {
        Self::InvalidEnvironment {
            environment: environment.into(),
        }
    }
}

/// Classifies a failure as transient (connectivity, timeout) or fatal
///
/// Transient failures are the only errors the retry engine re-attempts by
/// default (see [`crate::retry::TransientOnly`]).
pub trait Transient {
    /// Whether a later attempt of the same operation may succeed
    fn is_transient(&self) -> bool;
}

impl Transient for std::io::Error {
    fn is_transient(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self.kind(),
            ErrorKind::TimedOut
                | ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::Interrupted
                | ErrorKind::WouldBlock
        )
    }
}

/// Configuration faults are never transient
impl Transient for Error {
    fn is_transient(&self) -> bool {
        false
    }
}
