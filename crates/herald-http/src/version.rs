//! API version routing
//!
//! Maps a version name to the path prefix inserted between the base URL and
//! the endpoint, plus optional per-version endpoint renames.

use herald_core::types::Environment;
use std::collections::HashMap;

/// Routing details for one API version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConfig {
    pub version: String,
    /// e.g. `api/v1`
    pub path_prefix: String,
    /// Endpoint (without leading slash) to its replacement for this version
    pub endpoint_overrides: HashMap<String, String>,
}

impl VersionConfig {
    pub fn new(version: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            path_prefix: path_prefix.into(),
            endpoint_overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, endpoint: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.endpoint_overrides
            .insert(endpoint.into(), replacement.into());
        self
    }
}

/// Known API versions
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    versions: HashMap<String, VersionConfig>,
}

impl Default for VersionRegistry {
    fn default() -> Self {
        let mut versions = HashMap::new();
        for name in ["v1", "v2"] {
            versions.insert(
                name.to_string(),
                VersionConfig::new(name, format!("api/{}", name)),
            );
        }
        Self { versions }
    }
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a version
    pub fn register(&mut self, config: VersionConfig) {
        self.versions.insert(config.version.clone(), config);
    }

    pub fn get(&self, version: &str) -> Option<&VersionConfig> {
        self.versions.get(version)
    }

    /// Default version for an environment: dev uses v2, everything else v1
    pub fn default_version(environment: Environment) -> &'static str {
        match environment {
            Environment::Dev => "v2",
            Environment::Staging | Environment::Prod => "v1",
        }
    }

    /// Path prefix for a version; unregistered versions map to `api/<version>`
    pub fn prefix_for(&self, version: &str) -> String {
        self.versions
            .get(version)
            .map(|c| c.path_prefix.trim_matches('/').to_string())
            .unwrap_or_else(|| format!("api/{}", version))
    }

    /// Apply the version's endpoint override, if any
    pub fn resolve_endpoint<'a>(&'a self, version: &str, endpoint: &'a str) -> &'a str {
        let trimmed = endpoint.trim_start_matches('/');
        self.versions
            .get(version)
            .and_then(|c| c.endpoint_overrides.get(trimmed))
            .map(String::as_str)
            .unwrap_or(trimmed)
    }
}
