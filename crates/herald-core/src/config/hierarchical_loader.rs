//! Hierarchical configuration loader with precedence
//!
//! Loads harness configuration from multiple sources with the following
//! precedence (low to high):
//! 1. Embedded defaults (built into the crate)
//! 2. Project config (`herald.yaml` in the config directory)
//! 3. Environment variables (HERALD_* prefix)

use crate::error::{Error, Result};
use crate::types::HarnessConfig;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde_yaml_ng::{Mapping, Value};
use std::env;
use std::fs;
use std::str::FromStr;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const DEFAULTS_FILE: &str = "harness-defaults.yaml";
const PROJECT_FILE: &str = "herald.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Directory searched for `herald.yaml`
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at `HERALD_CONFIG_DIR`, or the working directory
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    fn get_config_dir() -> Result<Utf8PathBuf> {
        if let Ok(dir) = env::var("HERALD_CONFIG_DIR") {
            return Ok(Utf8PathBuf::from(dir));
        }

        let cwd = env::current_dir()?;
        Utf8PathBuf::from_path_buf(cwd)
            .map_err(|p| Error::invalid_config(format!("Non UTF-8 working directory: {}", p.display())))
    }

    /// Load harness configuration with hierarchical precedence
    pub fn load(&self) -> Result<HarnessConfig> {
        let mut merged = Self::load_embedded_value(DEFAULTS_FILE)?;

        let project_path = self.config_dir.join(PROJECT_FILE);
        if project_path.exists() {
            let overlay = self.load_yaml_value(&project_path)?;
            merged = Self::merge_values(merged, overlay);
        }

        let config: HarnessConfig = serde_yaml_ng::from_value(merged)
            .map_err(|e| Error::invalid_config(format!("Failed to parse configuration: {}", e)))?;

        let config = Self::apply_env_overrides(config)?;
        config.validate()?;

        tracing::debug!(
            base_url = %config.base_url,
            api_version = %config.api_version,
            environment = %config.environment,
            "loaded harness configuration"
        );

        Ok(config)
    }

    fn load_embedded_value(filename: &str) -> Result<Value> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    fn load_yaml_value(&self, path: &Utf8Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Value::Mapping(Mapping::new()));
        }
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Deep-merge two YAML documents; overlay mappings win key by key
    fn merge_values(base: Value, overlay: Value) -> Value {
        match (base, overlay) {
            (Value::Mapping(mut base), Value::Mapping(overlay)) => {
                for (key, value) in overlay {
                    let merged = match base.remove(&key) {
                        Some(existing) => Self::merge_values(existing, value),
                        None => value,
                    };
                    base.insert(key, merged);
                }
                Value::Mapping(base)
            }
            (base, Value::Null) => base,
            (_, overlay) => overlay,
        }
    }

    fn apply_env_overrides(mut config: HarnessConfig) -> Result<HarnessConfig> {
        if let Ok(val) = env::var("HERALD_BASE_URL") {
            config.base_url = val;
        }

        if let Ok(val) = env::var("HERALD_API_VERSION") {
            config.api_version = val;
        }

        if let Ok(val) = env::var("HERALD_ENV") {
            config.environment = FromStr::from_str(&val)?;
        }

        if let Ok(val) = env::var("HERALD_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("HERALD_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("HERALD_MAX_RETRIES") {
            config.retry.max_attempts = val
                .parse()
                .map_err(|_| Error::invalid_config("HERALD_MAX_RETRIES must be a valid number"))?;
        }

        if let Ok(val) = env::var("HERALD_BACKOFF_MULTIPLIER") {
            config.retry.backoff_multiplier = val.parse().map_err(|_| {
                Error::invalid_config("HERALD_BACKOFF_MULTIPLIER must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("HERALD_DEFAULT_TOPIC") {
            config.messaging.default_topic = val;
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Environment, RetryStrategy};
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_temp_loader() -> (HierarchicalConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        let loader = HierarchicalConfigLoader::with_dir(config_dir);
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        let (loader, _temp) = create_temp_loader();
        let config = loader.load().unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.api_version, "v1");
        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.network.http_timeout_secs, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.retryable_statuses, vec![500, 502, 503, 504]);
        assert_eq!(config.messaging.default_topic, "test-events");
    }

    #[test]
    #[serial]
    fn test_project_file_overrides_only_named_keys() {
        let (loader, _temp) = create_temp_loader();

        let config_content = r#"
base-url: "https://staging.example.com"
environment: staging
retry:
  max-attempts: 5
  strategy: fixed-delay
"#;
        fs::write(loader.config_dir().join("herald.yaml"), config_content).unwrap();

        let config = loader.load().unwrap();
        assert_eq!(config.base_url, "https://staging.example.com");
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.strategy, RetryStrategy::FixedDelay);
        // untouched keys keep their embedded defaults
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.network.poll_slice_ms, 1000);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("HERALD_BASE_URL", "http://env-host:9000");
        env::set_var("HERALD_ENV", "prod");
        env::set_var("HERALD_MAX_RETRIES", "7");
        env::set_var("HERALD_BACKOFF_MULTIPLIER", "1.5");
        env::set_var("HERALD_DEFAULT_TOPIC", "orders");

        let config = loader.load().unwrap();
        assert_eq!(config.base_url, "http://env-host:9000");
        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.backoff_multiplier, 1.5);
        assert_eq!(config.messaging.default_topic, "orders");

        env::remove_var("HERALD_BASE_URL");
        env::remove_var("HERALD_ENV");
        env::remove_var("HERALD_MAX_RETRIES");
        env::remove_var("HERALD_BACKOFF_MULTIPLIER");
        env::remove_var("HERALD_DEFAULT_TOPIC");
    }

    #[test]
    #[serial]
    fn test_invalid_numeric_env_is_config_fault() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("HERALD_HTTP_TIMEOUT_SECS", "soon");
        let result = loader.load();
        env::remove_var("HERALD_HTTP_TIMEOUT_SECS");

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    #[serial]
    fn test_zero_attempts_in_file_fails_validation() {
        let (loader, _temp) = create_temp_loader();
        fs::write(
            loader.config_dir().join("herald.yaml"),
            "retry:\n  max-attempts: 0\n",
        )
        .unwrap();

        assert!(loader.load().is_err());
    }

    #[test]
    fn test_merge_values_nested() {
        let base: Value = serde_yaml_ng::from_str("a: 1\nb:\n  c: 2\n  d: 3\n").unwrap();
        let overlay: Value = serde_yaml_ng::from_str("b:\n  d: 4\ne: 5\n").unwrap();

        let merged = HierarchicalConfigLoader::merge_values(base, overlay);
        let expected: Value = serde_yaml_ng::from_str("a: 1\nb:\n  c: 2\n  d: 4\ne: 5\n").unwrap();
        assert_eq!(merged, expected);
    }
}
