//! JSON Schema validation of result bodies
//!
//! The lifecycle only depends on the narrow [`BodyValidator`] contract
//! (pass/fail plus messages). [`SchemaValidator`] is the `jsonschema`-backed
//! implementation, holding pre-compiled schemas by name.

use crate::error::{Error, Result};
use camino::Utf8Path;
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Outcome of validating one body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn fail(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Combine two outcomes; the result is valid only if both are
    pub fn merge(mut self, other: ValidationOutcome) -> Self {
        self.valid = self.valid && other.valid;
        self.errors.extend(other.errors);
        self
    }

    /// Convert into a `Result`, failing with the collected messages
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(Error::schema_validation(self.errors))
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            f.write_str("valid")
        } else {
            write!(f, "invalid:\n{}", self.errors.join("\n"))
        }
    }
}

/// Validates a body against a named schema
pub trait BodyValidator: Send + Sync {
    fn validate(&self, body: &Value, schema_name: &str) -> ValidationOutcome;
}

/// Schema validator with pre-compiled schemas
#[derive(Debug, Default)]
pub struct SchemaValidator {
    schemas: HashMap<String, Validator>,
}

impl SchemaValidator {
    /// Create an empty validator; add schemas with [`SchemaValidator::register`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.schema.json` (or `*.json`) file in a directory
    pub fn from_directory(path: &Utf8Path) -> Result<Self> {
        let mut validator = Self::new();

        if path.is_dir() {
            for entry in path.read_dir_utf8()? {
                let entry = entry?;
                let file_path = entry.path();

                if file_path.extension() != Some("json") {
                    continue;
                }
                let Some(stem) = file_path.file_stem() else {
                    continue;
                };
                let name = stem.trim_end_matches(".schema").to_string();

                debug!("Loading schema from file: {}", file_path);

                let content = std::fs::read_to_string(file_path)?;
                let schema_value: Value = serde_json::from_str(&content)?;
                validator.register(name, &schema_value)?;
            }
        }

        if validator.schemas.is_empty() {
            return Err(Error::schema_not_found(format!("No schemas found in {}", path)));
        }

        Ok(validator)
    }

    /// Compile and register a schema under `name`
    pub fn register(&mut self, name: impl Into<String>, schema: &Value) -> Result<()> {
        let name = name.into();
        let compiled = compile(&name, schema)?;
        self.schemas.insert(name, compiled);
        Ok(())
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validate a JSON value, failing with the collected messages
    pub fn validate_strict(&self, value: &Value, schema_name: &str) -> Result<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| Error::schema_not_found(schema_name))?;

        outcome_for(schema, value).into_result()
    }

    /// Validate against a schema document that is not registered
    pub fn validate_inline(schema: &Value, value: &Value) -> Result<ValidationOutcome> {
        let compiled = compile("inline", schema)?;
        Ok(outcome_for(&compiled, value))
    }
}

impl BodyValidator for SchemaValidator {
    fn validate(&self, body: &Value, schema_name: &str) -> ValidationOutcome {
        match self.schemas.get(schema_name) {
            Some(schema) => outcome_for(schema, body),
            None => ValidationOutcome::fail(vec![format!("  - schema not found: {}", schema_name)]),
        }
    }
}

/// Runs several validators and merges their outcomes
#[derive(Default, Clone)]
pub struct CompositeValidator {
    validators: Vec<Arc<dyn BodyValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: Arc<dyn BodyValidator>) -> Self {
        self.validators.push(validator);
        self
    }
}

impl BodyValidator for CompositeValidator {
    fn validate(&self, body: &Value, schema_name: &str) -> ValidationOutcome {
        self.validators
            .iter()
            .map(|v| v.validate(body, schema_name))
            .fold(ValidationOutcome::pass(), ValidationOutcome::merge)
    }
}

fn compile(name: &str, schema: &Value) -> Result<Validator> {
    jsonschema::validator_for(schema)
        .map_err(|e| Error::invalid_config(format!("Failed to compile schema {}: {}", name, e)))
}

fn outcome_for(schema: &Validator, value: &Value) -> ValidationOutcome {
    let errors: Vec<String> = schema
        .iter_errors(value)
        .map(|e| {
            let path = e.instance_path().to_string();
            if path.is_empty() {
                format!("  - {}", e)
            } else {
                format!("  - {}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(errors)
    }
}
