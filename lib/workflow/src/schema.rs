//! Configuration schema validation.
//!
//! `ConfigSchema` compiles a JSON Schema document once with the
//! `jsonschema` crate and then checks configuration documents against it,
//! collecting every violation rather than stopping at the first. The draft
//! is taken from `$schema` and defaults to 2020-12. Schema references are
//! resolved within the document only; remote `$ref` targets fail to compile.
//!
//! Violation paths are JSON pointers into the configuration document; the
//! empty string is the document root.

use crate::error::{SchemaError, ValidationError};
use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// One schema rule broken by a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer to the offending value.
    pub path: String,
    pub message: String,
}

impl Violation {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A compiled configuration schema.
#[derive(Clone)]
pub struct ConfigSchema {
    document: JsonValue,
    validator: Arc<Validator>,
}

impl fmt::Debug for ConfigSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSchema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

impl ConfigSchema {
    /// Compiles a schema document.
    ///
    /// The document must itself be a valid schema for its draft, and every
    /// `$ref` must resolve.
    pub fn compile(document: &JsonValue) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(document)
            .map_err(|e| SchemaError::new(&e.instance_path.to_string(), e.to_string()))?;
        Ok(Self {
            document: document.clone(),
            validator: Arc::new(validator),
        })
    }

    /// Parses and compiles schema text.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let document: JsonValue =
            serde_json::from_str(text).map_err(|e| ValidationError::MalformedSchema {
                reason: e.to_string(),
            })?;
        Ok(Self::compile(&document)?)
    }

    /// Checks a parsed configuration document.
    ///
    /// Returns every violation, in the same order for the same schema and
    /// document.
    pub fn validate(&self, config: &JsonValue) -> Result<(), Vec<Violation>> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(config)
            .map(|e| Violation::new(e.instance_path.to_string(), e.to_string()))
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Parses configuration text and checks it.
    pub fn validate_str(&self, config: &str) -> Result<(), ValidationError> {
        let document = parse_config(config)?;
        self.validate(&document)
            .map_err(|violations| ValidationError::Invalid { violations })
    }
}

/// Parses configuration text, failing if it is not well-formed JSON.
pub fn parse_config(text: &str) -> Result<JsonValue, ValidationError> {
    serde_json::from_str(text).map_err(|e| ValidationError::MalformedConfig {
        reason: e.to_string(),
    })
}

/// Validates configuration text against schema text.
///
/// A malformed schema is reported before a malformed configuration.
pub fn validate_config(schema: &str, config: &str) -> Result<(), ValidationError> {
    ConfigSchema::parse(schema)?.validate_str(config)
}
