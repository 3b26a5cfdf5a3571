//! Error types for the workflow crate.
//!
//! - `RegistryError`: building or loading the blueprint catalog
//! - `SchemaError`: a configuration schema that cannot be compiled
//! - `ValidationError`: checking a configuration document against a schema

use crate::schema::Violation;
use std::fmt;

/// Errors raised while assembling a `BlueprintRegistry`.
///
/// All of these are fatal at boot: a registry is only ever built from a
/// complete, consistent set of definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two definitions share the same id.
    DuplicateDefinition { id: String },
    /// A definition parsed but is internally inconsistent.
    InvalidDefinition { id: String, reason: String },
    /// A definition source could not be read or parsed.
    LoadFailure { location: String, reason: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDefinition { id } => {
                write!(f, "duplicate node definition id: {id}")
            }
            Self::InvalidDefinition { id, reason } => {
                write!(f, "invalid node definition '{id}': {reason}")
            }
            Self::LoadFailure { location, reason } => {
                write!(f, "failed to load node definitions from {location}: {reason}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// A schema document that does not compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// JSON pointer into the schema document.
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    pub(crate) fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "invalid schema: {}", self.reason)
        } else {
            write!(f, "invalid schema at '{}': {}", self.path, self.reason)
        }
    }
}

impl std::error::Error for SchemaError {}

/// Outcome of validating a configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The schema text is not JSON or is not a usable schema.
    MalformedSchema { reason: String },
    /// The configuration text is not well-formed JSON.
    MalformedConfig { reason: String },
    /// The configuration parsed but broke one or more schema rules.
    Invalid { violations: Vec<Violation> },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedSchema { reason } => write!(f, "malformed schema: {reason}"),
            Self::MalformedConfig { reason } => {
                write!(f, "configuration is not valid JSON: {reason}")
            }
            Self::Invalid { violations } => {
                write!(f, "configuration failed validation")?;
                for (i, violation) in violations.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<SchemaError> for ValidationError {
    fn from(err: SchemaError) -> Self {
        Self::MalformedSchema {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_definition_display() {
        let err = RegistryError::DuplicateDefinition {
            id: "http-request".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate node definition id: http-request");
    }

    #[test]
    fn load_failure_names_location() {
        let err = RegistryError::LoadFailure {
            location: "definitions/broken.json".to_string(),
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.to_string().contains("definitions/broken.json"));
    }

    #[test]
    fn schema_error_display_at_root() {
        let err = SchemaError::new("", "schema must be an object or boolean");
        assert_eq!(
            err.to_string(),
            "invalid schema: schema must be an object or boolean"
        );
    }

    #[test]
    fn invalid_lists_every_violation() {
        let err = ValidationError::Invalid {
            violations: vec![
                Violation::new("", "missing required property 'url'"),
                Violation::new("/method", "value is not one of the allowed values"),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("missing required property 'url'"));
        assert!(text.contains("/method"));
    }
}
