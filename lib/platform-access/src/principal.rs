//! Normalized caller names.

use crate::error::AuthenticationError;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted username, in characters.
pub const MAX_PRINCIPAL_LEN: usize = 256;

/// A caller's username, trimmed and lowercased.
///
/// Two principals are the same user exactly when their normalized forms are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Normalizes and validates a raw principal name.
    pub fn parse(raw: &str) -> Result<Self, Report<AuthenticationError>> {
        let normalized = raw.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(AuthenticationError::InvalidPrincipal {
                reason: "must not be blank".to_string(),
            }
            .into());
        }
        if normalized.chars().count() > MAX_PRINCIPAL_LEN {
            return Err(AuthenticationError::InvalidPrincipal {
                reason: format!("must be at most {MAX_PRINCIPAL_LEN} characters"),
            }
            .into());
        }
        if normalized.chars().any(char::is_control) {
            return Err(AuthenticationError::InvalidPrincipal {
                reason: "must not contain control characters".to_string(),
            }
            .into());
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Principal {
    type Error = AuthenticationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).map_err(|report| report.current_context().clone())
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let principal = Principal::parse("  Alice\t").expect("valid");
        assert_eq!(principal.as_str(), "alice");
        assert_eq!(principal, Principal::parse("ALICE").expect("valid"));
    }

    #[test]
    fn rejects_blank() {
        let err = Principal::parse("   ").expect_err("blank");
        assert!(matches!(
            err.current_context(),
            AuthenticationError::InvalidPrincipal { .. }
        ));
    }

    #[test]
    fn rejects_overlong() {
        let raw = "a".repeat(MAX_PRINCIPAL_LEN + 1);
        assert!(Principal::parse(&raw).is_err());
        assert!(Principal::parse(&raw[..MAX_PRINCIPAL_LEN]).is_ok());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(Principal::parse("ali\u{0}ce").is_err());
    }

    #[test]
    fn deserialization_normalizes() {
        let principal: Principal = serde_json::from_str("\" Bob \"").expect("deserialize");
        assert_eq!(principal.as_str(), "bob");
        assert!(serde_json::from_str::<Principal>("\"\"").is_err());
    }
}
