//! Error types for the platform-access crate.

use std::fmt;

/// Errors from establishing who the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// No principal was supplied with the request.
    MissingPrincipal,
    /// A principal was supplied but is not a usable username.
    InvalidPrincipal { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrincipal => write!(f, "no principal supplied"),
            Self::InvalidPrincipal { reason } => write!(f, "invalid principal: {reason}"),
        }
    }
}

impl std::error::Error for AuthenticationError {}
