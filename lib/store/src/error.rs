//! Error types for the store crate.
//!
//! - `RepositoryError`: failures at the storage boundary
//! - `GraphStoreError`: request-path failures reported to callers of the
//!   graph store

use flowcanvas_workflow::{ValidationError, Violation};
use std::fmt;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Project,
    NodeInstance,
    NodeConnection,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Project => write!(f, "project"),
            Self::NodeInstance => write!(f, "node instance"),
            Self::NodeConnection => write!(f, "node connection"),
        }
    }
}

/// Errors from a `GraphRepository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write.
    UniqueViolation { entity: EntityKind },
    /// A referenced row does not exist.
    ForeignKeyViolation { entity: EntityKind },
    /// Any other storage failure.
    Database { details: String },
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniqueViolation { entity } => {
                write!(f, "{entity} already exists")
            }
            Self::ForeignKeyViolation { entity } => {
                write!(f, "{entity} references a row that does not exist")
            }
            Self::Database { details } => write!(f, "database error: {details}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Errors returned by `GraphStore` and `OwnershipGuard` operations.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphStoreError {
    /// The entity does not exist, or does not exist within the addressed
    /// project.
    NotFound { entity: EntityKind, id: String },
    /// The entity exists but the caller does not own it.
    Unauthorized { entity: EntityKind, id: String },
    /// The node type id does not name a registered blueprint.
    UnknownNodeType { node_type_id: String },
    /// The configuration is well-formed JSON but breaks the blueprint's
    /// schema.
    InvalidConfiguration { violations: Vec<Violation> },
    /// The configuration is not well-formed JSON.
    MalformedConfiguration { reason: String },
    /// A connection endpoint or port is missing, misdirected, or mistyped.
    InvalidConnection { reason: String },
    /// A request argument is unusable.
    InvalidArgument { reason: String },
    /// The storage boundary failed.
    Storage { details: String },
}

impl GraphStoreError {
    /// Kinds that the request boundary renders as a uniform not-found so
    /// callers cannot probe for other users' data.
    #[must_use]
    pub fn is_not_visible(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Unauthorized { .. })
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_connection(reason: impl Into<String>) -> Self {
        Self::InvalidConnection {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for GraphStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Unauthorized { entity, id } => {
                write!(f, "caller does not own {entity} {id}")
            }
            Self::UnknownNodeType { node_type_id } => {
                write!(f, "unknown node type: {node_type_id}")
            }
            Self::InvalidConfiguration { violations } => {
                write!(
                    f,
                    "configuration failed validation with {} violation(s)",
                    violations.len()
                )
            }
            Self::MalformedConfiguration { reason } => {
                write!(f, "configuration is not valid JSON: {reason}")
            }
            Self::InvalidConnection { reason } => write!(f, "invalid connection: {reason}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::Storage { details } => write!(f, "storage failure: {details}"),
        }
    }
}

impl std::error::Error for GraphStoreError {}

impl From<ValidationError> for GraphStoreError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Invalid { violations } => Self::InvalidConfiguration { violations },
            ValidationError::MalformedConfig { reason } => Self::MalformedConfiguration { reason },
            ValidationError::MalformedSchema { reason } => Self::InvalidArgument { reason },
        }
    }
}
