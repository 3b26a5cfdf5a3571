//! User domain type.
//!
//! A User is the persisted identity behind a principal name. Users are
//! created on first contact and never renamed, so the username is a stable
//! natural key alongside the internal `UserId`.

use chrono::{DateTime, Utc};
use flowcanvas_core::UserId;
use serde::{Deserialize, Serialize};

/// A known caller of the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal platform user ID.
    id: UserId,
    /// Normalized (trimmed, lowercased) username; unique across users.
    username: String,
    /// When the user record was created.
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user record for a normalized username.
    ///
    /// The user ID is generated automatically. Use this on first contact
    /// with a principal.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    pub fn with_all_fields(id: UserId, username: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            created_at,
        }
    }

    /// Returns the user's internal platform ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
