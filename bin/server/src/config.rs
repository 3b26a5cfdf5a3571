//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use a double underscore, so `STORAGE__DATABASE_URL` sets
//! `storage.database_url`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory holding one `*.json` blueprint definition per file.
    #[serde(default = "default_definitions_dir")]
    pub definitions_dir: PathBuf,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Principal resolution configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Which `GraphRepository` implementation backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local tables; everything is lost on restart.
    Memory,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// PostgreSQL connection URL. Required for the postgres backend.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Upper bound on pooled database connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// How the caller's principal is taken from a request.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Header set by the authenticating front door.
    #[serde(default = "default_principal_header")]
    pub principal_header: String,

    /// Principal used when the header is absent. Development only.
    #[serde(default)]
    pub dev_fallback_principal: Option<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_definitions_dir() -> PathBuf {
    PathBuf::from("definitions")
}

fn default_max_connections() -> u32 {
    5
}

fn default_principal_header() -> String {
    "x-remote-user".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            principal_header: default_principal_header(),
            dev_fallback_principal: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, including a postgres
    /// backend without a database URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(
            config::Config::builder().add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres
            && self
                .storage
                .database_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Message(
                "storage.database_url is required for the postgres backend".to_string(),
            ));
        }
        if self.auth.principal_header.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.principal_header must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}
