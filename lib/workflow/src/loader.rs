//! Loads node definitions from disk.
//!
//! Every `*.json` file directly inside the definitions directory holds one
//! `NodeDefinition`. Files are read in file-name order so registry
//! enumeration order is reproducible. Any unreadable, malformed, duplicate,
//! or inconsistent definition aborts the whole load.

use crate::definition::NodeDefinition;
use crate::error::RegistryError;
use crate::registry::{BlueprintRegistry, BlueprintRegistryBuilder};
use rootcause::prelude::Report;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Parses one definition document.
pub fn parse_definition(text: &str, location: &str) -> Result<NodeDefinition, RegistryError> {
    serde_json::from_str(text).map_err(|e| RegistryError::LoadFailure {
        location: location.to_string(),
        reason: e.to_string(),
    })
}

/// Builds a registry from every definition file in `dir`.
///
/// An empty directory yields an empty registry; a missing directory is a
/// load failure.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_definitions(dir: &Path) -> Result<BlueprintRegistry, Report<RegistryError>> {
    let mut builder = BlueprintRegistryBuilder::new();

    for path in definition_files(dir)? {
        let location = path.display().to_string();
        let text = fs::read_to_string(&path).map_err(|e| RegistryError::LoadFailure {
            location: location.clone(),
            reason: e.to_string(),
        })?;
        let definition = parse_definition(&text, &location)?;
        debug!(id = %definition.id, file = %location, "registering node definition");
        builder.register(definition)?;
    }

    let registry = builder.build();
    info!(count = registry.len(), "loaded node definitions");
    Ok(registry)
}

fn definition_files(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let load_failure = |e: std::io::Error| RegistryError::LoadFailure {
        location: dir.display().to_string(),
        reason: e.to_string(),
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(load_failure)? {
        let path = entry.map_err(load_failure)?.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
