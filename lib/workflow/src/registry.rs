//! The blueprint registry.
//!
//! `BlueprintRegistry` is the immutable catalog of node definitions. It is
//! assembled once at boot through `BlueprintRegistryBuilder`, which rejects
//! duplicate ids and inconsistent definitions, and then shared read-only
//! (typically behind an `Arc`) by every request.

use crate::definition::NodeDefinition;
use crate::error::{RegistryError, ValidationError};
use crate::schema::{ConfigSchema, parse_config};
use rootcause::prelude::Report;
use std::collections::HashMap;

/// A registered definition together with its compiled schema.
#[derive(Debug, Clone)]
pub struct Blueprint {
    definition: NodeDefinition,
    schema: Option<ConfigSchema>,
}

impl Blueprint {
    #[must_use]
    pub fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// The compiled configuration schema, if the definition declares one.
    #[must_use]
    pub fn schema(&self) -> Option<&ConfigSchema> {
        self.schema.as_ref()
    }

    /// Checks instance configuration text against this blueprint.
    ///
    /// The text must always be well-formed JSON. When the definition has no
    /// schema, any well-formed document is accepted.
    pub fn validate_config(&self, config: &str) -> Result<(), ValidationError> {
        match &self.schema {
            Some(schema) => schema.validate_str(config),
            None => parse_config(config).map(|_| ()),
        }
    }
}

/// Collects definitions before freezing them into a `BlueprintRegistry`.
#[derive(Debug, Default)]
pub struct BlueprintRegistryBuilder {
    blueprints: Vec<Blueprint>,
    index: HashMap<String, usize>,
}

impl BlueprintRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition.
    ///
    /// Fails with `DuplicateDefinition` if the id is already registered and
    /// with `InvalidDefinition` if the definition is inconsistent or its
    /// schema does not compile.
    pub fn register(&mut self, definition: NodeDefinition) -> Result<(), Report<RegistryError>> {
        if self.index.contains_key(&definition.id) {
            return Err(RegistryError::DuplicateDefinition {
                id: definition.id,
            }
            .into());
        }

        definition
            .check()
            .map_err(|reason| RegistryError::InvalidDefinition {
                id: definition.id.clone(),
                reason,
            })?;

        let schema = definition
            .schema()
            .map(ConfigSchema::compile)
            .transpose()
            .map_err(|e| RegistryError::InvalidDefinition {
                id: definition.id.clone(),
                reason: e.to_string(),
            })?;

        self.index
            .insert(definition.id.clone(), self.blueprints.len());
        self.blueprints.push(Blueprint { definition, schema });
        Ok(())
    }

    /// Adds a definition, builder style.
    pub fn with(mut self, definition: NodeDefinition) -> Result<Self, Report<RegistryError>> {
        self.register(definition)?;
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> BlueprintRegistry {
        BlueprintRegistry {
            blueprints: self.blueprints,
            index: self.index,
        }
    }
}

/// Read-only catalog of node definitions keyed by id.
///
/// Enumeration order is registration order.
#[derive(Debug, Clone, Default)]
pub struct BlueprintRegistry {
    blueprints: Vec<Blueprint>,
    index: HashMap<String, usize>,
}

impl BlueprintRegistry {
    #[must_use]
    pub fn builder() -> BlueprintRegistryBuilder {
        BlueprintRegistryBuilder::new()
    }

    /// Returns every definition in registration order.
    pub fn get_all(&self) -> impl ExactSizeIterator<Item = &NodeDefinition> {
        self.blueprints.iter().map(Blueprint::definition)
    }

    /// Looks up a blueprint by definition id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Blueprint> {
        self.index.get(id).map(|&i| &self.blueprints[i])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}
