//! Node definition types.
//!
//! A node definition (blueprint) describes one kind of node the canvas can
//! place:
//! - Identity (`id`, `name`, `description`, `node_type`)
//! - An optional JSON Schema for instance configuration
//! - Declared input and output ports
//! - Optional visual metadata for the palette

use crate::port::{PortDefinition, PortDirection};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

fn default_icon() -> String {
    "default".to_string()
}

fn default_color() -> String {
    "#CCCCCC".to_string()
}

fn default_category() -> String {
    "Uncategorized".to_string()
}

/// Palette presentation for a node definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualMetadata {
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_category")]
    pub category: String,
}

impl Default for VisualMetadata {
    fn default() -> Self {
        Self {
            icon: default_icon(),
            color: default_color(),
            category: default_category(),
        }
    }
}

/// Blueprint for a kind of node.
///
/// The serialized form is the definition file format and also the read
/// model returned by the node catalog endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Unique key, referenced by node instances as their type.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Category tag such as `action` or `logic`.
    pub node_type: String,
    /// JSON Schema for instance configuration. Absent means any JSON is
    /// accepted.
    #[serde(default)]
    pub configuration_schema_json: Option<JsonValue>,
    #[serde(default)]
    pub inputs: Vec<PortDefinition>,
    #[serde(default)]
    pub outputs: Vec<PortDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualMetadata>,
}

impl NodeDefinition {
    /// Creates a definition with no schema and no ports.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            node_type: node_type.into(),
            configuration_schema_json: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            visual: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the configuration schema.
    #[must_use]
    pub fn with_schema(mut self, schema: JsonValue) -> Self {
        self.configuration_schema_json = Some(schema);
        self
    }

    /// Adds an input port.
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.inputs.push(PortDefinition::new(name, data_type));
        self
    }

    /// Adds an output port.
    #[must_use]
    pub fn with_output(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.outputs.push(PortDefinition::new(name, data_type));
        self
    }

    /// Sets the visual metadata.
    #[must_use]
    pub fn with_visual(mut self, visual: VisualMetadata) -> Self {
        self.visual = Some(visual);
        self
    }

    /// Returns the schema document, treating JSON `null` as absent.
    #[must_use]
    pub fn schema(&self) -> Option<&JsonValue> {
        self.configuration_schema_json
            .as_ref()
            .filter(|schema| !schema.is_null())
    }

    /// Returns the ports declared in `direction`.
    #[must_use]
    pub fn ports(&self, direction: PortDirection) -> &[PortDefinition] {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    /// Looks up a declared port by direction and name.
    #[must_use]
    pub fn port(&self, direction: PortDirection, name: &str) -> Option<&PortDefinition> {
        self.ports(direction).iter().find(|port| port.name == name)
    }

    /// Checks structural consistency: non-blank identity and unique,
    /// non-blank port names per direction.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be blank".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be blank".to_string());
        }
        for direction in [PortDirection::Input, PortDirection::Output] {
            let ports = self.ports(direction);
            for (i, port) in ports.iter().enumerate() {
                if port.name.trim().is_empty() {
                    return Err(format!("{direction} port #{i} has a blank name"));
                }
                if ports[..i].iter().any(|earlier| earlier.name == port.name) {
                    return Err(format!(
                        "{direction} port '{}' is declared more than once",
                        port.name
                    ));
                }
            }
        }
        Ok(())
    }
}
