//! Port system for node blueprints.
//!
//! Ports are named attachment points on a node. Each port carries a free-form
//! type tag (for example `object` or `string`) that the canvas uses to colour
//! handles and the graph store uses to reject obviously mismatched
//! connections.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag that is compatible with every other tag.
pub const ANY_PORT_TYPE: &str = "any";

/// A named, typed port declared by a node definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDefinition {
    /// The name of this port, unique within its direction on a definition.
    pub name: String,
    /// Free-form data type tag.
    #[serde(rename = "type")]
    pub data_type: String,
}

impl PortDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Checks if data leaving this port may flow into `target`.
    ///
    /// Tags match case-insensitively, and `any` on either side matches
    /// everything.
    #[must_use]
    pub fn is_compatible_with(&self, target: &Self) -> bool {
        let source = self.data_type.trim();
        let target = target.data_type.trim();
        source.eq_ignore_ascii_case(ANY_PORT_TYPE)
            || target.eq_ignore_ascii_case(ANY_PORT_TYPE)
            || source.eq_ignore_ascii_case(target)
    }
}

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}
