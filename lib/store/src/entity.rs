//! Persisted graph entities.
//!
//! These are the rows behind the storage boundary. Configuration stays an
//! opaque JSON string here; it is validated on the way in and returned
//! byte-for-byte on the way out.

use chrono::{DateTime, Utc};
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId, UserId};
use serde::{Deserialize, Serialize};

/// One workflow canvas owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Project {
    #[must_use]
    pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// A placed, configured occurrence of a blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: NodeInstanceId,
    pub project_id: ProjectId,
    /// Id of the blueprint this instance was created from.
    pub node_type_id: String,
    /// Configuration document exactly as the client sent it.
    pub configuration_json: String,
    pub position_x: f64,
    pub position_y: f64,
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConnection {
    pub id: NodeConnectionId,
    /// Project of the source endpoint. Derived, not stored separately.
    pub project_id: ProjectId,
    pub from_node_instance_id: NodeInstanceId,
    pub from_port_name: String,
    pub to_node_instance_id: NodeInstanceId,
    pub to_port_name: String,
}

impl NodeConnection {
    /// Returns true if either endpoint is `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: NodeInstanceId) -> bool {
        self.from_node_instance_id == node_id || self.to_node_instance_id == node_id
    }
}

/// Outcome of a conditional connection write.
///
/// Connection writes only land when both endpoints belong to the addressed
/// project at the moment of the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionWrite {
    Written,
    /// No connection with that id exists in the project.
    ConnectionMissing,
    /// An endpoint instance is absent from the project.
    EndpointMissing,
}
