//! Request and response contracts crossing the store boundary.
//!
//! All of these serialize with camelCase field names, which is the shape
//! the canvas client sends and expects.

use crate::entity::{NodeConnection, NodeInstance, Project};
use chrono::{DateTime, Utc};
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeInstanceRequest {
    pub node_type_id: String,
    /// Configuration document as JSON text.
    pub configuration_json: String,
    pub position_x: f64,
    pub position_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeInstanceRequest {
    pub id: NodeInstanceId,
    pub node_type_id: String,
    pub configuration_json: String,
    pub position_x: f64,
    pub position_y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeConnectionRequest {
    pub from_node_instance_id: NodeInstanceId,
    pub from_port_name: String,
    pub to_node_instance_id: NodeInstanceId,
    pub to_port_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeConnectionRequest {
    pub id: NodeConnectionId,
    pub from_node_instance_id: NodeInstanceId,
    pub from_port_name: String,
    pub to_node_instance_id: NodeInstanceId,
    pub to_port_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Project> for ProjectDto {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            created_at: project.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstanceDto {
    pub id: NodeInstanceId,
    pub project_id: ProjectId,
    pub node_type_id: String,
    pub configuration_json: String,
    pub position_x: f64,
    pub position_y: f64,
}

impl From<&NodeInstance> for NodeInstanceDto {
    fn from(node: &NodeInstance) -> Self {
        Self {
            id: node.id,
            project_id: node.project_id,
            node_type_id: node.node_type_id.clone(),
            configuration_json: node.configuration_json.clone(),
            position_x: node.position_x,
            position_y: node.position_y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConnectionDto {
    pub id: NodeConnectionId,
    pub from_node_instance_id: NodeInstanceId,
    pub from_port_name: String,
    pub to_node_instance_id: NodeInstanceId,
    pub to_port_name: String,
}

impl From<&NodeConnection> for NodeConnectionDto {
    fn from(connection: &NodeConnection) -> Self {
        Self {
            id: connection.id,
            from_node_instance_id: connection.from_node_instance_id,
            from_port_name: connection.from_port_name.clone(),
            to_node_instance_id: connection.to_node_instance_id,
            to_port_name: connection.to_port_name.clone(),
        }
    }
}
