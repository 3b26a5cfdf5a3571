//! In-process `GraphRepository`.
//!
//! Holds every table in ordered maps behind one lock, so each call is
//! atomic with respect to every other call. Maps are keyed by id, so
//! iteration is creation order. Used by the `memory` storage backend and by
//! tests.

use crate::entity::{ConnectionWrite, NodeConnection, NodeInstance, Project};
use crate::error::{EntityKind, RepositoryError};
use crate::repository::{GraphRepository, RepositoryResult};
use async_trait::async_trait;
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId, UserId};
use flowcanvas_platform_access::User;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Connection row as stored; the project is derived from the source node.
#[derive(Debug, Clone)]
struct ConnectionRow {
    from_node_instance_id: NodeInstanceId,
    from_port_name: String,
    to_node_instance_id: NodeInstanceId,
    to_port_name: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    projects: BTreeMap<ProjectId, Project>,
    nodes: BTreeMap<NodeInstanceId, NodeInstance>,
    connections: BTreeMap<NodeConnectionId, ConnectionRow>,
}

impl Tables {
    fn node_in(&self, project_id: ProjectId, id: NodeInstanceId) -> Option<&NodeInstance> {
        self.nodes.get(&id).filter(|node| node.project_id == project_id)
    }

    fn connection(&self, id: NodeConnectionId) -> Option<NodeConnection> {
        let row = self.connections.get(&id)?;
        let source = self.nodes.get(&row.from_node_instance_id)?;
        Some(NodeConnection {
            id,
            project_id: source.project_id,
            from_node_instance_id: row.from_node_instance_id,
            from_port_name: row.from_port_name.clone(),
            to_node_instance_id: row.to_node_instance_id,
            to_port_name: row.to_port_name.clone(),
        })
    }

    fn endpoints_in_project(&self, connection: &NodeConnection) -> bool {
        self.node_in(connection.project_id, connection.from_node_instance_id)
            .is_some()
            && self
                .node_in(connection.project_id, connection.to_node_instance_id)
                .is_some()
    }

    fn remove_node(&mut self, id: NodeInstanceId) {
        self.nodes.remove(&id);
        self.connections.retain(|_, row| {
            row.from_node_instance_id != id && row.to_node_instance_id != id
        });
    }
}

impl From<&NodeConnection> for ConnectionRow {
    fn from(connection: &NodeConnection) -> Self {
        Self {
            from_node_instance_id: connection.from_node_instance_id,
            from_port_name: connection.from_port_name.clone(),
            to_node_instance_id: connection.to_node_instance_id,
            to_port_name: connection.to_port_name.clone(),
        }
    }
}

/// Memory-backed repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphRepository for MemoryRepository {
    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if tables.usernames.contains_key(user.username()) {
            return Err(RepositoryError::UniqueViolation {
                entity: EntityKind::User,
            }
            .into());
        }
        tables
            .usernames
            .insert(user.username().to_string(), user.id());
        tables.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn find_project(&self, id: ProjectId) -> RepositoryResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn list_projects_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Project>> {
        Ok(self
            .tables
            .read()
            .await
            .projects
            .values()
            .filter(|project| project.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert_project(&self, project: &Project) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&project.owner_id) {
            return Err(RepositoryError::ForeignKeyViolation {
                entity: EntityKind::User,
            }
            .into());
        }
        tables.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn delete_project(&self, id: ProjectId) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }
        let doomed: Vec<NodeInstanceId> = tables
            .nodes
            .values()
            .filter(|node| node.project_id == id)
            .map(|node| node.id)
            .collect();
        for node_id in doomed {
            tables.remove_node(node_id);
        }
        Ok(true)
    }

    async fn list_nodes(&self, project_id: ProjectId) -> RepositoryResult<Vec<NodeInstance>> {
        Ok(self
            .tables
            .read()
            .await
            .nodes
            .values()
            .filter(|node| node.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn find_node(
        &self,
        project_id: ProjectId,
        id: NodeInstanceId,
    ) -> RepositoryResult<Option<NodeInstance>> {
        Ok(self.tables.read().await.node_in(project_id, id).cloned())
    }

    async fn insert_node(&self, node: &NodeInstance) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&node.project_id) {
            return Err(RepositoryError::ForeignKeyViolation {
                entity: EntityKind::Project,
            }
            .into());
        }
        tables.nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn update_node(&self, node: &NodeInstance) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.nodes.get_mut(&node.id) {
            Some(existing) if existing.project_id == node.project_id => {
                *existing = node.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_node(
        &self,
        project_id: ProjectId,
        id: NodeInstanceId,
    ) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.node_in(project_id, id).is_none() {
            return Ok(false);
        }
        tables.remove_node(id);
        Ok(true)
    }

    async fn list_connections(
        &self,
        project_id: ProjectId,
    ) -> RepositoryResult<Vec<NodeConnection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .connections
            .keys()
            .filter_map(|&id| tables.connection(id))
            .filter(|connection| connection.project_id == project_id)
            .collect())
    }

    async fn find_connection(
        &self,
        id: NodeConnectionId,
    ) -> RepositoryResult<Option<NodeConnection>> {
        Ok(self.tables.read().await.connection(id))
    }

    async fn insert_connection(
        &self,
        connection: &NodeConnection,
    ) -> RepositoryResult<ConnectionWrite> {
        let mut tables = self.tables.write().await;
        if !tables.endpoints_in_project(connection) {
            return Ok(ConnectionWrite::EndpointMissing);
        }
        tables
            .connections
            .insert(connection.id, ConnectionRow::from(connection));
        Ok(ConnectionWrite::Written)
    }

    async fn update_connection(
        &self,
        connection: &NodeConnection,
    ) -> RepositoryResult<ConnectionWrite> {
        let mut tables = self.tables.write().await;
        let in_project = tables
            .connection(connection.id)
            .is_some_and(|existing| existing.project_id == connection.project_id);
        if !in_project {
            return Ok(ConnectionWrite::ConnectionMissing);
        }
        if !tables.endpoints_in_project(connection) {
            return Ok(ConnectionWrite::EndpointMissing);
        }
        tables
            .connections
            .insert(connection.id, ConnectionRow::from(connection));
        Ok(ConnectionWrite::Written)
    }

    async fn delete_connection(
        &self,
        project_id: ProjectId,
        id: NodeConnectionId,
    ) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        let in_project = tables
            .connection(id)
            .is_some_and(|existing| existing.project_id == project_id);
        if in_project {
            tables.connections.remove(&id);
        }
        Ok(in_project)
    }
}
