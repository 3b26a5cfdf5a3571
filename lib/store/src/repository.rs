//! The storage boundary.
//!
//! `GraphRepository` is the only way the store touches persisted rows.
//! Implementations must provide row-level atomicity for each call and the
//! cascade rules below; the store never assumes multi-call transactions.
//!
//! - Deleting a project removes its node instances.
//! - Deleting a node instance removes every connection touching it.
//! - Usernames are unique.
//!
//! Ids are minted from a monotonic generator, so "creation order" below is
//! ascending id order.

use crate::entity::{ConnectionWrite, NodeConnection, NodeInstance, Project};
use crate::error::RepositoryError;
use async_trait::async_trait;
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId, UserId};
use flowcanvas_platform_access::User;

pub type RepositoryResult<T> = flowcanvas_core::Result<T, RepositoryError>;

#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Fails with `UniqueViolation` if the username is taken.
    async fn insert_user(&self, user: &User) -> RepositoryResult<()>;

    async fn find_project(&self, id: ProjectId) -> RepositoryResult<Option<Project>>;

    /// Lists an owner's projects in creation order.
    async fn list_projects_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Project>>;

    /// Fails with `ForeignKeyViolation` if the owner does not exist.
    async fn insert_project(&self, project: &Project) -> RepositoryResult<()>;

    /// Returns false if nothing was deleted.
    async fn delete_project(&self, id: ProjectId) -> RepositoryResult<bool>;

    /// Lists a project's node instances in creation order.
    async fn list_nodes(&self, project_id: ProjectId) -> RepositoryResult<Vec<NodeInstance>>;

    async fn find_node(
        &self,
        project_id: ProjectId,
        id: NodeInstanceId,
    ) -> RepositoryResult<Option<NodeInstance>>;

    /// Fails with `ForeignKeyViolation` if the project does not exist.
    async fn insert_node(&self, node: &NodeInstance) -> RepositoryResult<()>;

    /// Overwrites the row matching both `node.id` and `node.project_id`.
    /// Returns false, and writes nothing, if there is no such row.
    async fn update_node(&self, node: &NodeInstance) -> RepositoryResult<bool>;

    async fn delete_node(&self, project_id: ProjectId, id: NodeInstanceId)
    -> RepositoryResult<bool>;

    /// Lists connections whose source endpoint is in the project, in
    /// creation order.
    async fn list_connections(&self, project_id: ProjectId)
    -> RepositoryResult<Vec<NodeConnection>>;

    /// Finds a connection regardless of project. The returned
    /// `project_id` is the source endpoint's project.
    async fn find_connection(&self, id: NodeConnectionId)
    -> RepositoryResult<Option<NodeConnection>>;

    /// Inserts only if both endpoints are in `connection.project_id`.
    async fn insert_connection(&self, connection: &NodeConnection)
    -> RepositoryResult<ConnectionWrite>;

    /// Overwrites the endpoints of the connection with this id whose current
    /// source endpoint is in `connection.project_id`, provided both new
    /// endpoints are in that project too.
    async fn update_connection(&self, connection: &NodeConnection)
    -> RepositoryResult<ConnectionWrite>;

    /// Deletes the connection if its source endpoint is in the project.
    async fn delete_connection(
        &self,
        project_id: ProjectId,
        id: NodeConnectionId,
    ) -> RepositoryResult<bool>;
}
