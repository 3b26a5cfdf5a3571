//! The graph store.
//!
//! `GraphStore` exposes CRUD over projects, node instances, and node
//! connections. Every project-scoped operation first obtains a
//! `ProjectScope` from the `OwnershipGuard`; the node and connection
//! operations live in `nodes.rs` and `connections.rs`.

use crate::dto::ProjectDto;
use crate::entity::Project;
use crate::error::{EntityKind, GraphStoreError};
use crate::guard::{OwnershipGuard, ProjectScope, storage_error};
use crate::repository::GraphRepository;
use flowcanvas_core::ProjectId;
use flowcanvas_platform_access::Principal;
use flowcanvas_workflow::BlueprintRegistry;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{info, instrument};

/// Longest accepted project name, in characters.
pub const MAX_PROJECT_NAME_LEN: usize = 200;

/// Ownership-scoped CRUD over a user's workflow graphs.
#[derive(Clone)]
pub struct GraphStore {
    pub(crate) repo: Arc<dyn GraphRepository>,
    pub(crate) registry: Arc<BlueprintRegistry>,
    guard: OwnershipGuard,
}

impl GraphStore {
    #[must_use]
    pub fn new(repo: Arc<dyn GraphRepository>, registry: Arc<BlueprintRegistry>) -> Self {
        let guard = OwnershipGuard::new(repo.clone());
        Self {
            repo,
            registry,
            guard,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BlueprintRegistry {
        &self.registry
    }

    #[must_use]
    pub fn guard(&self) -> &OwnershipGuard {
        &self.guard
    }

    /// The authorization gate composed into every project-scoped operation.
    pub(crate) async fn scope(
        &self,
        project_id: ProjectId,
        principal: &Principal,
    ) -> Result<ProjectScope, Report<GraphStoreError>> {
        self.guard
            .ensure_project_ownership(project_id, principal)
            .await
    }

    /// Lists the caller's projects in creation order.
    #[instrument(skip_all, fields(principal = %principal))]
    pub async fn list_projects(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ProjectDto>, Report<GraphStoreError>> {
        let user = self.guard.resolve_user(principal).await?;
        let projects = self
            .repo
            .list_projects_by_owner(user.id())
            .await
            .map_err(storage_error)?;
        Ok(projects.iter().map(ProjectDto::from).collect())
    }

    #[instrument(skip_all, fields(principal = %principal, project_id = %id))]
    pub async fn get_project(
        &self,
        id: ProjectId,
        principal: &Principal,
    ) -> Result<ProjectDto, Report<GraphStoreError>> {
        let scope = self.scope(id, principal).await?;
        Ok(ProjectDto::from(scope.project()))
    }

    /// Creates a project owned by the caller.
    ///
    /// The name is trimmed; a blank name is `InvalidArgument`.
    #[instrument(skip_all, fields(principal = %principal))]
    pub async fn create_project(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<ProjectDto, Report<GraphStoreError>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GraphStoreError::InvalidArgument {
                reason: "project name must not be blank".to_string(),
            }
            .into());
        }
        if name.chars().count() > MAX_PROJECT_NAME_LEN {
            return Err(GraphStoreError::InvalidArgument {
                reason: format!("project name must be at most {MAX_PROJECT_NAME_LEN} characters"),
            }
            .into());
        }

        let user = self.guard.resolve_user(principal).await?;
        let project = Project::new(user.id(), name);
        self.repo
            .insert_project(&project)
            .await
            .map_err(storage_error)?;

        info!(project_id = %project.id, user_id = %user.id(), "created project");
        Ok(ProjectDto::from(&project))
    }

    /// Deletes a project with all of its node instances and connections.
    #[instrument(skip_all, fields(principal = %principal, project_id = %id))]
    pub async fn delete_project(
        &self,
        id: ProjectId,
        principal: &Principal,
    ) -> Result<(), Report<GraphStoreError>> {
        let scope = self.scope(id, principal).await?;
        let deleted = self
            .repo
            .delete_project(scope.project_id())
            .await
            .map_err(storage_error)?;
        if !deleted {
            return Err(GraphStoreError::not_found(EntityKind::Project, id).into());
        }

        info!("deleted project");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{CreateNodeConnectionRequest, CreateNodeInstanceRequest};
    use crate::testing::{HTTP_CONFIG, principal, store, store_with_repo};

    #[tokio::test]
    async fn create_and_list_projects() {
        let store = store();
        let alice = principal("alice");

        let demo = store.create_project(&alice, "  Demo ").await.expect("create");
        assert_eq!(demo.name, "Demo");
        store.create_project(&alice, "Second").await.expect("create");
        store
            .create_project(&principal("bob"), "Bob's")
            .await
            .expect("create");

        let names: Vec<String> = store
            .list_projects(&alice)
            .await
            .expect("list")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Demo", "Second"]);
    }

    #[tokio::test]
    async fn list_keeps_creation_order_for_many_projects() {
        let store = store();
        let alice = principal("alice");

        let mut created = Vec::new();
        for n in 0..200 {
            let project = store
                .create_project(&alice, &format!("Project {n}"))
                .await
                .expect("create");
            created.push(project.name);
        }

        let listed: Vec<String> = store
            .list_projects(&alice)
            .await
            .expect("list")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(listed, created);
    }

    #[tokio::test]
    async fn blank_name_is_invalid_argument() {
        let store = store();
        let err = store
            .create_project(&principal("alice"), "   ")
            .await
            .expect_err("blank");
        assert!(matches!(
            err.current_context(),
            GraphStoreError::InvalidArgument { .. }
        ));
    }

    #[tokio::test]
    async fn other_user_cannot_get_project() {
        let store = store();
        let project = store
            .create_project(&principal("alice"), "Demo")
            .await
            .expect("create");

        let err = store
            .get_project(project.id, &principal("bob"))
            .await
            .expect_err("not bob's");
        assert!(err.current_context().is_not_visible());

        let fetched = store
            .get_project(project.id, &principal("Alice"))
            .await
            .expect("alice's");
        assert_eq!(fetched, project);
    }

    #[tokio::test]
    async fn other_user_cannot_delete_project() {
        let store = store();
        let project = store
            .create_project(&principal("alice"), "Demo")
            .await
            .expect("create");

        let err = store
            .delete_project(project.id, &principal("bob"))
            .await
            .expect_err("not bob's");
        assert!(err.current_context().is_not_visible());
        assert!(store.get_project(project.id, &principal("alice")).await.is_ok());
    }

    #[tokio::test]
    async fn delete_project_twice_is_not_found() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("create");

        store.delete_project(project.id, &alice).await.expect("delete");
        let err = store
            .delete_project(project.id, &alice)
            .await
            .expect_err("already gone");
        assert!(matches!(
            err.current_context(),
            GraphStoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn delete_project_cascades_to_graph() {
        let (repo, store) = store_with_repo();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("create");
        let http = store
            .create_node(
                project.id,
                &alice,
                CreateNodeInstanceRequest {
                    node_type_id: "http-request".to_string(),
                    configuration_json: HTTP_CONFIG.to_string(),
                    position_x: 10.0,
                    position_y: 20.0,
                },
            )
            .await
            .expect("node");
        let connection = store
            .create_connection(
                project.id,
                &alice,
                CreateNodeConnectionRequest {
                    from_node_instance_id: http.id,
                    from_port_name: "response".to_string(),
                    to_node_instance_id: http.id,
                    to_port_name: "input".to_string(),
                },
            )
            .await
            .expect("connection");

        store.delete_project(project.id, &alice).await.expect("delete");

        assert!(repo.list_nodes(project.id).await.expect("nodes").is_empty());
        assert!(repo
            .find_connection(connection.id)
            .await
            .expect("connection")
            .is_none());
    }
}
