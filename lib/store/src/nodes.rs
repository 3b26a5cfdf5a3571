//! Node instance operations.

use crate::dto::{CreateNodeInstanceRequest, NodeInstanceDto, UpdateNodeInstanceRequest};
use crate::entity::NodeInstance;
use crate::error::{EntityKind, GraphStoreError, RepositoryError};
use crate::guard::{ProjectScope, storage_error};
use crate::store::GraphStore;
use flowcanvas_core::{NodeInstanceId, ProjectId};
use flowcanvas_platform_access::Principal;
use rootcause::prelude::Report;
use tracing::{info, instrument, warn};

impl GraphStore {
    /// Lists a project's node instances in creation order.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id))]
    pub async fn list_nodes(
        &self,
        project_id: ProjectId,
        principal: &Principal,
    ) -> Result<Vec<NodeInstanceDto>, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        let nodes = self
            .repo
            .list_nodes(scope.project_id())
            .await
            .map_err(storage_error)?;
        Ok(nodes.iter().map(NodeInstanceDto::from).collect())
    }

    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, node_id = %node_id))]
    pub async fn get_node(
        &self,
        project_id: ProjectId,
        node_id: NodeInstanceId,
        principal: &Principal,
    ) -> Result<NodeInstanceDto, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        let node = self.node_in_scope(&scope, node_id).await?;
        Ok(NodeInstanceDto::from(&node))
    }

    /// Places a new node instance.
    ///
    /// The node type must be registered and the configuration must satisfy
    /// its blueprint.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, node_type_id = %request.node_type_id))]
    pub async fn create_node(
        &self,
        project_id: ProjectId,
        principal: &Principal,
        request: CreateNodeInstanceRequest,
    ) -> Result<NodeInstanceDto, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        self.check_node_write(
            &request.node_type_id,
            &request.configuration_json,
            request.position_x,
            request.position_y,
        )?;

        let node = NodeInstance {
            id: NodeInstanceId::new(),
            project_id: scope.project_id(),
            node_type_id: request.node_type_id,
            configuration_json: request.configuration_json,
            position_x: request.position_x,
            position_y: request.position_y,
        };

        self.repo.insert_node(&node).await.map_err(|report| {
            if matches!(
                report.current_context(),
                RepositoryError::ForeignKeyViolation { .. }
            ) {
                GraphStoreError::not_found(EntityKind::Project, project_id).into()
            } else {
                storage_error(report)
            }
        })?;

        info!(node_id = %node.id, "created node instance");
        Ok(NodeInstanceDto::from(&node))
    }

    /// Replaces a node instance's type, configuration, and position.
    ///
    /// An id that is absent from the project is `NotFound`; nothing is
    /// created. Concurrent updates are last-write-wins.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, node_id = %request.id))]
    pub async fn update_node(
        &self,
        project_id: ProjectId,
        principal: &Principal,
        request: UpdateNodeInstanceRequest,
    ) -> Result<NodeInstanceDto, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        self.node_in_scope(&scope, request.id).await?;
        self.check_node_write(
            &request.node_type_id,
            &request.configuration_json,
            request.position_x,
            request.position_y,
        )?;

        let node = NodeInstance {
            id: request.id,
            project_id: scope.project_id(),
            node_type_id: request.node_type_id,
            configuration_json: request.configuration_json,
            position_x: request.position_x,
            position_y: request.position_y,
        };

        let updated = self.repo.update_node(&node).await.map_err(storage_error)?;
        if !updated {
            return Err(GraphStoreError::not_found(EntityKind::NodeInstance, node.id).into());
        }

        info!("updated node instance");
        Ok(NodeInstanceDto::from(&node))
    }

    /// Deletes a node instance and every connection touching it.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, node_id = %node_id))]
    pub async fn delete_node(
        &self,
        project_id: ProjectId,
        principal: &Principal,
        node_id: NodeInstanceId,
    ) -> Result<(), Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        let deleted = self
            .repo
            .delete_node(scope.project_id(), node_id)
            .await
            .map_err(storage_error)?;
        if !deleted {
            return Err(GraphStoreError::not_found(EntityKind::NodeInstance, node_id).into());
        }

        info!("deleted node instance");
        Ok(())
    }

    pub(crate) async fn node_in_scope(
        &self,
        scope: &ProjectScope,
        node_id: NodeInstanceId,
    ) -> Result<NodeInstance, Report<GraphStoreError>> {
        self.repo
            .find_node(scope.project_id(), node_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| GraphStoreError::not_found(EntityKind::NodeInstance, node_id).into())
    }

    /// Write-path checks: registered type, valid configuration, finite
    /// position.
    fn check_node_write(
        &self,
        node_type_id: &str,
        configuration_json: &str,
        position_x: f64,
        position_y: f64,
    ) -> Result<(), Report<GraphStoreError>> {
        let blueprint = self.registry.get(node_type_id).ok_or_else(|| {
            warn!(node_type_id, "rejected unknown node type");
            GraphStoreError::UnknownNodeType {
                node_type_id: node_type_id.to_string(),
            }
        })?;

        blueprint
            .validate_config(configuration_json)
            .map_err(|err| {
                warn!(node_type_id, error = %err, "rejected node configuration");
                GraphStoreError::from(err)
            })?;

        if !position_x.is_finite() || !position_y.is_finite() {
            return Err(GraphStoreError::InvalidArgument {
                reason: "position must be finite".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HTTP_CONFIG, principal, store};

    fn create_request(node_type_id: &str, configuration_json: &str) -> CreateNodeInstanceRequest {
        CreateNodeInstanceRequest {
            node_type_id: node_type_id.to_string(),
            configuration_json: configuration_json.to_string(),
            position_x: 10.0,
            position_y: 20.0,
        }
    }

    #[tokio::test]
    async fn create_and_read_back_byte_identical() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");

        let config = "{ \"method\" : \"GET\",\n  \"url\": \"https://x\" }";
        let created = store
            .create_node(project.id, &alice, create_request("http-request", config))
            .await
            .expect("create");

        let fetched = store
            .get_node(project.id, created.id, &alice)
            .await
            .expect("get");
        assert_eq!(fetched.configuration_json, config);
        assert_eq!(fetched.position_x, 10.0);
        assert_eq!(fetched.position_y, 20.0);
        assert_eq!(fetched.project_id, project.id);
    }

    #[tokio::test]
    async fn unknown_node_type_is_rejected() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");

        let err = store
            .create_node(project.id, &alice, create_request("does-not-exist", "{}"))
            .await
            .expect_err("unknown type");
        assert_eq!(
            err.current_context(),
            &GraphStoreError::UnknownNodeType {
                node_type_id: "does-not-exist".to_string()
            }
        );
        assert!(store.list_nodes(project.id, &alice).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn invalid_configuration_lists_every_violation() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");

        let err = store
            .create_node(
                project.id,
                &alice,
                create_request("http-request", r#"{"method":"FETCH"}"#),
            )
            .await
            .expect_err("invalid");
        match err.current_context() {
            GraphStoreError::InvalidConfiguration { violations } => {
                assert_eq!(violations.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_configuration_is_distinct() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");

        let err = store
            .create_node(project.id, &alice, create_request("conditional-branch", "{oops"))
            .await
            .expect_err("malformed");
        assert!(matches!(
            err.current_context(),
            GraphStoreError::MalformedConfiguration { .. }
        ));
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");
        let created = store
            .create_node(project.id, &alice, create_request("http-request", HTTP_CONFIG))
            .await
            .expect("create");

        let updated = store
            .update_node(
                project.id,
                &alice,
                UpdateNodeInstanceRequest {
                    id: created.id,
                    node_type_id: "conditional-branch".to_string(),
                    configuration_json: r#"{"condition":"x > 1"}"#.to_string(),
                    position_x: -5.5,
                    position_y: 42.0,
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.node_type_id, "conditional-branch");

        let fetched = store
            .get_node(project.id, created.id, &alice)
            .await
            .expect("get");
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn update_of_missing_node_never_creates() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");
        let ghost = NodeInstanceId::new();

        let err = store
            .update_node(
                project.id,
                &alice,
                UpdateNodeInstanceRequest {
                    id: ghost,
                    node_type_id: "http-request".to_string(),
                    configuration_json: HTTP_CONFIG.to_string(),
                    position_x: 0.0,
                    position_y: 0.0,
                },
            )
            .await
            .expect_err("missing");
        assert!(matches!(
            err.current_context(),
            GraphStoreError::NotFound { .. }
        ));
        assert!(store.list_nodes(project.id, &alice).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn update_of_node_in_other_project_is_not_found() {
        let store = store();
        let alice = principal("alice");
        let first = store.create_project(&alice, "First").await.expect("project");
        let second = store.create_project(&alice, "Second").await.expect("project");
        let node = store
            .create_node(first.id, &alice, create_request("http-request", HTTP_CONFIG))
            .await
            .expect("create");

        let err = store
            .update_node(
                second.id,
                &alice,
                UpdateNodeInstanceRequest {
                    id: node.id,
                    node_type_id: "http-request".to_string(),
                    configuration_json: HTTP_CONFIG.to_string(),
                    position_x: 1.0,
                    position_y: 1.0,
                },
            )
            .await
            .expect_err("wrong project");
        assert!(matches!(
            err.current_context(),
            GraphStoreError::NotFound { .. }
        ));

        let unchanged = store.get_node(first.id, node.id, &alice).await.expect("get");
        assert_eq!(unchanged.position_x, 10.0);
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");
        let node = store
            .create_node(project.id, &alice, create_request("http-request", HTTP_CONFIG))
            .await
            .expect("create");

        store
            .delete_node(project.id, &alice, node.id)
            .await
            .expect("delete");
        let err = store
            .delete_node(project.id, &alice, node.id)
            .await
            .expect_err("already deleted");
        assert!(matches!(
            err.current_context(),
            GraphStoreError::NotFound {
                entity: EntityKind::NodeInstance,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn other_user_cannot_touch_nodes() {
        let store = store();
        let alice = principal("alice");
        let bob = principal("bob");
        let project = store.create_project(&alice, "Demo").await.expect("project");
        let node = store
            .create_node(project.id, &alice, create_request("http-request", HTTP_CONFIG))
            .await
            .expect("create");

        let get = store.get_node(project.id, node.id, &bob).await;
        let list = store.list_nodes(project.id, &bob).await;
        let delete = store.delete_node(project.id, &bob, node.id).await;
        for err in [
            get.map(|_| ()).expect_err("get"),
            list.map(|_| ()).expect_err("list"),
            delete.expect_err("delete"),
        ] {
            assert!(err.current_context().is_not_visible());
        }

        assert!(store.get_node(project.id, node.id, &alice).await.is_ok());
    }

    #[tokio::test]
    async fn non_finite_position_is_invalid_argument() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");
        let mut request = create_request("conditional-branch", "{}");
        request.position_x = f64::NAN;

        let err = store
            .create_node(project.id, &alice, request)
            .await
            .expect_err("nan");
        assert!(matches!(
            err.current_context(),
            GraphStoreError::InvalidArgument { .. }
        ));
    }

    #[tokio::test]
    async fn list_keeps_creation_order_for_many_nodes() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");

        let mut created = Vec::new();
        for _ in 0..150 {
            let node = store
                .create_node(project.id, &alice, create_request("http-request", HTTP_CONFIG))
                .await
                .expect("create");
            created.push(node.id);
        }

        let listed: Vec<NodeInstanceId> = store
            .list_nodes(project.id, &alice)
            .await
            .expect("list")
            .into_iter()
            .map(|node| node.id)
            .collect();
        assert_eq!(listed, created);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deletes_succeed_once() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");
        let node = store
            .create_node(project.id, &alice, create_request("http-request", HTTP_CONFIG))
            .await
            .expect("create");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let alice = alice.clone();
                tokio::spawn(async move { store.delete_node(project.id, &alice, node.id).await })
            })
            .collect();

        let mut deleted = 0;
        for task in tasks {
            match task.await.expect("join") {
                Ok(()) => deleted += 1,
                Err(err) => assert!(matches!(
                    err.current_context(),
                    GraphStoreError::NotFound { .. }
                )),
            }
        }
        assert_eq!(deleted, 1);
    }
}
