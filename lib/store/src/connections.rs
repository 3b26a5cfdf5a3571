//! Node connection operations.

use crate::dto::{CreateNodeConnectionRequest, NodeConnectionDto, UpdateNodeConnectionRequest};
use crate::entity::{ConnectionWrite, NodeConnection};
use crate::error::{EntityKind, GraphStoreError};
use crate::guard::{ProjectScope, storage_error};
use crate::store::GraphStore;
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId};
use flowcanvas_platform_access::Principal;
use flowcanvas_workflow::{PortDefinition, PortDirection};
use rootcause::prelude::Report;
use tracing::{info, instrument, warn};

impl GraphStore {
    /// Lists connections whose source endpoint is in the project.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id))]
    pub async fn list_connections(
        &self,
        project_id: ProjectId,
        principal: &Principal,
    ) -> Result<Vec<NodeConnectionDto>, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        let connections = self
            .repo
            .list_connections(scope.project_id())
            .await
            .map_err(storage_error)?;
        Ok(connections.iter().map(NodeConnectionDto::from).collect())
    }

    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, connection_id = %connection_id))]
    pub async fn get_connection(
        &self,
        project_id: ProjectId,
        connection_id: NodeConnectionId,
        principal: &Principal,
    ) -> Result<NodeConnectionDto, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        let connection = self.guard().connection_in_scope(&scope, connection_id).await?;
        Ok(NodeConnectionDto::from(&connection))
    }

    /// Connects an output port to an input port within one project.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id))]
    pub async fn create_connection(
        &self,
        project_id: ProjectId,
        principal: &Principal,
        request: CreateNodeConnectionRequest,
    ) -> Result<NodeConnectionDto, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        let connection = NodeConnection {
            id: NodeConnectionId::new(),
            project_id: scope.project_id(),
            from_node_instance_id: request.from_node_instance_id,
            from_port_name: request.from_port_name,
            to_node_instance_id: request.to_node_instance_id,
            to_port_name: request.to_port_name,
        };
        self.check_connection(&scope, &connection).await?;

        let write = self
            .repo
            .insert_connection(&connection)
            .await
            .map_err(storage_error)?;
        finish_write(write, connection.id)?;

        info!(connection_id = %connection.id, "created node connection");
        Ok(NodeConnectionDto::from(&connection))
    }

    /// Re-targets an existing connection.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, connection_id = %request.id))]
    pub async fn update_connection(
        &self,
        project_id: ProjectId,
        principal: &Principal,
        request: UpdateNodeConnectionRequest,
    ) -> Result<NodeConnectionDto, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        self.guard().connection_in_scope(&scope, request.id).await?;

        let connection = NodeConnection {
            id: request.id,
            project_id: scope.project_id(),
            from_node_instance_id: request.from_node_instance_id,
            from_port_name: request.from_port_name,
            to_node_instance_id: request.to_node_instance_id,
            to_port_name: request.to_port_name,
        };
        self.check_connection(&scope, &connection).await?;

        let write = self
            .repo
            .update_connection(&connection)
            .await
            .map_err(storage_error)?;
        finish_write(write, connection.id)?;

        info!("updated node connection");
        Ok(NodeConnectionDto::from(&connection))
    }

    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, connection_id = %connection_id))]
    pub async fn delete_connection(
        &self,
        project_id: ProjectId,
        principal: &Principal,
        connection_id: NodeConnectionId,
    ) -> Result<(), Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        self.guard().connection_in_scope(&scope, connection_id).await?;

        let deleted = self
            .repo
            .delete_connection(scope.project_id(), connection_id)
            .await
            .map_err(storage_error)?;
        if !deleted {
            return Err(
                GraphStoreError::not_found(EntityKind::NodeConnection, connection_id).into(),
            );
        }

        info!("deleted node connection");
        Ok(())
    }

    /// Both endpoints must be in the project, the ports must be declared in
    /// the right direction by each endpoint's blueprint, and their type tags
    /// must be compatible.
    async fn check_connection(
        &self,
        scope: &ProjectScope,
        connection: &NodeConnection,
    ) -> Result<(), Report<GraphStoreError>> {
        let source = self
            .endpoint_port(
                scope,
                connection.from_node_instance_id,
                PortDirection::Output,
                &connection.from_port_name,
            )
            .await?;
        let target = self
            .endpoint_port(
                scope,
                connection.to_node_instance_id,
                PortDirection::Input,
                &connection.to_port_name,
            )
            .await?;

        if !source.is_compatible_with(&target) {
            warn!(
                from_type = %source.data_type,
                to_type = %target.data_type,
                "rejected connection between incompatible ports"
            );
            return Err(GraphStoreError::invalid_connection(format!(
                "output port '{}' carries '{}' but input port '{}' accepts '{}'",
                source.name, source.data_type, target.name, target.data_type
            ))
            .into());
        }

        Ok(())
    }

    async fn endpoint_port(
        &self,
        scope: &ProjectScope,
        node_id: NodeInstanceId,
        direction: PortDirection,
        port_name: &str,
    ) -> Result<PortDefinition, Report<GraphStoreError>> {
        let role = match direction {
            PortDirection::Output => "source",
            PortDirection::Input => "target",
        };

        let node = self
            .repo
            .find_node(scope.project_id(), node_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| {
                warn!(node_id = %node_id, role, "rejected dangling connection endpoint");
                GraphStoreError::invalid_connection(format!(
                    "{role} node {node_id} is not in project {}",
                    scope.project_id()
                ))
            })?;

        let blueprint = self.registry.get(&node.node_type_id).ok_or_else(|| {
            GraphStoreError::invalid_connection(format!(
                "{role} node {node_id} has unknown type '{}'",
                node.node_type_id
            ))
        })?;

        let port = blueprint
            .definition()
            .port(direction, port_name)
            .ok_or_else(|| {
                warn!(node_id = %node_id, port_name, %direction, "rejected undeclared port");
                GraphStoreError::invalid_connection(format!(
                    "'{}' has no {direction} port named '{port_name}'",
                    node.node_type_id
                ))
            })?;

        Ok(port.clone())
    }
}

fn finish_write(
    write: ConnectionWrite,
    connection_id: NodeConnectionId,
) -> Result<(), Report<GraphStoreError>> {
    match write {
        ConnectionWrite::Written => Ok(()),
        ConnectionWrite::ConnectionMissing => {
            Err(GraphStoreError::not_found(EntityKind::NodeConnection, connection_id).into())
        }
        ConnectionWrite::EndpointMissing => Err(GraphStoreError::invalid_connection(
            "an endpoint was removed from the project while connecting",
        )
        .into()),
    }
}
