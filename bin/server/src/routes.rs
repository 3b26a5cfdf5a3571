//! JSON handlers.
//!
//! Handlers only translate between HTTP and `GraphStore`; every ownership
//! and integrity decision is made by the store.

use crate::{AppState, error::ApiError, principal::RequirePrincipal};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId};
use flowcanvas_store::{
    CreateNodeConnectionRequest, CreateNodeInstanceRequest, CreateProjectRequest, EntityKind,
    GraphStoreError, NodeConnectionDto, NodeInstanceDto, ProjectDto, ProjectGraphDto,
    UpdateNodeConnectionRequest, UpdateNodeInstanceRequest,
};
use flowcanvas_workflow::NodeDefinition;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

type ApiResult<T> = Result<T, ApiError>;

/// Parses a path id. An id that cannot parse names nothing, so it is a
/// not-found like any other.
fn path_id<T: FromStr>(raw: &str, entity: EntityKind) -> ApiResult<T> {
    raw.parse().map_err(|_| {
        ApiError::Store(GraphStoreError::NotFound {
            entity,
            id: raw.to_string(),
        })
    })
}

fn check_payload_id<T: PartialEq + std::fmt::Display>(path: T, payload: T) -> ApiResult<()> {
    if path != payload {
        return Err(ApiError::BadRequest {
            reason: format!("path id {path} does not match payload id {payload}"),
        });
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub ok: bool,
    pub time_utc: DateTime<Utc>,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthDto> {
    Json(HealthDto {
        ok: true,
        time_utc: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Lists every loaded blueprint in registration order.
pub async fn list_node_definitions(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<NodeDefinition>> {
    Json(state.store.registry().get_all().cloned().collect())
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<Vec<ProjectDto>>> {
    Ok(Json(state.store.list_projects(&principal).await?))
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectDto>)> {
    let project = state
        .store
        .create_project(&principal, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDto>> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    Ok(Json(state.store.get_project(project_id, &principal).await?))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    state.store.delete_project(project_id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<NodeInstanceDto>>> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    Ok(Json(state.store.list_nodes(project_id, &principal).await?))
}

pub async fn create_node(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(project_id): Path<String>,
    Json(request): Json<CreateNodeInstanceRequest>,
) -> ApiResult<(StatusCode, Json<NodeInstanceDto>)> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let node = state
        .store
        .create_node(project_id, &principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn get_node(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((project_id, node_id)): Path<(String, String)>,
) -> ApiResult<Json<NodeInstanceDto>> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let node_id: NodeInstanceId = path_id(&node_id, EntityKind::NodeInstance)?;
    Ok(Json(
        state
            .store
            .get_node(project_id, node_id, &principal)
            .await?,
    ))
}

pub async fn update_node(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((project_id, node_id)): Path<(String, String)>,
    Json(request): Json<UpdateNodeInstanceRequest>,
) -> ApiResult<StatusCode> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let node_id: NodeInstanceId = path_id(&node_id, EntityKind::NodeInstance)?;
    check_payload_id(node_id, request.id)?;
    state
        .store
        .update_node(project_id, &principal, request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((project_id, node_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let node_id: NodeInstanceId = path_id(&node_id, EntityKind::NodeInstance)?;
    state
        .store
        .delete_node(project_id, &principal, node_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<NodeConnectionDto>>> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    Ok(Json(
        state.store.list_connections(project_id, &principal).await?,
    ))
}

pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(project_id): Path<String>,
    Json(request): Json<CreateNodeConnectionRequest>,
) -> ApiResult<(StatusCode, Json<NodeConnectionDto>)> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let connection = state
        .store
        .create_connection(project_id, &principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

pub async fn get_connection(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((project_id, connection_id)): Path<(String, String)>,
) -> ApiResult<Json<NodeConnectionDto>> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let connection_id: NodeConnectionId =
        path_id(&connection_id, EntityKind::NodeConnection)?;
    Ok(Json(
        state
            .store
            .get_connection(project_id, connection_id, &principal)
            .await?,
    ))
}

pub async fn update_connection(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((project_id, connection_id)): Path<(String, String)>,
    Json(request): Json<UpdateNodeConnectionRequest>,
) -> ApiResult<StatusCode> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let connection_id: NodeConnectionId =
        path_id(&connection_id, EntityKind::NodeConnection)?;
    check_payload_id(connection_id, request.id)?;
    state
        .store
        .update_connection(project_id, &principal, request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_connection(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((project_id, connection_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let connection_id: NodeConnectionId =
        path_id(&connection_id, EntityKind::NodeConnection)?;
    state
        .store
        .delete_connection(project_id, &principal, connection_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Snapshot of a project's graph with entry/terminal nodes and the
/// integrity audit.
pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectGraphDto>> {
    let project_id: ProjectId = path_id(&project_id, EntityKind::Project)?;
    let graph = state.store.load_graph(project_id, &principal).await?;
    Ok(Json(graph.to_dto(state.store.registry())))
}
