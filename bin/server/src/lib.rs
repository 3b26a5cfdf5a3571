//! flowcanvas web server.
//!
//! This crate wires the graph store to a thin JSON API and provides the
//! PostgreSQL storage backend.

pub mod config;
pub mod db;
pub mod error;
pub mod principal;
pub mod routes;

use axum::{
    Router,
    routing::get,
};
use config::AuthConfig;
use flowcanvas_store::GraphStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    pub store: GraphStore,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(store: GraphStore, auth: AuthConfig) -> Self {
        Self { store, auth }
    }
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/nodes", get(routes::list_node_definitions))
        .route(
            "/api/projects",
            get(routes::list_projects).post(routes::create_project),
        )
        .route(
            "/api/projects/{project_id}",
            get(routes::get_project).delete(routes::delete_project),
        )
        .route(
            "/api/projects/{project_id}/nodeinstances",
            get(routes::list_nodes).post(routes::create_node),
        )
        .route(
            "/api/projects/{project_id}/nodeinstances/{node_id}",
            get(routes::get_node)
                .put(routes::update_node)
                .delete(routes::delete_node),
        )
        .route(
            "/api/projects/{project_id}/connections",
            get(routes::list_connections).post(routes::create_connection),
        )
        .route(
            "/api/projects/{project_id}/connections/{connection_id}",
            get(routes::get_connection)
                .put(routes::update_connection)
                .delete(routes::delete_connection),
        )
        .route("/api/projects/{project_id}/graph", get(routes::get_graph))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
