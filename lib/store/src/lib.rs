//! Ownership-scoped graph store for flowcanvas.
//!
//! This crate provides:
//! - **Entities**: `Project`, `NodeInstance`, `NodeConnection`
//! - **DTOs**: request and response contracts for the request boundary
//! - **Storage boundary**: the `GraphRepository` trait and an in-memory
//!   implementation
//! - **OwnershipGuard**: principal resolution and project ownership checks
//! - **GraphStore**: CRUD with integrity enforcement on every write
//! - **ProjectGraph**: a petgraph view of one project with an integrity audit
//!
//! # Write-path invariants
//!
//! Node instance writes require a registered node type and a configuration
//! that satisfies the blueprint's schema. Connection writes require both
//! endpoints in the addressed project and ports declared by each endpoint's
//! blueprint in the right direction. Reads return rows as stored.

mod connections;
pub mod dto;
pub mod entity;
pub mod error;
pub mod graph;
pub mod guard;
pub mod memory;
mod nodes;
pub mod repository;
pub mod store;

#[cfg(test)]
mod testing;

pub use dto::{
    CreateNodeConnectionRequest, CreateNodeInstanceRequest, CreateProjectRequest,
    NodeConnectionDto, NodeInstanceDto, ProjectDto, UpdateNodeConnectionRequest,
    UpdateNodeInstanceRequest,
};
pub use entity::{ConnectionWrite, NodeConnection, NodeInstance, Project};
pub use error::{EntityKind, GraphStoreError, RepositoryError};
pub use graph::{AuditIssue, ProjectGraph, ProjectGraphDto};
pub use guard::{OwnershipGuard, ProjectScope};
pub use memory::MemoryRepository;
pub use repository::{GraphRepository, RepositoryResult};
pub use store::GraphStore;
