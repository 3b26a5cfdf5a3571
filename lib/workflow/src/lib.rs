//! Node blueprints for flowcanvas.
//!
//! This crate provides everything the graph store needs to know about node
//! *types*, as opposed to placed node instances:
//!
//! - **Definitions**: `NodeDefinition` with its configuration schema and ports
//! - **Ports**: named, typed attachment points in the input or output direction
//! - **Registry**: `BlueprintRegistry`, an immutable catalog built once at boot
//! - **Loader**: reads a directory of JSON definition files into a registry
//! - **Validation**: `ConfigSchema`, a compiled JSON Schema used to check
//!   instance configuration documents

pub mod definition;
pub mod error;
pub mod loader;
pub mod port;
pub mod registry;
pub mod schema;

pub use definition::{NodeDefinition, VisualMetadata};
pub use error::{RegistryError, SchemaError, ValidationError};
pub use loader::{load_definitions, parse_definition};
pub use port::{PortDefinition, PortDirection};
pub use registry::{Blueprint, BlueprintRegistry, BlueprintRegistryBuilder};
pub use schema::{ConfigSchema, Violation, validate_config};
