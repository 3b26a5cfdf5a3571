//! Project graph view using petgraph.
//!
//! A `ProjectGraph` is a read-only snapshot of one project's node instances
//! and connections as a directed graph:
//! - Nodes are node instances
//! - Edges run from a connection's source instance to its target instance
//!
//! Cycles and self-loops are permitted. Rows are taken as stored, so the
//! snapshot can also audit data written before a blueprint changed.

use crate::dto::{NodeConnectionDto, NodeInstanceDto, ProjectDto};
use crate::entity::{NodeConnection, NodeInstance, Project};
use crate::error::GraphStoreError;
use crate::guard::storage_error;
use crate::store::GraphStore;
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId};
use flowcanvas_platform_access::Principal;
use flowcanvas_workflow::{
    BlueprintRegistry, PortDefinition, PortDirection, ValidationError, Violation,
};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rootcause::prelude::Report;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// A stored row that no longer satisfies the blueprint registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AuditIssue {
    /// The instance's type is not registered.
    UnknownNodeType {
        node_id: NodeInstanceId,
        node_type_id: String,
    },
    /// The instance's configuration is malformed or breaks its schema.
    InvalidConfiguration {
        node_id: NodeInstanceId,
        violations: Vec<Violation>,
    },
    /// A connection names a port its endpoint's blueprint does not declare.
    UndeclaredPort {
        connection_id: NodeConnectionId,
        node_id: NodeInstanceId,
        direction: PortDirection,
        port_name: String,
    },
    /// A connection joins ports with incompatible type tags.
    IncompatiblePorts {
        connection_id: NodeConnectionId,
        from_type: String,
        to_type: String,
    },
}

/// Serializable form of a project graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGraphDto {
    pub project: ProjectDto,
    pub nodes: Vec<NodeInstanceDto>,
    pub connections: Vec<NodeConnectionDto>,
    pub entry_nodes: Vec<NodeInstanceId>,
    pub terminal_nodes: Vec<NodeInstanceId>,
    pub issues: Vec<AuditIssue>,
}

/// Directed graph of one project's nodes and connections.
#[derive(Debug, Clone)]
pub struct ProjectGraph {
    project: Project,
    graph: DiGraph<NodeInstance, NodeConnection>,
    /// Map from NodeInstanceId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeInstanceId, NodeIndex>,
}

impl ProjectGraph {
    /// Builds a graph from rows. Connections with an endpoint outside
    /// `nodes` are dropped.
    #[must_use]
    pub fn new(project: Project, nodes: Vec<NodeInstance>, connections: Vec<NodeConnection>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();

        for node in nodes {
            let id = node.id;
            let index = graph.add_node(node);
            node_index_map.insert(id, index);
        }

        for connection in connections {
            let endpoints = (
                node_index_map.get(&connection.from_node_instance_id),
                node_index_map.get(&connection.to_node_instance_id),
            );
            if let (Some(&source), Some(&target)) = endpoints {
                graph.add_edge(source, target, connection);
            } else {
                debug!(connection_id = %connection.id, "skipping connection with missing endpoint");
            }
        }

        Self {
            project,
            graph,
            node_index_map,
        }
    }

    #[must_use]
    pub fn project(&self) -> &Project {
        &self.project
    }

    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project.id
    }

    /// Returns a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: NodeInstanceId) -> Option<&NodeInstance> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInstance> {
        self.graph.node_weights()
    }

    /// Returns all connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &NodeConnection> {
        self.graph.edge_weights()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns nodes that have no incoming connections.
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<NodeInstanceId> {
        self.nodes_without(Direction::Incoming)
    }

    /// Returns nodes that have no outgoing connections.
    #[must_use]
    pub fn terminal_nodes(&self) -> Vec<NodeInstanceId> {
        self.nodes_without(Direction::Outgoing)
    }

    /// Returns the downstream nodes of a node with the connecting edge.
    #[must_use]
    pub fn successors(&self, node_id: NodeInstanceId) -> Vec<(&NodeInstance, &NodeConnection)> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    /// Returns the upstream nodes of a node with the connecting edge.
    #[must_use]
    pub fn predecessors(&self, node_id: NodeInstanceId) -> Vec<(&NodeInstance, &NodeConnection)> {
        self.neighbors(node_id, Direction::Incoming)
    }

    /// Checks every stored row against the registry without rejecting
    /// anything.
    #[must_use]
    pub fn audit(&self, registry: &BlueprintRegistry) -> Vec<AuditIssue> {
        let mut issues = Vec::new();

        for node in self.nodes() {
            let Some(blueprint) = registry.get(&node.node_type_id) else {
                issues.push(AuditIssue::UnknownNodeType {
                    node_id: node.id,
                    node_type_id: node.node_type_id.clone(),
                });
                continue;
            };

            let violations = match blueprint.validate_config(&node.configuration_json) {
                Ok(()) => continue,
                Err(ValidationError::Invalid { violations }) => violations,
                Err(other) => vec![Violation::new("", other.to_string())],
            };
            issues.push(AuditIssue::InvalidConfiguration {
                node_id: node.id,
                violations,
            });
        }

        for connection in self.connections() {
            let source = self.declared_port(
                registry,
                connection,
                connection.from_node_instance_id,
                PortDirection::Output,
                &connection.from_port_name,
                &mut issues,
            );
            let target = self.declared_port(
                registry,
                connection,
                connection.to_node_instance_id,
                PortDirection::Input,
                &connection.to_port_name,
                &mut issues,
            );

            if let (Some(source), Some(target)) = (source, target)
                && !source.is_compatible_with(target)
            {
                issues.push(AuditIssue::IncompatiblePorts {
                    connection_id: connection.id,
                    from_type: source.data_type.clone(),
                    to_type: target.data_type.clone(),
                });
            }
        }

        issues
    }

    /// Builds the serializable form, including audit results.
    #[must_use]
    pub fn to_dto(&self, registry: &BlueprintRegistry) -> ProjectGraphDto {
        ProjectGraphDto {
            project: ProjectDto::from(&self.project),
            nodes: self.nodes().map(NodeInstanceDto::from).collect(),
            connections: self.connections().map(NodeConnectionDto::from).collect(),
            entry_nodes: self.entry_nodes(),
            terminal_nodes: self.terminal_nodes(),
            issues: self.audit(registry),
        }
    }

    fn nodes_without(&self, direction: Direction) -> Vec<NodeInstanceId> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, direction).next().is_none())
            .filter_map(|idx| self.graph.node_weight(idx))
            .map(|node| node.id)
            .collect()
    }

    fn neighbors(
        &self,
        node_id: NodeInstanceId,
        direction: Direction,
    ) -> Vec<(&NodeInstance, &NodeConnection)> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(index, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                Some((self.graph.node_weight(other)?, edge.weight()))
            })
            .collect()
    }

    /// Resolves a connection endpoint's declared port, recording an issue
    /// when it is undeclared. Unknown node types are reported once per node,
    /// not per connection.
    fn declared_port<'r>(
        &self,
        registry: &'r BlueprintRegistry,
        connection: &NodeConnection,
        node_id: NodeInstanceId,
        direction: PortDirection,
        port_name: &str,
        issues: &mut Vec<AuditIssue>,
    ) -> Option<&'r PortDefinition> {
        let node = self.node(node_id)?;
        let blueprint = registry.get(&node.node_type_id)?;
        let port = blueprint.definition().port(direction, port_name);
        if port.is_none() {
            issues.push(AuditIssue::UndeclaredPort {
                connection_id: connection.id,
                node_id,
                direction,
                port_name: port_name.to_string(),
            });
        }
        port
    }
}

impl GraphStore {
    /// Loads an ownership-checked snapshot of a project's graph.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id))]
    pub async fn load_graph(
        &self,
        project_id: ProjectId,
        principal: &Principal,
    ) -> Result<ProjectGraph, Report<GraphStoreError>> {
        let scope = self.scope(project_id, principal).await?;
        let nodes = self
            .repo
            .list_nodes(scope.project_id())
            .await
            .map_err(storage_error)?;
        let connections = self
            .repo
            .list_connections(scope.project_id())
            .await
            .map_err(storage_error)?;
        Ok(ProjectGraph::new(scope.project().clone(), nodes, connections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{CreateNodeConnectionRequest, CreateNodeInstanceRequest};
    use crate::repository::GraphRepository;
    use crate::testing::{HTTP_CONFIG, principal, registry, store, store_with_repo};

    fn create(node_type_id: &str, configuration_json: &str) -> CreateNodeInstanceRequest {
        CreateNodeInstanceRequest {
            node_type_id: node_type_id.to_string(),
            configuration_json: configuration_json.to_string(),
            position_x: 0.0,
            position_y: 0.0,
        }
    }

    fn connect(
        from: NodeInstanceId,
        from_port: &str,
        to: NodeInstanceId,
        to_port: &str,
    ) -> CreateNodeConnectionRequest {
        CreateNodeConnectionRequest {
            from_node_instance_id: from,
            from_port_name: from_port.to_string(),
            to_node_instance_id: to,
            to_port_name: to_port.to_string(),
        }
    }

    #[tokio::test]
    async fn entry_and_terminal_nodes() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Demo").await.expect("project");
        let http = store
            .create_node(project.id, &alice, create("http-request", HTTP_CONFIG))
            .await
            .expect("http");
        let branch = store
            .create_node(project.id, &alice, create("conditional-branch", "{}"))
            .await
            .expect("branch");
        store
            .create_connection(project.id, &alice, connect(http.id, "response", branch.id, "input"))
            .await
            .expect("connect");

        let graph = store.load_graph(project.id, &alice).await.expect("graph");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.entry_nodes(), vec![http.id]);
        assert_eq!(graph.terminal_nodes(), vec![branch.id]);

        let successors = graph.successors(http.id);
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].0.id, branch.id);
        assert_eq!(successors[0].1.from_port_name, "response");
        assert_eq!(graph.predecessors(branch.id)[0].0.id, http.id);
        assert!(graph.audit(store.registry()).is_empty());
    }

    #[tokio::test]
    async fn cycles_are_allowed() {
        let store = store();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Loop").await.expect("project");
        let a = store
            .create_node(project.id, &alice, create("conditional-branch", "{}"))
            .await
            .expect("a");
        let b = store
            .create_node(project.id, &alice, create("conditional-branch", "{}"))
            .await
            .expect("b");
        store
            .create_connection(project.id, &alice, connect(a.id, "true", b.id, "input"))
            .await
            .expect("a -> b");
        store
            .create_connection(project.id, &alice, connect(b.id, "false", a.id, "input"))
            .await
            .expect("b -> a");

        let graph = store.load_graph(project.id, &alice).await.expect("graph");
        assert!(graph.entry_nodes().is_empty());
        assert!(graph.terminal_nodes().is_empty());
        assert!(graph.audit(store.registry()).is_empty());
    }

    #[tokio::test]
    async fn audit_reports_grandfathered_rows() {
        let (repo, store) = store_with_repo();
        let alice = principal("alice");
        let project = store.create_project(&alice, "Legacy").await.expect("project");

        // Rows written directly, as if stored before the blueprints changed.
        let legacy = NodeInstance {
            id: NodeInstanceId::new(),
            project_id: project.id,
            node_type_id: "retired-node".to_string(),
            configuration_json: "{}".to_string(),
            position_x: 0.0,
            position_y: 0.0,
        };
        let http = NodeInstance {
            id: NodeInstanceId::new(),
            project_id: project.id,
            node_type_id: "http-request".to_string(),
            configuration_json: r#"{"url":"https://x"}"#.to_string(),
            position_x: 0.0,
            position_y: 0.0,
        };
        let branch = NodeInstance {
            id: NodeInstanceId::new(),
            project_id: project.id,
            node_type_id: "conditional-branch".to_string(),
            configuration_json: "{}".to_string(),
            position_x: 0.0,
            position_y: 0.0,
        };
        for node in [&legacy, &http, &branch] {
            repo.insert_node(node).await.expect("insert node");
        }
        let bad_port = NodeConnection {
            id: NodeConnectionId::new(),
            project_id: project.id,
            from_node_instance_id: http.id,
            from_port_name: "result".to_string(),
            to_node_instance_id: branch.id,
            to_port_name: "input".to_string(),
        };
        repo.insert_connection(&bad_port).await.expect("insert connection");

        let graph = store.load_graph(project.id, &alice).await.expect("graph");
        let issues = graph.audit(&registry());
        assert_eq!(issues.len(), 3);
        assert!(issues.contains(&AuditIssue::UnknownNodeType {
            node_id: legacy.id,
            node_type_id: "retired-node".to_string(),
        }));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            AuditIssue::InvalidConfiguration { node_id, .. } if *node_id == http.id
        )));
        assert!(issues.contains(&AuditIssue::UndeclaredPort {
            connection_id: bad_port.id,
            node_id: http.id,
            direction: PortDirection::Output,
            port_name: "result".to_string(),
        }));

        // Reads still return the rows as stored.
        let fetched = store.get_node(project.id, legacy.id, &alice).await.expect("get");
        assert_eq!(fetched.node_type_id, "retired-node");
    }

    #[tokio::test]
    async fn other_user_cannot_load_graph() {
        let store = store();
        let project = store
            .create_project(&principal("alice"), "Demo")
            .await
            .expect("project");
        let err = store
            .load_graph(project.id, &principal("bob"))
            .await
            .expect_err("not bob's");
        assert!(err.current_context().is_not_visible());
    }

    #[test]
    fn dto_serializes_issue_kind() {
        let issue = AuditIssue::UnknownNodeType {
            node_id: NodeInstanceId::new(),
            node_type_id: "retired-node".to_string(),
        };
        let json = serde_json::to_value(&issue).expect("serialize");
        assert_eq!(json["kind"], "unknownNodeType");
        assert_eq!(json["nodeTypeId"], "retired-node");
    }
}
