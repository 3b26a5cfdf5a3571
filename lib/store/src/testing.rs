//! Shared fixtures for store tests.

use crate::memory::MemoryRepository;
use crate::store::GraphStore;
use flowcanvas_platform_access::Principal;
use flowcanvas_workflow::{BlueprintRegistry, NodeDefinition};
use serde_json::json;
use std::sync::Arc;

pub(crate) const HTTP_CONFIG: &str = r#"{"url":"https://x","method":"GET"}"#;

pub(crate) fn principal(name: &str) -> Principal {
    Principal::parse(name).expect("valid principal")
}

pub(crate) fn registry() -> BlueprintRegistry {
    BlueprintRegistry::builder()
        .with(
            NodeDefinition::new("http-request", "HTTP Request", "action")
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "url": { "type": "string", "minLength": 1 },
                        "method": { "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"] }
                    },
                    "required": ["url", "method"]
                }))
                .with_input("input", "object")
                .with_output("response", "object"),
        )
        .and_then(|builder| {
            builder.with(
                NodeDefinition::new("conditional-branch", "Conditional Branch", "logic")
                    .with_input("input", "object")
                    .with_output("true", "object")
                    .with_output("false", "object"),
            )
        })
        .and_then(|builder| {
            builder.with(
                NodeDefinition::new("counter", "Counter", "logic")
                    .with_input("input", "object")
                    .with_output("count", "number"),
            )
        })
        .expect("fixture registry")
        .build()
}

pub(crate) fn store() -> GraphStore {
    GraphStore::new(Arc::new(MemoryRepository::new()), Arc::new(registry()))
}

pub(crate) fn store_with_repo() -> (Arc<MemoryRepository>, GraphStore) {
    let repo = Arc::new(MemoryRepository::new());
    let store = GraphStore::new(repo.clone(), Arc::new(registry()));
    (repo, store)
}
