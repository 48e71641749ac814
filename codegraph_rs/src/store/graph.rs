//! Graph-store contract and the in-memory reference implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::errors::IndexError;
use crate::types::{Node, NodeKind, RelKind, Relationship};

/// The slice of the property-graph API the indexer drives.
///
/// Transport, pooling, and the store's own query language stay behind this
/// seam; batch upserts should be kept at or under 1000 items for latency.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_nodes(&self, nodes: &[Node]) -> Result<usize, IndexError>;

    async fn upsert_node(&self, node: &Node) -> Result<(), IndexError> {
        self.upsert_nodes(std::slice::from_ref(node)).await?;
        Ok(())
    }

    async fn create_relationships(
        &self,
        relationships: &[Relationship],
    ) -> Result<usize, IndexError>;

    async fn create_relationship(&self, relationship: &Relationship) -> Result<(), IndexError> {
        self.create_relationships(std::slice::from_ref(relationship))
            .await?;
        Ok(())
    }

    /// Cascading delete: every node of the file plus incident edges.
    async fn delete_nodes_by_file_path(&self, file_path: &str) -> Result<usize, IndexError>;

    /// Drop all graph contents.
    async fn clear(&self) -> Result<(), IndexError>;

    async fn node_count(&self) -> Result<usize, IndexError>;

    async fn relationship_count(&self) -> Result<usize, IndexError>;

    /// Parameterized passthrough to the store's query language.
    async fn execute_query(&self, query: &str, params: Value) -> Result<Value, IndexError>;
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<String, Node>,
    relationships: Vec<Relationship>,
}

/// In-memory graph store used by tests and offline runs.
#[derive(Default)]
pub struct MemoryGraphStore {
    state: Mutex<GraphState>,
    fail_upserts: Mutex<Option<String>>,
    fail_relationships: Mutex<Option<String>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for the next upsert calls (test hook).
    pub fn fail_upserts_with(&self, message: impl Into<String>) {
        *self.fail_upserts.lock().unwrap() = Some(message.into());
    }

    /// Inject a failure for relationship creation (test hook).
    pub fn fail_relationships_with(&self, message: impl Into<String>) {
        *self.fail_relationships.lock().unwrap() = Some(message.into());
    }

    /// Snapshot of all nodes, insertion order not guaranteed.
    pub fn nodes(&self) -> Vec<Node> {
        self.state.lock().unwrap().nodes.values().cloned().collect()
    }

    pub fn relationships(&self) -> Vec<Relationship> {
        self.state.lock().unwrap().relationships.clone()
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.state.lock().unwrap().nodes.get(id).cloned()
    }

    /// Edges touching a node in either direction.
    pub fn edges_for(&self, node_id: &str) -> Vec<Relationship> {
        self.state
            .lock()
            .unwrap()
            .relationships
            .iter()
            .filter(|r| r.from_id == node_id || r.to_id == node_id)
            .cloned()
            .collect()
    }

    pub fn edges_of_kind(&self, kind: RelKind) -> Vec<Relationship> {
        self.state
            .lock()
            .unwrap()
            .relationships
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }
}

/// Best-effort placeholder for a dangling endpoint. Import placeholders keep
/// enough identity for the cascade delete to find them later.
fn placeholder_node(id: &str) -> Node {
    if let Some(rest) = id.strip_prefix("import:") {
        let (file_path, source) = rest.split_once(':').unwrap_or((rest, rest));
        return Node {
            id: id.to_string(),
            kind: NodeKind::Import,
            name: source.to_string(),
            file_path: file_path.to_string(),
            start_line: 0,
            end_line: 0,
            language: None,
        };
    }
    Node {
        id: id.to_string(),
        kind: NodeKind::Function,
        name: id.to_string(),
        file_path: String::new(),
        start_line: 0,
        end_line: 0,
        language: None,
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_nodes(&self, nodes: &[Node]) -> Result<usize, IndexError> {
        if let Some(message) = self.fail_upserts.lock().unwrap().clone() {
            return Err(IndexError::categorized(message));
        }
        let mut state = self.state.lock().unwrap();
        for node in nodes {
            state.nodes.insert(node.id.clone(), node.clone());
        }
        Ok(nodes.len())
    }

    async fn create_relationships(
        &self,
        relationships: &[Relationship],
    ) -> Result<usize, IndexError> {
        if let Some(message) = self.fail_relationships.lock().unwrap().clone() {
            return Err(IndexError::categorized(message));
        }
        let mut state = self.state.lock().unwrap();
        for rel in relationships {
            // toId may resolve lazily to a placeholder; fromId normally
            // exists already because nodes are upserted first.
            if !state.nodes.contains_key(&rel.to_id) {
                state
                    .nodes
                    .insert(rel.to_id.clone(), placeholder_node(&rel.to_id));
            }
            if !state.nodes.contains_key(&rel.from_id) {
                debug!(from = %rel.from_id, "relationship source missing; placeholder created");
                state
                    .nodes
                    .insert(rel.from_id.clone(), placeholder_node(&rel.from_id));
            }
            state.relationships.push(rel.clone());
        }
        Ok(relationships.len())
    }

    async fn delete_nodes_by_file_path(&self, file_path: &str) -> Result<usize, IndexError> {
        let mut state = self.state.lock().unwrap();
        let doomed: Vec<String> = state
            .nodes
            .values()
            .filter(|n| n.file_path == file_path)
            .map(|n| n.id.clone())
            .collect();
        for id in &doomed {
            state.nodes.remove(id);
        }
        state
            .relationships
            .retain(|r| !doomed.contains(&r.from_id) && !doomed.contains(&r.to_id));
        Ok(doomed.len())
    }

    async fn clear(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock().unwrap();
        state.nodes.clear();
        state.relationships.clear();
        Ok(())
    }

    async fn node_count(&self) -> Result<usize, IndexError> {
        Ok(self.state.lock().unwrap().nodes.len())
    }

    async fn relationship_count(&self) -> Result<usize, IndexError> {
        Ok(self.state.lock().unwrap().relationships.len())
    }

    async fn execute_query(&self, query: &str, _params: Value) -> Result<Value, IndexError> {
        Err(IndexError::GraphStore(format!(
            "in-memory store has no query language (got: {query})"
        )))
    }
}
