//! Graph extraction: `CodeBlock` batches → nodes + relationships.
//!
//! # Submodules
//!
//! - [`imports`] - import-path resolution and IMPORTS edges
//! - [`calls`] - four-strategy call-target resolution
//! - [`inheritance`] - EXTENDS / IMPLEMENTS edges
//! - [`test_links`] - TESTS edges with framework skip list
//! - [`typeinfo`] - HAS_TYPE / ACCEPTS_TYPE / RETURNS_TYPE from LSP payloads
//!
//! Extraction is pure and deterministic; the store calls live at the edges
//! (`index_blocks`, `index_file`) and report partial progress on failure.

pub mod calls;
pub mod imports;
pub mod inheritance;
pub mod test_links;
pub mod typeinfo;

use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

use crate::classify::detect_language;
use crate::errors::IndexError;
use crate::mapper::map_block_type;
use crate::store::GraphStore;
use crate::types::{
    CodeBlock, IndexCounts, Node, NodeKind, RelKind, RelMetadata, Relationship,
};
use crate::validator::{ValidatorConfig, validate_metadata};

/// Store batches are capped for upsert latency on the shared pool.
const MAX_BATCH_ITEMS: usize = 1000;

/// Node id for a block: mapped kind + file + start line.
pub fn block_node_id(block: &CodeBlock) -> String {
    Node::block_id(
        map_block_type(block.block_type.as_deref()),
        &block.file_path,
        block.start_line,
    )
}

/// Pure extraction result.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

/// Turns parsed blocks into graph entities and drives the store.
pub struct GraphExtractor {
    workspace_root: String,
    validator: ValidatorConfig,
}

impl GraphExtractor {
    pub fn new(workspace_root: impl Into<String>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            validator: ValidatorConfig::default(),
        }
    }

    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    /// Validate one block and build its primary node.
    ///
    /// Invalid blocks (empty path, inverted range) are dropped with a log and
    /// never abort the batch.
    pub fn block_to_node(&self, block: &CodeBlock) -> Option<Node> {
        if block.file_path.trim().is_empty() {
            warn!(
                start = block.start_line,
                "block dropped: empty file path"
            );
            return None;
        }
        if !block.has_valid_range() {
            warn!(
                file = %block.file_path,
                start = block.start_line,
                end = block.end_line,
                "block dropped: invalid line range"
            );
            return None;
        }

        let kind = map_block_type(block.block_type.as_deref());
        let name = match block.identifier.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => Node::synthetic_name(
                block.block_type.as_deref(),
                kind,
                &block.file_path,
                block.start_line,
                block.end_line,
            ),
        };

        Some(Node {
            id: Node::block_id(kind, &block.file_path, block.start_line),
            kind,
            name,
            file_path: block.file_path.clone(),
            start_line: block.start_line,
            end_line: block.end_line,
            language: detect_language(&block.file_path),
        })
    }

    /// Extract nodes and relationships for a whole batch.
    ///
    /// Deterministic: the same batch always yields the same entities in the
    /// same order. Two blocks with the same `(kind, path, start)` triple are
    /// the same entity; the first wins.
    pub fn extract(&self, blocks: &[CodeBlock]) -> Extraction {
        let mut nodes: Vec<Node> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut valid: Vec<&CodeBlock> = Vec::new();

        for block in blocks {
            let Some(node) = self.block_to_node(block) else {
                continue;
            };
            valid.push(block);
            if seen_ids.insert(node.id.clone()) {
                nodes.push(node);
            }
        }

        let mut relationships = Vec::new();
        for &block in &valid {
            let from_id = block_node_id(block);

            relationships.extend(imports::import_relationships(
                &from_id,
                &block.file_path,
                &block.imports,
            ));
            relationships.extend(inheritance::extends_relationships(block, &from_id, blocks));
            relationships.extend(inheritance::implements_relationships(
                block, &from_id, blocks,
            ));

            for call in &block.calls {
                let Some(target) =
                    calls::resolve_call_target(call, block, blocks, &self.workspace_root)
                else {
                    continue;
                };
                relationships.push(
                    Relationship::new(&from_id, block_node_id(target), RelKind::Calls)
                        .with_metadata(RelMetadata::Calls {
                            call_type: call.call_type.clone(),
                            line: call.line,
                            column: call.column,
                            receiver: call.receiver.clone(),
                            qualifier: call.qualifier.clone(),
                        }),
                );
            }

            for &other in &valid {
                if block.strictly_contains(other) {
                    relationships.push(Relationship::new(
                        &from_id,
                        block_node_id(other),
                        RelKind::Defines,
                    ));
                }
            }

            relationships.extend(test_links::test_relationships(
                block,
                &from_id,
                blocks,
                &self.workspace_root,
            ));
            relationships.extend(typeinfo::type_relationships(block, &from_id, blocks));
        }

        // Reverse edges, synthesized after all forward edges exist.
        let reversed: Vec<Relationship> = relationships
            .iter()
            .filter_map(Relationship::reversed)
            .collect();
        relationships.extend(reversed);

        Extraction {
            nodes,
            relationships,
        }
    }

    /// Extract a batch and persist it: nodes first, then relationships.
    ///
    /// A node-upsert failure skips relationship creation entirely and the
    /// error carries the counts achieved before the failure.
    pub async fn index_blocks(
        &self,
        store: &dyn GraphStore,
        blocks: &[CodeBlock],
    ) -> Result<IndexCounts, IndexError> {
        let extraction = self.extract(blocks);
        let relationships = self.sanitize_relationships(extraction.relationships);
        let mut counts = IndexCounts::default();

        for chunk in extraction.nodes.chunks(MAX_BATCH_ITEMS) {
            match store.upsert_nodes(chunk).await {
                Ok(n) => counts.nodes_created += n,
                Err(e) => {
                    return Err(IndexError::BatchFailure {
                        message: format!(
                            "node upsert failed after {} nodes: {e}",
                            counts.nodes_created
                        ),
                        indexed: counts.nodes_created,
                        found: blocks.len(),
                        category: e.category(),
                    });
                }
            }
        }

        for chunk in relationships.chunks(MAX_BATCH_ITEMS) {
            match store.create_relationships(chunk).await {
                Ok(n) => counts.relationships_created += n,
                Err(e) => {
                    return Err(IndexError::BatchFailure {
                        message: format!(
                            "relationship creation failed after {} nodes and {} relationships: {e}",
                            counts.nodes_created, counts.relationships_created
                        ),
                        indexed: counts.nodes_created,
                        found: blocks.len(),
                        category: e.category(),
                    });
                }
            }
        }

        Ok(counts)
    }

    /// Re-index one file: delete, upsert the file node, index blocks, then
    /// CONTAINS edges for every top-level block. Strictly ordered.
    pub async fn index_file(
        &self,
        store: &dyn GraphStore,
        file_path: &str,
        blocks: &[CodeBlock],
    ) -> Result<IndexCounts, IndexError> {
        store.delete_nodes_by_file_path(file_path).await?;

        let file_node = self.file_node(file_path, blocks);
        store.upsert_nodes(std::slice::from_ref(&file_node)).await?;

        let mut counts = self.index_blocks(store, blocks).await?;
        counts.nodes_created += 1;

        let contains: Vec<Relationship> = self
            .top_level_blocks(blocks)
            .into_iter()
            .map(|block| {
                Relationship::new(file_node.id.clone(), block_node_id(block), RelKind::Contains)
            })
            .collect();
        if !contains.is_empty() {
            counts.relationships_created += store.create_relationships(&contains).await?;
        }

        Ok(counts)
    }

    /// Bound every metadata payload before it reaches the store. A payload
    /// that fails validation drops its edge with a log; it never aborts the
    /// batch. Truncated payloads are carried as opaque maps.
    fn sanitize_relationships(&self, relationships: Vec<Relationship>) -> Vec<Relationship> {
        relationships
            .into_iter()
            .filter_map(|mut rel| {
                let Some(metadata) = &rel.metadata else {
                    return Some(rel);
                };
                match validate_metadata(&metadata.to_value(), &self.validator) {
                    Ok(outcome) => {
                        if outcome.was_truncated {
                            if let serde_json::Value::Object(map) = outcome.sanitized {
                                rel.metadata = Some(RelMetadata::Opaque(map));
                            }
                        }
                        Some(rel)
                    }
                    Err(e) => {
                        warn!(
                            from = %rel.from_id,
                            to = %rel.to_id,
                            kind = %rel.kind,
                            "relationship dropped: {e}"
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Cascade-delete a file ahead of re-index or on removal.
    pub async fn remove_file(
        &self,
        store: &dyn GraphStore,
        file_path: &str,
    ) -> Result<usize, IndexError> {
        store.delete_nodes_by_file_path(file_path).await
    }

    fn file_node(&self, file_path: &str, blocks: &[CodeBlock]) -> Node {
        let end_line = blocks
            .iter()
            .filter(|b| b.file_path == file_path && b.has_valid_range())
            .map(|b| b.end_line)
            .max()
            .unwrap_or(1);
        let name = Path::new(file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path)
            .to_string();
        Node {
            id: Node::file_id(file_path),
            kind: NodeKind::File,
            name,
            file_path: file_path.to_string(),
            start_line: 1,
            end_line,
            language: detect_language(file_path),
        }
    }

    /// Blocks not strictly contained by any other valid block of the file.
    fn top_level_blocks<'a>(&self, blocks: &'a [CodeBlock]) -> Vec<&'a CodeBlock> {
        let valid: Vec<&CodeBlock> = blocks
            .iter()
            .filter(|b| !b.file_path.trim().is_empty() && b.has_valid_range())
            .collect();
        let mut top_level = Vec::new();
        for &block in &valid {
            if !valid.iter().any(|other| other.strictly_contains(block)) {
                top_level.push(block);
            }
        }
        top_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGraphStore;
    use crate::types::ImportInfo;

    fn extractor() -> GraphExtractor {
        GraphExtractor::new("/")
    }

    fn block(path: &str, ident: Option<&str>, btype: &str, start: usize, end: usize) -> CodeBlock {
        CodeBlock {
            file_path: path.to_string(),
            identifier: ident.map(|s| s.to_string()),
            block_type: Some(btype.to_string()),
            start_line: start,
            end_line: end,
            ..Default::default()
        }
    }

    #[test]
    fn invalid_blocks_are_dropped_not_fatal() {
        let bad_range = block("/a.ts", Some("x"), "function_declaration", 9, 3);
        let empty_path = block("", Some("y"), "function_declaration", 1, 2);
        let good = block("/a.ts", Some("z"), "function_declaration", 1, 2);
        let extraction = extractor().extract(&[bad_range, empty_path, good]);
        assert_eq!(extraction.nodes.len(), 1);
        assert_eq!(extraction.nodes[0].name, "z");
    }

    #[test]
    fn whitespace_identifier_gets_synthetic_name() {
        let b = block("/src/app.ts", Some("   "), "function_declaration", 5, 9);
        let extraction = extractor().extract(&[b]);
        assert_eq!(extraction.nodes[0].name, "function_declaration_app.ts_L5-9");
    }

    #[test]
    fn single_line_block_is_valid() {
        let b = block("/a.ts", Some("one"), "lexical_declaration", 7, 7);
        let extraction = extractor().extract(&[b]);
        assert_eq!(extraction.nodes.len(), 1);
        assert_eq!(extraction.nodes[0].id, "variable:/a.ts:7");
    }

    #[test]
    fn duplicate_triples_are_one_entity() {
        let a = block("/a.ts", Some("first"), "function_declaration", 1, 5);
        let b = block("/a.ts", Some("second"), "function_declaration", 1, 5);
        let extraction = extractor().extract(&[a, b]);
        assert_eq!(extraction.nodes.len(), 1);
        assert_eq!(extraction.nodes[0].name, "first");
    }

    #[test]
    fn extraction_is_deterministic() {
        let mut caller = block("/a.ts", Some("main"), "function_declaration", 1, 5);
        caller.imports = vec![ImportInfo {
            source: "./utils".into(),
            symbols: vec!["helper".into()],
            is_default: false,
            is_dynamic: false,
            alias: None,
        }];
        let target = block("/utils.ts", Some("helper"), "function_declaration", 1, 3);
        let batch = vec![caller, target];

        let first = extractor().extract(&batch);
        let second = extractor().extract(&batch);
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.relationships, second.relationships);
    }

    #[test]
    fn defines_for_strictly_nested_blocks() {
        let class = block("/a.ts", Some("Calculator"), "class_declaration", 10, 50);
        let add = block("/a.ts", Some("Add"), "method_definition", 12, 15);
        let sub = block("/a.ts", Some("Subtract"), "method_definition", 17, 20);
        let extraction = extractor().extract(&[class, add, sub]);

        assert_eq!(extraction.nodes.len(), 3);
        let defines: Vec<_> = extraction
            .relationships
            .iter()
            .filter(|r| r.kind == RelKind::Defines)
            .collect();
        assert_eq!(defines.len(), 2);
        assert!(defines.iter().all(|r| r.from_id == "class:/a.ts:10"));
        let called_by = extraction
            .relationships
            .iter()
            .any(|r| r.kind == RelKind::CalledBy);
        assert!(!called_by);
    }

    #[test]
    fn reverse_edges_mirror_forward() {
        let mut callee_call = block("/a.ts", Some("main"), "function_declaration", 1, 5);
        callee_call.calls = vec![crate::types::CallInfo {
            callee_name: "helper".into(),
            call_type: "function".into(),
            line: 2,
            column: 2,
            receiver: None,
            qualifier: None,
        }];
        let target = block("/a.ts", Some("helper"), "function_declaration", 7, 9);
        let extraction = extractor().extract(&[callee_call, target]);

        let forward: Vec<_> = extraction
            .relationships
            .iter()
            .filter(|r| r.kind == RelKind::Calls)
            .collect();
        let reverse: Vec<_> = extraction
            .relationships
            .iter()
            .filter(|r| r.kind == RelKind::CalledBy)
            .collect();
        assert_eq!(forward.len(), 1);
        assert_eq!(reverse.len(), 1);
        assert_eq!(forward[0].from_id, reverse[0].to_id);
        assert_eq!(forward[0].to_id, reverse[0].from_id);
        assert_eq!(forward[0].metadata, reverse[0].metadata);
    }

    #[test]
    fn no_orphan_edges_without_nodes() {
        let extraction = extractor().extract(&[]);
        assert!(extraction.nodes.is_empty());
        assert!(extraction.relationships.is_empty());
    }

    #[tokio::test]
    async fn index_blocks_upserts_then_relates() {
        let store = MemoryGraphStore::new();
        let class = block("/a.ts", Some("C"), "class_declaration", 1, 10);
        let method = block("/a.ts", Some("m"), "method_definition", 2, 4);
        let counts = extractor()
            .index_blocks(&store, &[class, method])
            .await
            .unwrap();
        assert_eq!(counts.nodes_created, 2);
        assert_eq!(counts.relationships_created, 1); // DEFINES
        assert_eq!(store.node_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn node_failure_skips_relationships() {
        let store = MemoryGraphStore::new();
        store.fail_upserts_with("graph store unavailable");
        let class = block("/a.ts", Some("C"), "class_declaration", 1, 10);
        let method = block("/a.ts", Some("m"), "method_definition", 2, 4);

        let err = extractor()
            .index_blocks(&store, &[class, method])
            .await
            .unwrap_err();
        match err {
            IndexError::BatchFailure { indexed, found, .. } => {
                assert_eq!(indexed, 0);
                assert_eq!(found, 2);
            }
            other => panic!("expected BatchFailure, got {other:?}"),
        }
        assert_eq!(store.relationship_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn index_file_is_ordered_and_counts_everything() {
        let store = MemoryGraphStore::new();
        let class = block("/a.ts", Some("C"), "class_declaration", 1, 10);
        let method = block("/a.ts", Some("m"), "method_definition", 2, 4);

        let counts = extractor()
            .index_file(&store, "/a.ts", &[class, method])
            .await
            .unwrap();
        // file node + 2 block nodes
        assert_eq!(counts.nodes_created, 3);
        // DEFINES + reverse-free CONTAINS for the top-level class
        assert_eq!(counts.relationships_created, 2);

        let file_node = store.node("file:/a.ts").expect("file node");
        assert_eq!(file_node.kind, NodeKind::File);
        assert_eq!(file_node.end_line, 10);

        let contains = store.edges_of_kind(RelKind::Contains);
        assert_eq!(contains.len(), 1);
        assert_eq!(contains[0].from_id, "file:/a.ts");
        assert_eq!(contains[0].to_id, "class:/a.ts:1");
    }

    #[tokio::test]
    async fn empty_file_gets_line_one_file_node() {
        let store = MemoryGraphStore::new();
        let counts = extractor().index_file(&store, "/empty.ts", &[]).await.unwrap();
        assert_eq!(counts.nodes_created, 1);
        assert_eq!(counts.relationships_created, 0);
        assert_eq!(store.node("file:/empty.ts").unwrap().end_line, 1);
    }

    #[tokio::test]
    async fn reindex_is_idempotent_for_node_ids() {
        let store = MemoryGraphStore::new();
        let blocks = vec![
            block("/a.ts", Some("C"), "class_declaration", 1, 10),
            block("/a.ts", Some("m"), "method_definition", 2, 4),
        ];
        let ex = extractor();
        ex.index_file(&store, "/a.ts", &blocks).await.unwrap();
        let first: std::collections::BTreeSet<String> =
            store.nodes().into_iter().map(|n| n.id).collect();
        ex.index_file(&store, "/a.ts", &blocks).await.unwrap();
        let second: std::collections::BTreeSet<String> =
            store.nodes().into_iter().map(|n| n.id).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn remove_index_remove_leaves_store_empty_for_file() {
        let store = MemoryGraphStore::new();
        let blocks = vec![block("/a.ts", Some("C"), "class_declaration", 1, 10)];
        let ex = extractor();
        ex.remove_file(&store, "/a.ts").await.unwrap();
        ex.index_file(&store, "/a.ts", &blocks).await.unwrap();
        ex.remove_file(&store, "/a.ts").await.unwrap();
        assert!(
            store
                .nodes()
                .into_iter()
                .all(|n| n.file_path != "/a.ts")
        );
    }
}
