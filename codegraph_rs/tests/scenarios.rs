//! End-to-end extraction and orchestration scenarios with literal inputs.

use std::sync::Arc;

use codegraph::errors::{ErrorCategory, IndexError};
use codegraph::extract::GraphExtractor;
use codegraph::orchestrator::{
    IndexOrchestrator, IndexState, OrchestratorConfig, evaluate_batch_outcome,
};
use codegraph::reachability::{ReachabilityAnalyzer, ScopeType, UnreachableReason};
use codegraph::scanner::LineBlockParser;
use codegraph::store::{HashEmbeddingProvider, MemoryGraphStore, MemoryVectorStore};
use codegraph::types::{CallInfo, CodeBlock, ImportInfo, NodeKind, RelKind, SyntaxNode};

fn extractor() -> GraphExtractor {
    GraphExtractor::new("/")
}

#[test]
fn synthetic_identifier_for_css_declaration() {
    let block = CodeBlock {
        file_path: "/a/styles/globals.css".into(),
        identifier: None,
        block_type: Some("declaration".into()),
        start_line: 54,
        end_line: 56,
        content: "color: red;".into(),
        ..Default::default()
    };

    let extraction = extractor().extract(&[block]);
    assert_eq!(extraction.nodes.len(), 1);
    let node = &extraction.nodes[0];
    assert_eq!(node.name, "declaration_globals.css_L54-56");
    assert_eq!(node.kind, NodeKind::Function); // universal fallback
    assert_eq!(node.language.as_deref(), Some("css"));
    assert_eq!(node.id, "function:/a/styles/globals.css:54");
}

#[test]
fn fallback_chunk_with_import_and_unresolvable_call() {
    let block = CodeBlock {
        file_path: "/src/Calculator.vb".into(),
        identifier: Some("CalculateSum".into()),
        block_type: Some("fallback_chunk".into()),
        start_line: 10,
        end_line: 20,
        imports: vec![ImportInfo {
            source: "System.Math".into(),
            symbols: vec!["Math".into()],
            is_default: false,
            is_dynamic: false,
            alias: None,
        }],
        calls: vec![CallInfo {
            callee_name: "Max".into(),
            call_type: "static_method".into(),
            line: 12,
            column: 10,
            receiver: None,
            qualifier: Some("Math".into()),
        }],
        ..Default::default()
    };

    let extraction = extractor().extract(&[block]);
    assert_eq!(extraction.nodes.len(), 1);
    let node = &extraction.nodes[0];
    assert_eq!(node.id, "function:/src/Calculator.vb:10");
    assert_eq!(node.name, "CalculateSum");

    let imports: Vec<_> = extraction
        .relationships
        .iter()
        .filter(|r| r.kind == RelKind::Imports)
        .collect();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].to_id, "import:/src/Calculator.vb:System.Math");

    // qualifier "Math" is not a class in the batch: no CALLS, no CALLED_BY
    assert!(
        extraction
            .relationships
            .iter()
            .all(|r| r.kind != RelKind::Calls && r.kind != RelKind::CalledBy)
    );
}

#[test]
fn defines_inside_a_class() {
    let class = CodeBlock {
        file_path: "/src/calc.ts".into(),
        identifier: Some("Calculator".into()),
        block_type: Some("class_declaration".into()),
        start_line: 10,
        end_line: 50,
        ..Default::default()
    };
    let add = CodeBlock {
        file_path: "/src/calc.ts".into(),
        identifier: Some("Add".into()),
        block_type: Some("method_definition".into()),
        start_line: 12,
        end_line: 15,
        ..Default::default()
    };
    let subtract = CodeBlock {
        file_path: "/src/calc.ts".into(),
        identifier: Some("Subtract".into()),
        block_type: Some("method_definition".into()),
        start_line: 17,
        end_line: 20,
        ..Default::default()
    };

    let extraction = extractor().extract(&[class, add, subtract]);
    assert_eq!(extraction.nodes.len(), 3);

    let defines: Vec<_> = extraction
        .relationships
        .iter()
        .filter(|r| r.kind == RelKind::Defines)
        .collect();
    assert_eq!(defines.len(), 2);
    assert!(defines.iter().all(|r| r.from_id == "class:/src/calc.ts:10"));
    let targets: Vec<&str> = defines.iter().map(|r| r.to_id.as_str()).collect();
    assert!(targets.contains(&"method:/src/calc.ts:12"));
    assert!(targets.contains(&"method:/src/calc.ts:17"));

    assert!(
        extraction
            .relationships
            .iter()
            .all(|r| r.kind != RelKind::CalledBy)
    );
}

#[test]
fn partial_batch_failure_raises_with_counters() {
    let batch_errors = vec!["429 rate limit".to_string()];
    let err = evaluate_batch_outcome(100, 40, &batch_errors).unwrap_err();
    match err {
        IndexError::BatchFailure {
            message,
            indexed,
            found,
            category,
        } => {
            assert_eq!(message, "429 rate limit");
            assert_eq!(indexed, 40);
            assert_eq!(found, 100);
            assert_eq!(category, ErrorCategory::RateLimit);
        }
        other => panic!("expected BatchFailure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn orchestrator_never_connects_preserves_cache() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.ts"), "const x = 1;\n").unwrap();

    let cache_path = dir.path().join("cache.json");
    let mut cache = codegraph::cache::IndexCache::at_path(cache_path.clone());
    cache.update_file("/previous.ts", "hash", vec![]);
    cache.save().unwrap();

    let vector = Arc::new(MemoryVectorStore::new());
    vector.fail_initialize_with("connect ECONNREFUSED 127.0.0.1:6333");
    let orch = IndexOrchestrator::new(
        OrchestratorConfig {
            workspace: Some(dir.path().to_path_buf()),
            cache_path: Some(cache_path.clone()),
            ..Default::default()
        },
        Arc::new(MemoryGraphStore::new()),
        vector,
        Arc::new(HashEmbeddingProvider::default()),
        Arc::new(LineBlockParser),
    );

    let err = orch.start_indexing().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Network);
    assert_eq!(orch.state(), IndexState::Error);
    // the store was never reached, so the cache file survives
    assert!(cache_path.exists());
}

#[test]
fn unreachable_after_return() {
    let root = SyntaxNode::new("function_declaration", 1, 4).with_children(vec![
        SyntaxNode::new("identifier", 1, 1).with_text("answer"),
        SyntaxNode::new("statement_block", 1, 4).with_children(vec![
            SyntaxNode::new("return_statement", 2, 2).with_text("return 42;"),
            SyntaxNode::new("expression_statement", 3, 3).with_text("console.log(\"x\")"),
        ]),
    ]);

    let findings = ReachabilityAnalyzer::default().analyze(&root);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].reason, UnreachableReason::AfterReturn);
    assert_eq!(findings[0].scope_type, ScopeType::Function);
    assert_eq!(findings[0].line, 3);
}

// Laws

#[test]
fn extraction_is_a_pure_function() {
    let blocks = vec![
        CodeBlock {
            file_path: "/src/a.ts".into(),
            identifier: Some("Widget".into()),
            block_type: Some("class_declaration".into()),
            start_line: 1,
            end_line: 30,
            ..Default::default()
        },
        CodeBlock {
            file_path: "/src/a.ts".into(),
            identifier: Some("render".into()),
            block_type: Some("method_definition".into()),
            start_line: 3,
            end_line: 9,
            ..Default::default()
        },
    ];
    let first = extractor().extract(&blocks);
    let second = extractor().extract(&blocks);
    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.relationships, second.relationships);
}

#[tokio::test]
async fn remove_index_remove_leaves_no_trace() {
    let store = MemoryGraphStore::new();
    let ex = extractor();
    let blocks = vec![CodeBlock {
        file_path: "/src/a.ts".into(),
        identifier: Some("f".into()),
        block_type: Some("function_declaration".into()),
        start_line: 1,
        end_line: 3,
        ..Default::default()
    }];

    ex.remove_file(&store, "/src/a.ts").await.unwrap();
    ex.index_file(&store, "/src/a.ts", &blocks).await.unwrap();
    ex.remove_file(&store, "/src/a.ts").await.unwrap();

    assert!(store.nodes().iter().all(|n| n.file_path != "/src/a.ts"));
}

#[tokio::test]
async fn reindexing_yields_the_same_node_id_set() {
    let store = MemoryGraphStore::new();
    let ex = extractor();
    let blocks = vec![
        CodeBlock {
            file_path: "/src/a.ts".into(),
            identifier: Some("Widget".into()),
            block_type: Some("class_declaration".into()),
            start_line: 1,
            end_line: 30,
            ..Default::default()
        },
        CodeBlock {
            file_path: "/src/a.ts".into(),
            identifier: Some("render".into()),
            block_type: Some("method_definition".into()),
            start_line: 3,
            end_line: 9,
            ..Default::default()
        },
    ];

    ex.index_file(&store, "/src/a.ts", &blocks).await.unwrap();
    let first: std::collections::BTreeSet<String> =
        store.nodes().into_iter().map(|n| n.id).collect();

    ex.index_file(&store, "/src/a.ts", &blocks).await.unwrap();
    let second: std::collections::BTreeSet<String> =
        store.nodes().into_iter().map(|n| n.id).collect();

    assert_eq!(first, second);
}

#[test]
fn no_orphan_edges_in_any_batch() {
    // relationshipsCreated > 0 ⇒ nodesCreated > 0
    let blocks = vec![CodeBlock {
        file_path: "/src/a.ts".into(),
        identifier: Some("f".into()),
        block_type: Some("function_declaration".into()),
        start_line: 1,
        end_line: 3,
        imports: vec![ImportInfo {
            source: "./b".into(),
            symbols: vec!["g".into()],
            is_default: false,
            is_dynamic: false,
            alias: None,
        }],
        ..Default::default()
    }];
    let extraction = extractor().extract(&blocks);
    if !extraction.relationships.is_empty() {
        assert!(!extraction.nodes.is_empty());
    }
}
