//! # codegraph
//!
//! **Code knowledge graph indexer** - parses a workspace into semantic
//! entities and typed relationships, and upserts them into a property-graph
//! store for impact analysis, dead-code detection, and context-enriched
//! search.
//!
//! ## Features
//!
//! - **Block-type mapping** - 400+ tree-sitter node patterns classified into
//!   a seven-kind taxonomy, deterministic and case-insensitive
//! - **Graph extraction** - CALLS, IMPORTS, DEFINES, CONTAINS, EXTENDS,
//!   IMPLEMENTS, TESTS, and type edges with synthesized reverse directions
//! - **Bounded pipelines** - per-stage concurrency budgets with retries,
//!   backoff, and a deadlock watchdog
//! - **Incremental scans** - content-hash cache skips unchanged files
//! - **Quality analysis** - complexity metrics, unreachable code, dead code,
//!   unused imports
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,no_run
//! use codegraph::extract::GraphExtractor;
//! use codegraph::store::MemoryGraphStore;
//! use codegraph::types::CodeBlock;
//!
//! # async fn run() -> Result<(), codegraph::errors::IndexError> {
//! let store = MemoryGraphStore::new();
//! let extractor = GraphExtractor::new("/work");
//! let blocks: Vec<CodeBlock> = vec![];
//! let counts = extractor.index_file(&store, "/work/src/app.ts", &blocks).await?;
//! println!("{} nodes, {} relationships", counts.nodes_created, counts.relationships_created);
//! # Ok(())
//! # }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! codegraph index .        # scan and index a workspace
//! codegraph watch .        # keep the index fresh
//! codegraph quality .      # complexity + dead-code report
//! codegraph-grammars -s    # verify/fetch grammar assets, strict
//! ```

/// Incremental-scan cache (file hash → segment hashes), atomically persisted.
pub mod cache;

/// File-level classification: language detection and test heuristics.
pub mod classify;

/// Optional `.codegraph/config.toml` support.
pub mod config;

/// Error taxonomy with closed categories and retry suggestions.
pub mod errors;

/// Graph extraction: blocks → nodes + relationships.
///
/// # Submodules
///
/// - [`extract::imports`] - import-path resolution
/// - [`extract::calls`] - call-target resolution
/// - [`extract::inheritance`] - EXTENDS / IMPLEMENTS
/// - [`extract::test_links`] - TESTS edges
/// - [`extract::typeinfo`] - LSP-backed type edges
pub mod extract;

/// Grammar asset layout, verification, and HTTPS fetching.
pub mod grammars;

/// Tree-sitter node type → semantic node kind.
pub mod mapper;

/// Indexing lifecycle: state machine, batch-failure policy, cache policy.
pub mod orchestrator;

/// Bounded producer/consumer pipelines with retry and backoff.
pub mod pipeline;

/// CLI progress reporting for indexing runs (spinner + summary rendering).
pub mod progress;

/// Quality analysis: complexity, dead code, unused imports, scores.
pub mod quality;

/// Unreachable-code detection via a scope-stack walk.
pub mod reachability;

/// Workspace scanning behind the parser seam.
pub mod scanner;

/// Narrow graph-store / vector-store / embedding contracts.
pub mod store;

/// Core types: blocks, nodes, relationships, metadata variants.
pub mod types;

/// Relationship-metadata validation and truncation.
pub mod validator;

/// Debounced file watching for incremental re-index.
pub mod watcher;

// ============================================================================
// Re-exports for convenience
// ============================================================================

/// Semantic node taxonomy.
pub use types::NodeKind;

/// Relationship type set.
pub use types::RelKind;

/// Parser-produced indexable unit.
pub use types::CodeBlock;

/// Property-graph node.
pub use types::Node;

/// Typed edge with metadata.
pub use types::Relationship;

/// The block-type classifier.
pub use mapper::map_block_type;

/// Batch extractor and store driver.
pub use extract::GraphExtractor;

/// Indexing coordinator.
pub use orchestrator::IndexOrchestrator;

/// Public indexing state.
pub use orchestrator::IndexState;

/// Indexing error with category.
pub use errors::IndexError;

/// Closed error category set.
pub use errors::ErrorCategory;
