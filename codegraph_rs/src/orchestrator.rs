//! Indexing orchestration: lifecycle, state machine, failure policy.
//!
//! Drives a workspace scan through the bounded pipelines into the graph and
//! vector stores, translating scan and batch events into the public state
//! machine (`Standby → Indexing → Indexed | Error`). Owns the cache
//! lifecycle: cleared after a failure once the store was reachable,
//! preserved when the store was never reached.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::json;
use tracing::{info, warn};

use crate::cache::IndexCache;
use crate::errors::{ErrorCategory, IndexError};
use crate::extract::GraphExtractor;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::scanner::{BlockParser, FileBlocks, ScanConfig, Scanner};
use crate::store::{EmbeddingProvider, GraphStore, VectorPoint, VectorStore};
use crate::validator::ValidatorConfig;

/// Share of blocks that may fail before the whole batch is an error.
pub const BATCH_FAILURE_THRESHOLD: f64 = 0.10;

/// Public indexing state surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    Standby,
    Indexing,
    Indexed,
    Error,
}

/// Last error surfaced with the `Error` state.
#[derive(Debug, Clone)]
pub struct StateError {
    pub category: ErrorCategory,
    pub message: String,
    pub retry_suggestion: &'static str,
}

/// Owns the state transitions and error categorization.
#[derive(Debug)]
pub struct StateManager {
    state: IndexState,
    last_error: Option<StateError>,
}

impl StateManager {
    pub fn new() -> Self {
        Self {
            state: IndexState::Standby,
            last_error: None,
        }
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn last_error(&self) -> Option<&StateError> {
        self.last_error.as_ref()
    }

    /// `Standby/Indexed/Error → Indexing`; rejects a concurrent start.
    pub fn begin_indexing(&mut self) -> Result<(), IndexError> {
        if self.state == IndexState::Indexing {
            return Err(IndexError::Configuration(
                "indexing is already in progress".into(),
            ));
        }
        self.state = IndexState::Indexing;
        self.last_error = None;
        Ok(())
    }

    pub fn complete(&mut self) {
        self.state = IndexState::Indexed;
    }

    /// Any state can transition to `Error`; categorization lives here.
    pub fn fail(&mut self, error: &IndexError) {
        let category = Self::categorize(error);
        self.last_error = Some(StateError {
            category,
            message: error.to_string(),
            retry_suggestion: category.retry_suggestion(),
        });
        self.state = IndexState::Error;
    }

    /// `Indexing → Standby` on user cancellation.
    pub fn cancel(&mut self) {
        if self.state == IndexState::Indexing {
            self.state = IndexState::Standby;
        }
    }

    pub fn categorize(error: &IndexError) -> ErrorCategory {
        error.category()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrator configuration.
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Workspace root; indexing rejects when absent.
    pub workspace: Option<PathBuf>,
    /// False until the store endpoints are configured.
    pub store_configured: bool,
    pub scan: ScanConfig,
    /// Metadata bounds applied before relationships reach the store.
    pub validator: ValidatorConfig,
    /// Explicit cache file path override (tests); defaults to the project
    /// cache dir derived from the workspace.
    pub cache_path: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            store_configured: true,
            scan: ScanConfig::default(),
            validator: ValidatorConfig::default(),
            cache_path: None,
        }
    }
}

/// Result summary of one indexing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexSummary {
    pub found: usize,
    pub indexed: usize,
    pub nodes_created: usize,
    pub relationships_created: usize,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub incremental: bool,
    pub duration_ms: u64,
}

#[derive(Default)]
struct IndexTotals {
    indexed: usize,
    nodes_created: usize,
    relationships_created: usize,
}

/// Batch-failure policy over the final counters.
///
/// - nothing indexed while blocks were found → failure
/// - errors with nothing indexed → failure even when nothing was found
/// - errors with more than the threshold share lost → partial failure
/// - blocks found, none indexed, no errors reported → still critical
pub fn evaluate_batch_outcome(
    found: usize,
    indexed: usize,
    batch_errors: &[String],
) -> Result<(), IndexError> {
    let first_error = batch_errors.first().cloned();
    let category = first_error
        .as_deref()
        .map(ErrorCategory::from_message)
        .unwrap_or(ErrorCategory::Unknown);

    if indexed == 0 && found > 0 {
        let message =
            first_error.unwrap_or_else(|| "no blocks were persisted (critical)".to_string());
        return Err(IndexError::BatchFailure {
            message,
            indexed,
            found,
            category,
        });
    }
    if !batch_errors.is_empty() && indexed == 0 {
        return Err(IndexError::BatchFailure {
            message: first_error.unwrap_or_default(),
            indexed,
            found,
            category,
        });
    }
    if !batch_errors.is_empty()
        && found > 0
        && (found - indexed) as f64 / found as f64 > BATCH_FAILURE_THRESHOLD
    {
        return Err(IndexError::BatchFailure {
            message: first_error.unwrap_or_default(),
            indexed,
            found,
            category,
        });
    }
    Ok(())
}

/// Coordinates scanner, extractor, pipelines, and stores for one workspace.
pub struct IndexOrchestrator {
    config: OrchestratorConfig,
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    parser: Arc<dyn BlockParser>,
    extractor: Arc<GraphExtractor>,
    state: Mutex<StateManager>,
    cache: Mutex<Option<IndexCache>>,
    cancel: Arc<AtomicBool>,
    indexing_started: AtomicBool,
    watcher_active: AtomicBool,
}

impl IndexOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        parser: Arc<dyn BlockParser>,
    ) -> Self {
        let workspace_root = config
            .workspace
            .as_ref()
            .map(|w| w.to_string_lossy().to_string())
            .unwrap_or_default();
        let extractor =
            GraphExtractor::new(workspace_root).with_validator(config.validator.clone());
        Self {
            config,
            graph,
            vector,
            embedder,
            parser,
            extractor: Arc::new(extractor),
            state: Mutex::new(StateManager::new()),
            cache: Mutex::new(None),
            cancel: Arc::new(AtomicBool::new(false)),
            indexing_started: AtomicBool::new(false),
            watcher_active: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> IndexState {
        self.state.lock().unwrap().state()
    }

    pub fn last_error(&self) -> Option<StateError> {
        self.state.lock().unwrap().last_error().cloned()
    }

    /// Files tracked by the cache retained from the last completed run.
    pub fn cached_file_count(&self) -> usize {
        self.cache
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.len())
            .unwrap_or(0)
    }

    pub fn is_watcher_active(&self) -> bool {
        self.watcher_active.load(Ordering::SeqCst)
    }

    pub fn set_watcher_active(&self, active: bool) {
        self.watcher_active.store(active, Ordering::SeqCst);
    }

    /// Request cancellation: the scanner stops emitting new work, in-flight
    /// batches settle, state returns to `Standby`.
    pub fn cancel_indexing(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.state.lock().unwrap().cancel();
    }

    fn load_cache(&self) -> IndexCache {
        match &self.config.cache_path {
            Some(path) => IndexCache::at_path(path.clone()),
            None => {
                let root = self
                    .config
                    .workspace
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                IndexCache::load(&root)
            }
        }
    }

    /// Run the full start sequence and one scan to completion.
    pub async fn start_indexing(&self) -> Result<IndexSummary, IndexError> {
        let started_at = Instant::now();

        let workspace = match &self.config.workspace {
            Some(w) => w.clone(),
            None => {
                let err = IndexError::Configuration("no workspace folder is open".into());
                self.state.lock().unwrap().fail(&err);
                return Err(err);
            }
        };
        if !self.config.store_configured {
            let err = IndexError::Configuration("indexer is not configured".into());
            self.state.lock().unwrap().fail(&err);
            return Err(err);
        }
        self.state.lock().unwrap().begin_indexing()?;

        self.cancel.store(false, Ordering::SeqCst);
        self.indexing_started.store(false, Ordering::SeqCst);

        match self.run_scan(&workspace, started_at).await {
            Ok(summary) => {
                if self.cancel.load(Ordering::SeqCst) {
                    // cancel_indexing already moved the state to Standby
                    return Ok(summary);
                }
                self.state.lock().unwrap().complete();
                info!(
                    files = summary.files_scanned,
                    blocks = summary.found,
                    nodes = summary.nodes_created,
                    "indexing complete"
                );
                Ok(summary)
            }
            Err(error) => {
                self.handle_failure(&error);
                Err(error)
            }
        }
    }

    async fn run_scan(
        &self,
        workspace: &PathBuf,
        started_at: Instant,
    ) -> Result<IndexSummary, IndexError> {
        // Store-first: a failed initialize means nothing was touched and the
        // cache must survive for the next incremental run.
        let newly_created = self.vector.initialize().await?;
        self.indexing_started.store(true, Ordering::SeqCst);

        let has_data = self.vector.has_indexed_data().await?;
        let incremental = has_data && !newly_created;
        self.vector.mark_indexing_incomplete().await?;

        let mut cache = self.load_cache();
        let scanner = Scanner::new(
            workspace.clone(),
            self.config.scan.clone(),
            Arc::clone(&self.parser),
        )?;
        let (files, scan_stats) = scanner.scan(&mut cache, incremental, &self.cancel)?;

        let totals = Arc::new(Mutex::new(IndexTotals::default()));

        let graph_pipeline = {
            let graph = Arc::clone(&self.graph);
            let extractor = Arc::clone(&self.extractor);
            let totals = Arc::clone(&totals);
            Pipeline::new(PipelineConfig::graph_store(), move |file: FileBlocks| {
                let graph = Arc::clone(&graph);
                let extractor = Arc::clone(&extractor);
                let totals = Arc::clone(&totals);
                async move {
                    let counts = extractor
                        .index_file(graph.as_ref(), &file.file_path, &file.blocks)
                        .await?;
                    let mut totals = totals.lock().unwrap();
                    totals.indexed += file.blocks.len();
                    totals.nodes_created += counts.nodes_created;
                    totals.relationships_created += counts.relationships_created;
                    Ok(())
                }
                .boxed()
            })
        };

        let embed_pipeline = {
            let vector = Arc::clone(&self.vector);
            let embedder = Arc::clone(&self.embedder);
            Pipeline::new(PipelineConfig::embedding(), move |file: FileBlocks| {
                let vector = Arc::clone(&vector);
                let embedder = Arc::clone(&embedder);
                async move {
                    let texts: Vec<String> =
                        file.blocks.iter().map(|b| b.content.clone()).collect();
                    if texts.is_empty() {
                        return Ok(());
                    }
                    let vectors = embedder.embed(&texts).await?;
                    let points: Vec<VectorPoint> = file
                        .blocks
                        .iter()
                        .zip(vectors)
                        .map(|(block, vector)| VectorPoint {
                            id: crate::extract::block_node_id(block),
                            vector,
                            payload: json!({
                                "filePath": block.file_path,
                                "startLine": block.start_line,
                                "endLine": block.end_line,
                            }),
                        })
                        .collect();
                    vector.upsert_points(&points).await?;
                    Ok(())
                }
                .boxed()
            })
        };

        let mut found = 0usize;
        for file in files {
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            found += file.blocks.len();
            submit_with_backpressure(&graph_pipeline, file.clone()).await;
            submit_with_backpressure(&embed_pipeline, file).await;
        }

        graph_pipeline.drain().await;
        embed_pipeline.drain().await;

        let mut batch_errors: Vec<String> = Vec::new();
        batch_errors.extend(graph_pipeline.take_failures().into_iter().map(|(_, m)| m));
        batch_errors.extend(embed_pipeline.take_failures().into_iter().map(|(_, m)| m));

        graph_pipeline.shutdown(false).await;
        embed_pipeline.shutdown(false).await;

        let totals = {
            let t = totals.lock().unwrap();
            IndexTotals {
                indexed: t.indexed,
                nodes_created: t.nodes_created,
                relationships_created: t.relationships_created,
            }
        };

        if !self.cancel.load(Ordering::SeqCst) {
            evaluate_batch_outcome(found, totals.indexed, &batch_errors)?;
        }

        if let Err(e) = cache.save() {
            warn!("[codegraph][warn] cache save failed: {e}");
        }
        *self.cache.lock().unwrap() = Some(cache);

        self.vector.mark_indexing_complete().await?;

        Ok(IndexSummary {
            found,
            indexed: totals.indexed,
            nodes_created: totals.nodes_created,
            relationships_created: totals.relationships_created,
            files_scanned: scan_stats.files_scanned,
            files_skipped: scan_stats.files_skipped,
            incremental,
            duration_ms: started_at.elapsed().as_millis() as u64,
        })
    }

    /// Cache policy on error: reachable store → clear (divergence guard);
    /// never connected → preserve for the next incremental scan.
    fn handle_failure(&self, error: &IndexError) {
        if self.indexing_started.load(Ordering::SeqCst) {
            let mut cache = self.load_cache();
            if let Err(e) = cache.clear() {
                warn!("[codegraph][warn] cache clear failed: {e}");
            }
        }
        self.state.lock().unwrap().fail(error);
    }

    /// Remove one file from the graph and the cache (before re-index or on
    /// deletion events from the watcher).
    pub async fn remove_file(&self, file_path: &str) -> Result<usize, IndexError> {
        let removed = self
            .extractor
            .remove_file(self.graph.as_ref(), file_path)
            .await?;
        let mut cache = self.load_cache();
        cache.remove_file(file_path);
        if let Err(e) = cache.save() {
            warn!("[codegraph][warn] cache save failed: {e}");
        }
        Ok(removed)
    }

    /// Stop the watcher, delete the vector collection, clear the graph and
    /// the cache. Partial failures are collected and surfaced concatenated.
    pub async fn clear(&self) -> Result<(), IndexError> {
        self.set_watcher_active(false);
        let mut errors: Vec<String> = Vec::new();

        if let Err(e) = self.vector.delete_collection().await {
            errors.push(format!("vector store: {e}"));
        }
        if let Err(e) = self.graph.clear().await {
            errors.push(format!("graph store: {e}"));
        }
        let mut cache = self.load_cache();
        if let Err(e) = cache.clear() {
            errors.push(format!("cache: {e}"));
        }

        let mut state = self.state.lock().unwrap();
        if errors.is_empty() {
            *state = StateManager::new();
            Ok(())
        } else {
            let joined = errors.join("; ");
            let err = IndexError::Unknown(format!("clear failed: {joined}"));
            state.fail(&err);
            Err(err)
        }
    }
}

/// Submit, waiting out full-queue rejections.
async fn submit_with_backpressure<T: Clone + Send + 'static>(pipeline: &Pipeline<T>, item: T) {
    loop {
        match pipeline.submit(item.clone(), 0) {
            Ok(_) => return,
            Err(e) if e.to_string().contains("queue is full") => {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(e) => {
                warn!("[codegraph][warn] pipeline submit failed: {e}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::LineBlockParser;
    use crate::store::{HashEmbeddingProvider, MemoryGraphStore, MemoryVectorStore};
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn orchestrator_for(
        dir: &TempDir,
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorStore>,
    ) -> IndexOrchestrator {
        let config = OrchestratorConfig {
            workspace: Some(dir.path().to_path_buf()),
            cache_path: Some(dir.path().join("cache.json")),
            ..Default::default()
        };
        IndexOrchestrator::new(
            config,
            graph,
            vector,
            Arc::new(HashEmbeddingProvider::default()),
            Arc::new(LineBlockParser),
        )
    }

    #[test]
    fn state_machine_transitions() {
        let mut state = StateManager::new();
        assert_eq!(state.state(), IndexState::Standby);
        state.begin_indexing().unwrap();
        assert_eq!(state.state(), IndexState::Indexing);
        assert!(state.begin_indexing().is_err());
        state.complete();
        assert_eq!(state.state(), IndexState::Indexed);
        state.begin_indexing().unwrap();
        state.fail(&IndexError::Network("down".into()));
        assert_eq!(state.state(), IndexState::Error);
        assert_eq!(
            state.last_error().unwrap().category,
            ErrorCategory::Network
        );
        // Error → Indexing on restart
        state.begin_indexing().unwrap();
        assert!(state.last_error().is_none());
    }

    #[test]
    fn cancel_only_leaves_indexing() {
        let mut state = StateManager::new();
        state.cancel();
        assert_eq!(state.state(), IndexState::Standby);
        state.begin_indexing().unwrap();
        state.cancel();
        assert_eq!(state.state(), IndexState::Standby);
        state.begin_indexing().unwrap();
        state.complete();
        state.cancel();
        assert_eq!(state.state(), IndexState::Indexed);
    }

    #[test]
    fn batch_outcome_success() {
        assert!(evaluate_batch_outcome(100, 95, &[]).is_ok());
        assert!(evaluate_batch_outcome(0, 0, &[]).is_ok());
        // errors under the 10% threshold still pass
        let errors = vec!["one file broke".to_string()];
        assert!(evaluate_batch_outcome(100, 95, &errors).is_ok());
    }

    #[test]
    fn batch_outcome_rate_limit_partial_failure() {
        let errors = vec!["429 rate limit".to_string()];
        let err = evaluate_batch_outcome(100, 40, &errors).unwrap_err();
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

    #[test]
    fn batch_outcome_zero_indexed_is_critical_even_without_errors() {
        let err = evaluate_batch_outcome(10, 0, &[]).unwrap_err();
        match err {
            IndexError::BatchFailure { message, .. } => {
                assert!(message.contains("critical"));
            }
            other => panic!("expected BatchFailure, got {other:?}"),
        }
    }

    #[test]
    fn batch_outcome_errors_with_nothing_found() {
        let errors = vec!["embedding provider exploded".to_string()];
        assert!(evaluate_batch_outcome(0, 0, &errors).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_scan_indexes_workspace() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export const a = 1;\n").unwrap();
        std::fs::write(dir.path().join("b.ts"), "export const b = 2;\n").unwrap();

        let graph = Arc::new(MemoryGraphStore::new());
        let vector = Arc::new(MemoryVectorStore::new());
        let orch = orchestrator_for(&dir, graph.clone(), vector.clone());

        let summary = orch.start_indexing().await.unwrap();
        assert_eq!(orch.state(), IndexState::Indexed);
        assert_eq!(summary.found, 2);
        assert_eq!(summary.indexed, 2);
        assert!(!summary.incremental);
        // one file node + one block node per file
        assert_eq!(graph.node_count().await.unwrap(), 4);
        assert_eq!(vector.point_count(), 2);
        assert!(vector.is_indexing_complete());
        assert_eq!(orch.cached_file_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_run_is_incremental() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export const a = 1;\n").unwrap();

        let graph = Arc::new(MemoryGraphStore::new());
        let vector = Arc::new(MemoryVectorStore::new());
        let orch = orchestrator_for(&dir, graph.clone(), vector.clone());

        orch.start_indexing().await.unwrap();
        let second = orch.start_indexing().await.unwrap();
        assert!(second.incremental);
        assert_eq!(second.files_skipped, 1);
        assert_eq!(second.found, 0);
        assert_eq!(orch.state(), IndexState::Indexed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn never_connected_preserves_cache() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export const a = 1;\n").unwrap();

        // Pre-existing cache from an earlier run.
        let cache_path = dir.path().join("cache.json");
        let mut cache = IndexCache::at_path(cache_path.clone());
        cache.update_file("/old.ts", "h", vec![]);
        cache.save().unwrap();

        let graph = Arc::new(MemoryGraphStore::new());
        let vector = Arc::new(MemoryVectorStore::new());
        vector.fail_initialize_with("connect ECONNREFUSED 127.0.0.1:6333");
        let orch = orchestrator_for(&dir, graph, vector);

        let err = orch.start_indexing().await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(orch.state(), IndexState::Error);
        let state_error = orch.last_error().unwrap();
        assert_eq!(state_error.category, ErrorCategory::Network);
        assert!(!state_error.retry_suggestion.is_empty());
        // store never reached → cache survives
        assert!(cache_path.exists());
    }

    /// Graph store that rejects files whose path contains "fail".
    struct FlakyGraphStore {
        inner: MemoryGraphStore,
    }

    #[async_trait]
    impl GraphStore for FlakyGraphStore {
        async fn upsert_nodes(&self, nodes: &[crate::types::Node]) -> Result<usize, IndexError> {
            if nodes.iter().any(|n| n.file_path.contains("fail")) {
                return Err(IndexError::RateLimit("429 rate limit".into()));
            }
            self.inner.upsert_nodes(nodes).await
        }
        async fn create_relationships(
            &self,
            relationships: &[crate::types::Relationship],
        ) -> Result<usize, IndexError> {
            self.inner.create_relationships(relationships).await
        }
        async fn delete_nodes_by_file_path(&self, file_path: &str) -> Result<usize, IndexError> {
            self.inner.delete_nodes_by_file_path(file_path).await
        }
        async fn clear(&self) -> Result<(), IndexError> {
            self.inner.clear().await
        }
        async fn node_count(&self) -> Result<usize, IndexError> {
            self.inner.node_count().await
        }
        async fn relationship_count(&self) -> Result<usize, IndexError> {
            self.inner.relationship_count().await
        }
        async fn execute_query(
            &self,
            query: &str,
            params: serde_json::Value,
        ) -> Result<serde_json::Value, IndexError> {
            self.inner.execute_query(query, params).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn partial_batch_failure_clears_cache_and_errors() {
        let dir = TempDir::new().unwrap();
        // 2 good files, 6 failing ones: failure rate 75% > 10%
        for i in 0..2 {
            std::fs::write(dir.path().join(format!("ok{i}.ts")), "const x = 1;\n").unwrap();
        }
        for i in 0..6 {
            std::fs::write(dir.path().join(format!("fail{i}.ts")), "const y = 2;\n").unwrap();
        }

        let graph = Arc::new(FlakyGraphStore {
            inner: MemoryGraphStore::new(),
        });
        let vector = Arc::new(MemoryVectorStore::new());
        let orch = orchestrator_for(&dir, graph, vector);

        let err = orch.start_indexing().await.unwrap_err();
        match &err {
            IndexError::BatchFailure {
                indexed,
                found,
                category,
                message,
            } => {
                assert_eq!(*found, 8);
                assert_eq!(*indexed, 2);
                assert_eq!(*category, ErrorCategory::RateLimit);
                assert!(message.contains("429"));
            }
            other => panic!("expected BatchFailure, got {other:?}"),
        }
        assert_eq!(orch.state(), IndexState::Error);
        // store was reached → cache cleared
        assert!(!dir.path().join("cache.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn clear_resets_everything() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.ts"), "const x = 1;\n").unwrap();

        let graph = Arc::new(MemoryGraphStore::new());
        let vector = Arc::new(MemoryVectorStore::new());
        let orch = orchestrator_for(&dir, graph.clone(), vector.clone());

        orch.start_indexing().await.unwrap();
        assert!(graph.node_count().await.unwrap() > 0);

        orch.clear().await.unwrap();
        assert_eq!(orch.state(), IndexState::Standby);
        assert_eq!(graph.node_count().await.unwrap(), 0);
        assert_eq!(vector.point_count(), 0);
        assert!(!dir.path().join("cache.json").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn missing_workspace_is_rejected() {
        let graph = Arc::new(MemoryGraphStore::new());
        let vector = Arc::new(MemoryVectorStore::new());
        let orch = IndexOrchestrator::new(
            OrchestratorConfig::default(),
            graph,
            vector,
            Arc::new(HashEmbeddingProvider::default()),
            Arc::new(LineBlockParser),
        );
        let err = orch.start_indexing().await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(orch.state(), IndexState::Error);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unconfigured_store_is_rejected() {
        let dir = TempDir::new().unwrap();
        let graph = Arc::new(MemoryGraphStore::new());
        let vector = Arc::new(MemoryVectorStore::new());
        let mut config = OrchestratorConfig {
            workspace: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        config.store_configured = false;
        let orch = IndexOrchestrator::new(
            config,
            graph,
            vector,
            Arc::new(HashEmbeddingProvider::default()),
            Arc::new(LineBlockParser),
        );
        let err = orch.start_indexing().await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn remove_file_deletes_nodes_and_cache_entry() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        std::fs::write(&file, "const x = 1;\n").unwrap();

        let graph = Arc::new(MemoryGraphStore::new());
        let vector = Arc::new(MemoryVectorStore::new());
        let orch = orchestrator_for(&dir, graph.clone(), vector);
        orch.start_indexing().await.unwrap();

        let path = file.to_string_lossy().to_string();
        let removed = orch.remove_file(&path).await.unwrap();
        assert!(removed >= 2); // file node + block node
        assert!(graph.nodes().iter().all(|n| n.file_path != path));
    }
}
