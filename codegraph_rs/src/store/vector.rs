//! Vector-store and embedding-provider contracts with in-memory stand-ins.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::IndexError;

/// One point in the vector collection: deterministic id, embedding, payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// The vector-store slice the orchestrator drives.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Ensure the collection exists. Returns true when it was just created.
    async fn initialize(&self) -> Result<bool, IndexError>;

    async fn has_indexed_data(&self) -> Result<bool, IndexError>;

    /// Durability marker: set before a scan, cleared on success, so a crashed
    /// run is detectable on the next start.
    async fn mark_indexing_incomplete(&self) -> Result<(), IndexError>;

    async fn mark_indexing_complete(&self) -> Result<(), IndexError>;

    async fn delete_collection(&self) -> Result<(), IndexError>;

    async fn clear_collection(&self) -> Result<(), IndexError>;

    async fn upsert_points(&self, points: &[VectorPoint]) -> Result<usize, IndexError>;
}

/// Text → vector provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError>;

    fn dimension(&self) -> usize;
}

#[derive(Default)]
struct VectorState {
    points: HashMap<String, VectorPoint>,
    collection_exists: bool,
    indexing_complete: bool,
}

/// In-memory vector store for tests and offline runs.
#[derive(Default)]
pub struct MemoryVectorStore {
    state: Mutex<VectorState>,
    fail_initialize: Mutex<Option<String>>,
    fail_upserts: Mutex<Option<String>>,
    /// Pretend the collection already held data before this process started.
    preexisting_data: AtomicBool,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preexisting_data() -> Self {
        let store = Self::default();
        store.preexisting_data.store(true, Ordering::SeqCst);
        store.state.lock().unwrap().collection_exists = true;
        store
    }

    pub fn fail_initialize_with(&self, message: impl Into<String>) {
        *self.fail_initialize.lock().unwrap() = Some(message.into());
    }

    pub fn fail_upserts_with(&self, message: impl Into<String>) {
        *self.fail_upserts.lock().unwrap() = Some(message.into());
    }

    pub fn point_count(&self) -> usize {
        self.state.lock().unwrap().points.len()
    }

    pub fn is_indexing_complete(&self) -> bool {
        self.state.lock().unwrap().indexing_complete
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn initialize(&self) -> Result<bool, IndexError> {
        if let Some(message) = self.fail_initialize.lock().unwrap().clone() {
            return Err(IndexError::categorized(message));
        }
        let mut state = self.state.lock().unwrap();
        let created = !state.collection_exists;
        state.collection_exists = true;
        Ok(created)
    }

    async fn has_indexed_data(&self) -> Result<bool, IndexError> {
        let state = self.state.lock().unwrap();
        Ok(!state.points.is_empty() || self.preexisting_data.load(Ordering::SeqCst))
    }

    async fn mark_indexing_incomplete(&self) -> Result<(), IndexError> {
        self.state.lock().unwrap().indexing_complete = false;
        Ok(())
    }

    async fn mark_indexing_complete(&self) -> Result<(), IndexError> {
        self.state.lock().unwrap().indexing_complete = true;
        Ok(())
    }

    async fn delete_collection(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock().unwrap();
        state.points.clear();
        state.collection_exists = false;
        self.preexisting_data.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn clear_collection(&self) -> Result<(), IndexError> {
        self.state.lock().unwrap().points.clear();
        self.preexisting_data.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_points(&self, points: &[VectorPoint]) -> Result<usize, IndexError> {
        if let Some(message) = self.fail_upserts.lock().unwrap().clone() {
            return Err(IndexError::categorized(message));
        }
        let mut state = self.state.lock().unwrap();
        for point in points {
            state.points.insert(point.id.clone(), point.clone());
        }
        Ok(points.len())
    }
}

/// Deterministic offline embedder: hashes text into a fixed-dimension vector.
/// Useful for tests and dry runs where no model endpoint is configured.
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; self.dimension];
                for (i, byte) in text.bytes().enumerate() {
                    vector[i % self.dimension] += f32::from(byte) / 255.0;
                }
                let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for v in &mut vector {
                        *v /= norm;
                    }
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_reports_creation_once() {
        let store = MemoryVectorStore::new();
        assert!(store.initialize().await.unwrap());
        assert!(!store.initialize().await.unwrap());
    }

    #[tokio::test]
    async fn preexisting_collection_is_not_newly_created() {
        let store = MemoryVectorStore::with_preexisting_data();
        assert!(!store.initialize().await.unwrap());
        assert!(store.has_indexed_data().await.unwrap());
    }

    #[tokio::test]
    async fn completeness_markers_round_trip() {
        let store = MemoryVectorStore::new();
        store.mark_indexing_incomplete().await.unwrap();
        assert!(!store.is_indexing_complete());
        store.mark_indexing_complete().await.unwrap();
        assert!(store.is_indexing_complete());
    }

    #[tokio::test]
    async fn upsert_and_clear() {
        let store = MemoryVectorStore::new();
        store.initialize().await.unwrap();
        let point = VectorPoint {
            id: "function:/a.ts:1".into(),
            vector: vec![0.1, 0.2],
            payload: serde_json::json!({"path": "/a.ts"}),
        };
        store.upsert_points(&[point.clone()]).await.unwrap();
        store.upsert_points(&[point]).await.unwrap();
        assert_eq!(store.point_count(), 1);
        store.clear_collection().await.unwrap();
        assert_eq!(store.point_count(), 0);
    }

    #[tokio::test]
    async fn injected_initialize_failure() {
        let store = MemoryVectorStore::new();
        store.fail_initialize_with("connect ECONNREFUSED 127.0.0.1:6333");
        let err = store.initialize().await.unwrap_err();
        assert_eq!(
            err.category(),
            crate::errors::ErrorCategory::Network
        );
    }

    #[tokio::test]
    async fn hash_embeddings_are_deterministic() {
        let provider = HashEmbeddingProvider::default();
        let a = provider.embed(&["fn main() {}".into()]).await.unwrap();
        let b = provider.embed(&["fn main() {}".into()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), provider.dimension());
    }
}
