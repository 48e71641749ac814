//! Narrow contracts for the external stores.
//!
//! The property-graph store and the vector store are external collaborators;
//! this module defines the slices of their APIs the indexer consumes, plus
//! in-memory implementations backing the test suite and offline CLI runs.

pub mod graph;
pub mod vector;

pub use graph::{GraphStore, MemoryGraphStore};
pub use vector::{
    EmbeddingProvider, HashEmbeddingProvider, MemoryVectorStore, VectorPoint, VectorStore,
};
