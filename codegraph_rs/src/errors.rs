//! Error taxonomy for indexing operations.
//!
//! Every failure path maps into a closed category set so the UI layer can
//! render a single state transition with a retry suggestion attached.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Authorization,
    RateLimit,
    Network,
    Timeout,
    VectorStore,
    GraphStore,
    EmbeddingProvider,
    Parse,
    Validation,
    CircularReference,
    SizeLimit,
    Deadlock,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::VectorStore => "vector_store",
            ErrorCategory::GraphStore => "graph_store",
            ErrorCategory::EmbeddingProvider => "embedding_provider",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Validation => "validation",
            ErrorCategory::CircularReference => "circular_reference",
            ErrorCategory::SizeLimit => "size_limit",
            ErrorCategory::Deadlock => "deadlock",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// User-facing hint shown alongside the error state.
    pub fn retry_suggestion(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => {
                "Check the indexer configuration and restart indexing."
            }
            ErrorCategory::Authentication => "Verify the store credentials and retry.",
            ErrorCategory::Authorization => {
                "The configured account lacks permission for this operation."
            }
            ErrorCategory::RateLimit => "The provider is rate limiting; retry after a pause.",
            ErrorCategory::Network => "Check connectivity to the stores and retry.",
            ErrorCategory::Timeout => "The operation timed out; retry or raise the timeout.",
            ErrorCategory::VectorStore => "The vector store rejected the request; see the log.",
            ErrorCategory::GraphStore => "The graph store rejected the request; see the log.",
            ErrorCategory::EmbeddingProvider => {
                "The embedding provider failed; verify the model endpoint."
            }
            ErrorCategory::Parse => "One or more files failed to parse; see the log.",
            ErrorCategory::Validation => "Relationship metadata failed validation; see the log.",
            ErrorCategory::CircularReference => {
                "Metadata contained a circular reference and was rejected."
            }
            ErrorCategory::SizeLimit => {
                "Metadata exceeded the size limit and truncation is disabled."
            }
            ErrorCategory::Deadlock => "A pipeline task stalled; restart indexing.",
            ErrorCategory::Unknown => "An unexpected error occurred; retry indexing.",
        }
    }

    /// Best-effort classification of an arbitrary error message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
            ErrorCategory::RateLimit
        } else if lower.contains("401") || lower.contains("unauthenticated")
            || lower.contains("api key") || lower.contains("authentication")
        {
            ErrorCategory::Authentication
        } else if lower.contains("403") || lower.contains("forbidden")
            || lower.contains("permission")
        {
            ErrorCategory::Authorization
        } else if lower.contains("timeout") || lower.contains("etimedout") {
            ErrorCategory::Timeout
        } else if lower.contains("econnrefused")
            || lower.contains("econnreset")
            || lower.contains("enotfound")
            || lower.contains("network")
            || lower.contains("dns")
        {
            ErrorCategory::Network
        } else if lower.contains("vector") || lower.contains("collection") {
            ErrorCategory::VectorStore
        } else if lower.contains("graph") || lower.contains("cypher") {
            ErrorCategory::GraphStore
        } else if lower.contains("embedding") {
            ErrorCategory::EmbeddingProvider
        } else if lower.contains("parse") || lower.contains("grammar") {
            ErrorCategory::Parse
        } else if lower.contains("circular") {
            ErrorCategory::CircularReference
        } else if lower.contains("size limit") || lower.contains("too large") {
            ErrorCategory::SizeLimit
        } else if lower.contains("deadlock") || lower.contains("stalled") {
            ErrorCategory::Deadlock
        } else {
            ErrorCategory::Unknown
        }
    }
}

/// Indexing error with category, message, and partial-progress context where
/// the operation got far enough to have any.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("graph store error: {0}")]
    GraphStore(String),

    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("circular reference in metadata: {0}")]
    CircularReference(String),

    #[error("metadata size limit exceeded: {0}")]
    SizeLimit(String),

    #[error("pipeline deadlock: {0}")]
    Deadlock(String),

    /// Batch-level failure carrying the counters achieved before the failure.
    #[error("batch failure: {message} ({indexed}/{found} blocks indexed)")]
    BatchFailure {
        message: String,
        indexed: usize,
        found: usize,
        category: ErrorCategory,
    },

    #[error("{0}")]
    Unknown(String),
}

impl IndexError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IndexError::Configuration(_) => ErrorCategory::Configuration,
            IndexError::Authentication(_) => ErrorCategory::Authentication,
            IndexError::Authorization(_) => ErrorCategory::Authorization,
            IndexError::RateLimit(_) => ErrorCategory::RateLimit,
            IndexError::Network(_) => ErrorCategory::Network,
            IndexError::Timeout(_) => ErrorCategory::Timeout,
            IndexError::VectorStore(_) => ErrorCategory::VectorStore,
            IndexError::GraphStore(_) => ErrorCategory::GraphStore,
            IndexError::EmbeddingProvider(_) => ErrorCategory::EmbeddingProvider,
            IndexError::Parse(_) => ErrorCategory::Parse,
            IndexError::Validation(_) => ErrorCategory::Validation,
            IndexError::CircularReference(_) => ErrorCategory::CircularReference,
            IndexError::SizeLimit(_) => ErrorCategory::SizeLimit,
            IndexError::Deadlock(_) => ErrorCategory::Deadlock,
            IndexError::BatchFailure { category, .. } => *category,
            IndexError::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    /// Retryable errors get re-queued by the pipeline; terminal ones surface.
    pub fn is_retryable(&self) -> bool {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::RateLimit => true,
            _ => retryable_message(&self.to_string()),
        }
    }
}

impl IndexError {
    /// Build the variant matching a message's best-effort category.
    pub fn categorized(message: impl Into<String>) -> IndexError {
        let message = message.into();
        match ErrorCategory::from_message(&message) {
            ErrorCategory::Configuration => IndexError::Configuration(message),
            ErrorCategory::Authentication => IndexError::Authentication(message),
            ErrorCategory::Authorization => IndexError::Authorization(message),
            ErrorCategory::RateLimit => IndexError::RateLimit(message),
            ErrorCategory::Network => IndexError::Network(message),
            ErrorCategory::Timeout => IndexError::Timeout(message),
            ErrorCategory::VectorStore => IndexError::VectorStore(message),
            ErrorCategory::GraphStore => IndexError::GraphStore(message),
            ErrorCategory::EmbeddingProvider => IndexError::EmbeddingProvider(message),
            ErrorCategory::Parse => IndexError::Parse(message),
            ErrorCategory::Validation => IndexError::Validation(message),
            ErrorCategory::CircularReference => IndexError::CircularReference(message),
            ErrorCategory::SizeLimit => IndexError::SizeLimit(message),
            ErrorCategory::Deadlock => IndexError::Deadlock(message),
            ErrorCategory::Unknown => IndexError::Unknown(message),
        }
    }
}

/// Message-level retryability check: transport error codes plus the usual
/// transient-failure vocabulary.
pub fn retryable_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    const MARKERS: &[&str] = &[
        "econnreset",
        "etimedout",
        "enotfound",
        "econnrefused",
        "network",
        "timeout",
        "rate limit",
        "temporary",
        "busy",
    ];
    MARKERS.iter().any(|m| lower.contains(m))
}
