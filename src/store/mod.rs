//! Vector store abstraction and backends.

mod memory;
mod qdrant;

pub use memory::InMemoryStore;
pub use qdrant::QdrantStore;

use crate::config::{Config, VectorStoreKind};
use crate::embedding::Embedding;
use crate::search::SimilarityResult;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Identifier of a persisted record.
pub type RecordId = u64;

/// Errors returned by vector store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid vector store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Store responded with an unexpected status code.
    #[error("Unexpected vector store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Target collection does not exist.
    #[error("Collection '{0}' does not exist")]
    MissingCollection(String),
    /// Vector length differs from the collection's dimensionality.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the collection.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },
    /// Store response could not be interpreted.
    #[error("Malformed vector store response: {0}")]
    InvalidResponse(String),
}

/// Row persisted for one ingested document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Integer identifier of the row.
    pub id: RecordId,
    /// Document fields, excluding summary and embedding.
    pub metadata: Map<String, Value>,
    /// Embedding of the document summary.
    pub embedding: Embedding,
}

/// Storage backend answering cosine similarity queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create `collection` for vectors of `dimension` values unless it already exists.
    async fn ensure_collection(&self, collection: &str, dimension: usize)
    -> Result<(), StoreError>;

    /// Drop every record of `collection`, recreating it empty.
    async fn reset_collection(&self, collection: &str, dimension: usize) -> Result<(), StoreError>;

    /// Insert or replace records by id, returning how many were written.
    async fn upsert(&self, collection: &str, records: &[StoredRecord])
    -> Result<usize, StoreError>;

    /// Return records whose similarity (`1 - cosine_distance`) to `vector` is at least
    /// `min_similarity`, in no guaranteed order.
    async fn similarity_candidates(
        &self,
        collection: &str,
        vector: &[f32],
        min_similarity: f32,
    ) -> Result<Vec<SimilarityResult>, StoreError>;
}

/// Build the store selected by `config`.
pub fn build_store(config: &Config) -> Result<Arc<dyn VectorStore>, StoreError> {
    let store: Arc<dyn VectorStore> = match config.vector_store {
        VectorStoreKind::Qdrant => Arc::new(QdrantStore::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
            config.search_candidate_limit,
        )?),
        VectorStoreKind::Memory => Arc::new(InMemoryStore::new()),
    };
    tracing::info!(backend = ?config.vector_store, "Vector store initialized");
    Ok(store)
}

/// Cosine similarity of two vectors, `0.0` when either has zero magnitude.
pub(crate) fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let norm_left: f32 = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let norm_right: f32 = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }
    dot / (norm_left * norm_right)
}
