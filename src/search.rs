//! Query-time retrieval: embed the query, score stored records, filter and rank.

use crate::embedding::{EmbeddingClientError, TaskMode, TextEmbedder};
use crate::store::{RecordId, StoreError, VectorStore};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;

/// Records must score strictly above this similarity to be returned.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    /// Identifier of the stored record.
    pub id: RecordId,
    /// Stored record metadata.
    pub data: Map<String, Value>,
    /// `1 - cosine_distance` between the query and the record embedding.
    pub similarity: f32,
}

/// Errors emitted while answering a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedding provider failed to return a vector for the query.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store query failed.
    #[error("Vector store query failed: {0}")]
    Store(#[from] StoreError),
    /// Embedding provider returned no vector.
    #[error("Embedding provider returned no vector for the query")]
    EmptyEmbedding,
}

/// Interface implemented by search strategies.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Return records similar to `query`, most similar first.
    async fn search(&self, query: &str) -> Result<Vec<SimilarityResult>, SearchError>;
}

/// Cosine similarity search over a vector store collection.
///
/// Holds no mutable state, so one instance can serve concurrent callers.
pub struct VectorSearcher {
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<dyn VectorStore>,
    model: String,
    collection: String,
}

impl VectorSearcher {
    /// Search `collection` in `store`, embedding queries with `model`.
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        store: Arc<dyn VectorStore>,
        model: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            model: model.into(),
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl Searcher for VectorSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SimilarityResult>, SearchError> {
        let mut vectors = self
            .embedder
            .get_embeddings(&[query.to_string()], &self.model, TaskMode::RetrievalQuery)
            .await?;
        let vector = vectors.pop().ok_or(SearchError::EmptyEmbedding)?;

        let candidates = self
            .store
            .similarity_candidates(&self.collection, &vector, SIMILARITY_THRESHOLD)
            .await?;
        let candidate_count = candidates.len();
        let results = rank_results(candidates, SIMILARITY_THRESHOLD);

        tracing::debug!(
            collection = %self.collection,
            candidates = candidate_count,
            results = results.len(),
            "Search completed"
        );
        Ok(results)
    }
}

/// Keep results scoring strictly above `threshold`, ordered by similarity descending and then
/// by ascending id.
pub fn rank_results(mut results: Vec<SimilarityResult>, threshold: f32) -> Vec<SimilarityResult> {
    results.retain(|result| result.similarity > threshold);
    results.sort_by(|left, right| {
        right
            .similarity
            .partial_cmp(&left.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.id.cmp(&right.id))
    });
    results
}
