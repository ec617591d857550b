//! Core data types and error definitions for the ingestion pipeline.

use crate::{
    embedding::{Embedding, EmbeddingClientError},
    processing::dataset::DatasetError,
    search::SearchError,
    store::{RecordId, StoreError, StoredRecord},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Metadata key under which the raw document text is persisted.
pub const TEXT_FIELD: &str = "text";

/// Errors emitted by the ingestion and search pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Dataset could not be loaded.
    #[error("Failed to load dataset: {0}")]
    Dataset(#[from] DatasetError),
    /// Embedding provider failed to produce vectors for the summaries.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store rejected a collection or write operation.
    #[error("Vector store request failed: {0}")]
    Store(#[from] StoreError),
    /// Search could not be answered.
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
}

/// Raw record accepted for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier reused as the stored record id.
    pub id: RecordId,
    /// Text that is summarized and embedded.
    pub raw_text: String,
    /// Scalar fields carried alongside the text.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Convert into a stored row: metadata plus the raw text under [`TEXT_FIELD`].
    ///
    /// A metadata entry named [`TEXT_FIELD`] is replaced by the raw text.
    pub(crate) fn into_record(self, embedding: Embedding) -> StoredRecord {
        let Self {
            id,
            raw_text,
            mut metadata,
        } = self;
        metadata.insert(TEXT_FIELD.into(), Value::String(raw_text));
        StoredRecord {
            id,
            metadata,
            embedding,
        }
    }
}

/// Summary of a completed ingestion produced by [`crate::processing::PipelineService::ingest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// Number of documents received.
    pub documents: usize,
    /// Number of records written to the vector store.
    pub indexed: usize,
    /// Documents whose summary came out empty.
    pub empty_summaries: usize,
}
