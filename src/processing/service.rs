//! Pipeline service coordinating summarization, embedding, and vector store operations.

use crate::{
    config::Config,
    embedding::{Embedder, TaskMode, TextEmbedder},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::types::{Document, IngestOutcome, ProcessingError},
    search::{Searcher, SimilarityResult, VectorSearcher},
    store::{self, StoredRecord, VectorStore},
    summarization::{TextSummarizer, TfidfSummarizer, count_words},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Values the pipeline needs beyond its components.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Embedding model used for documents and queries.
    pub model: String,
    /// Collection holding the embedded records.
    pub collection: String,
    /// Vector dimension used when creating the collection.
    pub dimension: usize,
    /// Word budget for each summary.
    pub max_words: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.embedding_model.clone(),
            collection: config.qdrant_collection_name.clone(),
            dimension: config.embedding_dimension,
            max_words: config.summary_max_words,
        }
    }
}

/// Coordinates ingestion (summarize, embed, store) and search over one collection.
///
/// Construct once near process start and share through an `Arc`; the CLI and the HTTP surface
/// reuse the same instance.
pub struct PipelineService {
    summarizer: Arc<dyn TextSummarizer>,
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<dyn VectorStore>,
    searcher: VectorSearcher,
    metrics: Arc<PipelineMetrics>,
    settings: PipelineSettings,
}

/// Abstraction over the pipeline used by external surfaces.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Summarize, embed, and store documents.
    async fn ingest(&self, documents: Vec<Document>) -> Result<IngestOutcome, ProcessingError>;

    /// Return stored records similar to `query`, most similar first.
    async fn search(&self, query: &str) -> Result<Vec<SimilarityResult>, ProcessingError>;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineService {
    /// Assemble a service from explicit components.
    pub fn new(
        summarizer: Arc<dyn TextSummarizer>,
        embedder: Arc<dyn TextEmbedder>,
        store: Arc<dyn VectorStore>,
        settings: PipelineSettings,
    ) -> Self {
        let searcher = VectorSearcher::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            settings.model.clone(),
            settings.collection.clone(),
        );
        Self {
            summarizer,
            embedder,
            store,
            searcher,
            metrics: Arc::new(PipelineMetrics::new()),
            settings,
        }
    }

    /// Build the components described by `config` and ensure the collection exists.
    pub async fn from_config(config: &Config) -> Result<Self, ProcessingError> {
        let embedder = Embedder::from_config(config)?;
        let store = store::build_store(config)?;
        let service = Self::new(
            Arc::new(TfidfSummarizer::new()),
            Arc::new(embedder),
            store,
            PipelineSettings::from(config),
        );
        service.ensure_collection().await?;
        Ok(service)
    }

    /// Create the collection unless it already exists.
    pub async fn ensure_collection(&self) -> Result<(), ProcessingError> {
        self.store
            .ensure_collection(&self.settings.collection, self.settings.dimension)
            .await?;
        tracing::debug!(collection = %self.settings.collection, "Collection ensured");
        Ok(())
    }

    /// Remove every stored record, leaving an empty collection.
    pub async fn reset_collection(&self) -> Result<(), ProcessingError> {
        self.store
            .reset_collection(&self.settings.collection, self.settings.dimension)
            .await?;
        tracing::info!(collection = %self.settings.collection, "Collection reset");
        Ok(())
    }

    /// Summarize every document, embed all summaries in one call, then store the records.
    ///
    /// Nothing is written when embedding fails.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestOutcome, ProcessingError> {
        self.index(documents, false).await
    }

    /// Like [`PipelineService::ingest`], but replaces the collection contents.
    ///
    /// The collection is reset only after every summary has been embedded, so an embedding
    /// failure leaves the existing records in place.
    pub async fn ingest_replacing(
        &self,
        documents: Vec<Document>,
    ) -> Result<IngestOutcome, ProcessingError> {
        self.index(documents, true).await
    }

    async fn index(
        &self,
        documents: Vec<Document>,
        replace: bool,
    ) -> Result<IngestOutcome, ProcessingError> {
        if documents.is_empty() {
            if replace {
                self.reset_collection().await?;
            }
            return Ok(IngestOutcome::default());
        }

        let max_words = self.settings.max_words;
        let summaries: Vec<String> = documents
            .iter()
            .map(|document| self.summarizer.summarize(&document.raw_text, max_words))
            .collect();
        let empty_summaries = summaries.iter().filter(|summary| summary.is_empty()).count();
        if empty_summaries > 0 {
            tracing::warn!(
                empty_summaries,
                max_words,
                "Some documents produced empty summaries"
            );
        }
        tracing::debug!(
            documents = documents.len(),
            summary_words = summaries.iter().map(|summary| count_words(summary)).sum::<usize>(),
            "Summaries prepared"
        );

        let embeddings = self
            .embedder
            .get_embeddings(&summaries, &self.settings.model, TaskMode::RetrievalDocument)
            .await?;

        debug_assert_eq!(documents.len(), embeddings.len());

        let document_count = documents.len();
        let records: Vec<StoredRecord> = documents
            .into_iter()
            .zip(embeddings)
            .map(|(document, embedding)| document.into_record(embedding))
            .collect();
        if replace {
            self.reset_collection().await?;
        }
        let indexed = self
            .store
            .upsert(&self.settings.collection, &records)
            .await?;

        self.metrics
            .record_ingest(indexed as u64, empty_summaries as u64);
        tracing::info!(
            collection = %self.settings.collection,
            documents = document_count,
            indexed,
            empty_summaries,
            "Documents indexed"
        );

        Ok(IngestOutcome {
            documents: document_count,
            indexed,
            empty_summaries,
        })
    }

    /// Embed `query` and return matching records above the similarity threshold.
    pub async fn search(&self, query: &str) -> Result<Vec<SimilarityResult>, ProcessingError> {
        let results = self.searcher.search(query).await?;
        self.metrics.record_search();
        tracing::info!(
            collection = %self.settings.collection,
            results = results.len(),
            "Search answered"
        );
        Ok(results)
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn ingest(&self, documents: Vec<Document>) -> Result<IngestOutcome, ProcessingError> {
        PipelineService::ingest(self, documents).await
    }

    async fn search(&self, query: &str) -> Result<Vec<SimilarityResult>, ProcessingError> {
        PipelineService::search(self, query).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PipelineService::metrics_snapshot(self)
    }
}
