//! Embedding generation with request batching and pacing.
//!
//! [`EmbeddingClient`] is one request against a backend. [`Embedder`] sits on top of a client and
//! enforces the backend's limits: at most `batch_size` texts per request and a fixed pause between
//! consecutive requests. Batches run strictly one after another.

mod gemini;
mod hashed;

pub use gemini::GeminiEmbeddingClient;
pub use hashed::HashedEmbeddingClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Dense vector produced for one text.
pub type Embedding = Vec<f32>;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Model identifier could not be resolved.
    #[error("Invalid embedding model identifier: {0:?}")]
    InvalidModel(String),
    /// Provider could not be reached or was not configured.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider rejected the request because of its rate limit.
    #[error("Embedding provider rate limit exceeded: {0}")]
    RateLimited(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider answered with a different number of vectors than texts sent.
    #[error("Expected {expected} embeddings, provider returned {actual}")]
    CountMismatch {
        /// Number of texts in the request.
        expected: usize,
        /// Number of vectors in the response.
        actual: usize,
    },
}

/// Whether an embedding is meant to be searched against or to search with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskMode {
    /// Stored records.
    RetrievalDocument,
    /// Search queries.
    RetrievalQuery,
}

impl TaskMode {
    /// Wire name understood by embedding backends.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            Self::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model reference resolved from a user supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelHandle {
    resource: String,
}

impl ModelHandle {
    /// Resolve `identifier` (`text-embedding-004` or `models/text-embedding-004`).
    pub fn resolve(identifier: &str) -> Result<Self, EmbeddingClientError> {
        let trimmed = identifier.trim();
        let name = trimmed.strip_prefix("models/").unwrap_or(trimmed);
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(EmbeddingClientError::InvalidModel(identifier.to_string()));
        }
        Ok(Self {
            resource: format!("models/{name}"),
        })
    }

    /// Fully qualified resource name, e.g. `models/text-embedding-004`.
    pub fn resource_name(&self) -> &str {
        &self.resource
    }

    /// Bare model name without the `models/` prefix.
    pub fn name(&self) -> &str {
        &self.resource["models/".len()..]
    }
}

/// Interface implemented by embedding backends: one request, one vector per text.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text, in order.
    async fn generate_embeddings(
        &self,
        model: &ModelHandle,
        texts: &[String],
        task: TaskMode,
    ) -> Result<Vec<Embedding>, EmbeddingClientError>;
}

/// Capability used by the searcher and the ingestion pipeline.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed every text, returning vectors in input order.
    async fn get_embeddings(
        &self,
        texts: &[String],
        model: &str,
        task: TaskMode,
    ) -> Result<Vec<Embedding>, EmbeddingClientError>;
}

/// Batching, rate-paced embedder over a single backend client.
pub struct Embedder {
    client: Box<dyn EmbeddingClient>,
    batch_size: usize,
    pause: Duration,
}

impl Embedder {
    /// Backend batch ceiling assumed when nothing else is configured.
    pub const DEFAULT_BATCH_SIZE: usize = 45;
    /// Cool-down between consecutive requests assumed when nothing else is configured.
    pub const DEFAULT_PAUSE: Duration = Duration::from_secs(5);

    /// Wrap `client` with the default batch size and pause.
    pub fn new(client: Box<dyn EmbeddingClient>) -> Self {
        Self {
            client,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            pause: Self::DEFAULT_PAUSE,
        }
    }

    /// Override the maximum number of texts per request (at least one).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Override the pause inserted between consecutive requests.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Build the embedder described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        let client: Box<dyn EmbeddingClient> = match config.embedding_provider {
            EmbeddingProvider::Gemini => {
                let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                    EmbeddingClientError::ProviderUnavailable("GEMINI_API_KEY is not set".into())
                })?;
                let base_url = config
                    .gemini_base_url
                    .clone()
                    .unwrap_or_else(|| GeminiEmbeddingClient::DEFAULT_BASE_URL.to_string());
                Box::new(GeminiEmbeddingClient::new(
                    base_url,
                    api_key,
                    Some(config.embedding_dimension),
                )?)
            }
            EmbeddingProvider::Hashed => {
                Box::new(HashedEmbeddingClient::new(config.embedding_dimension))
            }
        };
        tracing::info!(
            provider = ?config.embedding_provider,
            model = %config.embedding_model,
            batch_size = config.embedding_batch_size,
            pause_secs = config.embedding_batch_pause.as_secs_f64(),
            "Embedding client initialized"
        );
        Ok(Self::new(client)
            .with_batch_size(config.embedding_batch_size)
            .with_pause(config.embedding_batch_pause))
    }

    async fn request(
        &self,
        model: &ModelHandle,
        texts: &[String],
        task: TaskMode,
    ) -> Result<Vec<Embedding>, EmbeddingClientError> {
        let embeddings = self.client.generate_embeddings(model, texts, task).await?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingClientError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl TextEmbedder for Embedder {
    /// Inputs smaller than one batch go out as a single request. Larger inputs are split into
    /// consecutive batches with `pause` between requests. Any failed batch fails the whole call
    /// and earlier batches are discarded.
    async fn get_embeddings(
        &self,
        texts: &[String],
        model: &str,
        task: TaskMode,
    ) -> Result<Vec<Embedding>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = ModelHandle::resolve(model)?;

        if texts.len() < self.batch_size {
            tracing::debug!(model = model.name(), %task, texts = texts.len(), "Embedding single batch");
            return self.request(&model, texts, task).await;
        }

        let batch_count = texts.len().div_ceil(self.batch_size);
        let mut embeddings = Vec::with_capacity(texts.len());
        for (index, batch) in texts.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pause).await;
            }
            tracing::debug!(
                model = model.name(),
                %task,
                batch = index + 1,
                batches = batch_count,
                texts = batch.len(),
                "Embedding batch"
            );
            let vectors = self.request(&model, batch, task).await.inspect_err(|error| {
                tracing::error!(batch = index + 1, error = %error, "Embedding batch failed");
            })?;
            embeddings.extend(vectors);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        model: String,
        size: usize,
        task: TaskMode,
    }

    /// Returns `[n]` for the text `"n"` and records every request.
    #[derive(Clone, Default)]
    struct RecordingClient {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_on_call: Option<usize>,
        drop_last: bool,
    }

    impl RecordingClient {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl EmbeddingClient for RecordingClient {
        async fn generate_embeddings(
            &self,
            model: &ModelHandle,
            texts: &[String],
            task: TaskMode,
        ) -> Result<Vec<Embedding>, EmbeddingClientError> {
            let call_number = {
                let mut calls = self.calls.lock().expect("calls lock");
                calls.push(Call {
                    model: model.resource_name().to_string(),
                    size: texts.len(),
                    task,
                });
                calls.len()
            };
            if self.fail_on_call == Some(call_number) {
                return Err(EmbeddingClientError::RateLimited("quota exhausted".into()));
            }
            let mut vectors: Vec<Embedding> = texts
                .iter()
                .map(|text| vec![text.parse::<f32>().expect("numeric text")])
                .collect();
            if self.drop_last {
                vectors.pop();
            }
            Ok(vectors)
        }
    }

    fn numbered_texts(count: usize) -> Vec<String> {
        (0..count).map(|index| index.to_string()).collect()
    }

    fn embedder(client: &RecordingClient) -> Embedder {
        Embedder::new(Box::new(client.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn large_input_is_split_into_paced_batches() {
        let client = RecordingClient::default();
        let texts = numbered_texts(100);

        let started = Instant::now();
        let embeddings = embedder(&client)
            .get_embeddings(&texts, "text-embedding-004", TaskMode::RetrievalDocument)
            .await
            .expect("embeddings");
        let elapsed = started.elapsed();

        assert_eq!(embeddings.len(), 100);
        for (index, embedding) in embeddings.iter().enumerate() {
            assert_eq!(embedding, &vec![index as f32]);
        }
        let sizes: Vec<usize> = client.calls().iter().map(|call| call.size).collect();
        assert_eq!(sizes, vec![45, 45, 10]);
        // Two pauses between three batches, none after the last.
        assert!(elapsed >= Duration::from_secs(10), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(15), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn input_below_batch_size_uses_one_request_without_pause() {
        let client = RecordingClient::default();
        let started = Instant::now();
        let embeddings = embedder(&client)
            .get_embeddings(&numbered_texts(44), "text-embedding-004", TaskMode::RetrievalDocument)
            .await
            .expect("embeddings");

        assert_eq!(embeddings.len(), 44);
        assert_eq!(client.calls().len(), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn exact_batch_size_uses_one_request() {
        let client = RecordingClient::default();
        let embeddings = embedder(&client)
            .get_embeddings(&numbered_texts(45), "text-embedding-004", TaskMode::RetrievalDocument)
            .await
            .expect("embeddings");

        assert_eq!(embeddings.len(), 45);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_input_skips_the_backend() {
        let client = RecordingClient::default();
        let embeddings = embedder(&client)
            .get_embeddings(&[], "text-embedding-004", TaskMode::RetrievalQuery)
            .await
            .expect("embeddings");

        assert!(embeddings.is_empty());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn task_mode_and_model_are_passed_through() {
        let client = RecordingClient::default();
        embedder(&client)
            .get_embeddings(&numbered_texts(1), " text-embedding-004 ", TaskMode::RetrievalQuery)
            .await
            .expect("embeddings");

        assert_eq!(
            client.calls(),
            vec![Call {
                model: "models/text-embedding-004".into(),
                size: 1,
                task: TaskMode::RetrievalQuery,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_batch_aborts_the_whole_call() {
        let client = RecordingClient {
            fail_on_call: Some(2),
            ..Default::default()
        };
        let error = embedder(&client)
            .get_embeddings(&numbered_texts(100), "text-embedding-004", TaskMode::RetrievalDocument)
            .await
            .expect_err("second batch fails");

        assert!(matches!(error, EmbeddingClientError::RateLimited(_)));
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn short_responses_are_rejected() {
        let client = RecordingClient {
            drop_last: true,
            ..Default::default()
        };
        let error = embedder(&client)
            .get_embeddings(&numbered_texts(3), "text-embedding-004", TaskMode::RetrievalDocument)
            .await
            .expect_err("count mismatch");

        assert!(matches!(
            error,
            EmbeddingClientError::CountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn blank_model_is_rejected_before_any_request() {
        let client = RecordingClient::default();
        let error = embedder(&client)
            .get_embeddings(&numbered_texts(2), "  ", TaskMode::RetrievalDocument)
            .await
            .expect_err("invalid model");

        assert!(matches!(error, EmbeddingClientError::InvalidModel(_)));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn model_handles_normalise_prefix() {
        let bare = ModelHandle::resolve("text-embedding-004").expect("bare");
        let prefixed = ModelHandle::resolve("models/text-embedding-004").expect("prefixed");
        assert_eq!(bare, prefixed);
        assert_eq!(bare.name(), "text-embedding-004");
        assert!(ModelHandle::resolve("models/").is_err());
    }

    #[test]
    fn task_modes_use_wire_names() {
        assert_eq!(TaskMode::RetrievalDocument.to_string(), "RETRIEVAL_DOCUMENT");
        assert_eq!(
            serde_json::to_value(TaskMode::RetrievalQuery).expect("json"),
            serde_json::json!("RETRIEVAL_QUERY")
        );
    }
}
