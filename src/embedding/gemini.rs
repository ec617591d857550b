//! Gemini `batchEmbedContents` adapter.

use super::{Embedding, EmbeddingClient, EmbeddingClientError, ModelHandle, TaskMode};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

/// Embedding client issuing one `batchEmbedContents` call per request.
pub struct GeminiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    output_dimensionality: Option<usize>,
}

impl GeminiEmbeddingClient {
    /// Public Generative Language API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    /// Construct a client for `base_url`, optionally truncating vectors to a fixed size.
    pub fn new(
        base_url: String,
        api_key: String,
        output_dimensionality: Option<usize>,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("plotsearch/embed")
            .build()
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            api_key,
            output_dimensionality,
        })
    }

    fn endpoint(&self, model: &ModelHandle) -> String {
        format!(
            "{}/v1beta/{}:batchEmbedContents",
            self.base_url.trim_end_matches('/'),
            model.resource_name()
        )
    }

    fn request_body(&self, model: &ModelHandle, texts: &[String], task: TaskMode) -> Value {
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                let mut request = json!({
                    "model": model.resource_name(),
                    "content": { "parts": [{ "text": text }] },
                    "taskType": task.as_str(),
                });
                if let Some(dimension) = self.output_dimensionality
                    && let Some(object) = request.as_object_mut()
                {
                    object.insert("outputDimensionality".into(), Value::from(dimension));
                }
                request
            })
            .collect();
        json!({ "requests": requests })
    }
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        model: &ModelHandle,
        texts: &[String],
        task: TaskMode,
    ) -> Result<Vec<Embedding>, EmbeddingClientError> {
        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(model, texts, task))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model = model.name(), "Gemini rate limit hit");
            return Err(EmbeddingClientError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(model = model.name(), %status, "Gemini embedding request failed");
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: BatchEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Gemini response: {error}"
            ))
        })?;

        Ok(body
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}
