//! HTTP client wrapper for Qdrant collections using cosine distance.

use super::{RecordId, StoreError, StoredRecord, VectorStore};
use crate::search::SimilarityResult;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Qdrant-backed vector store. Point ids are the record ids; payloads are the record metadata.
///
/// Similarity queries are paged `page_size` points at a time until Qdrant returns a short page,
/// so every point above the threshold is returned.
///
/// Collections are created with `Cosine` distance, for which Qdrant reports the cosine
/// similarity itself as the score, i.e. `1 - cosine_distance`.
pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    page_size: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
struct QueryPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

impl QdrantStore {
    /// Construct a client for the Qdrant instance at `url`.
    pub fn new(
        url: &str,
        api_key: Option<String>,
        page_size: usize,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("plotsearch/0.1").build()?;
        let base_url = normalize_base_url(url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            page_size,
            "Initialized Qdrant HTTP client"
        );
        Ok(Self {
            client,
            base_url,
            api_key,
            page_size: page_size.max(1),
        })
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = StoreError::UnexpectedStatus { status, body };
                tracing::error!(collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<(), StoreError> {
        let body = json!({
            "vectors": {
                "size": dimension,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection, dimension, "Collection created");
        })
        .await
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &format!("collections/{collection}"))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.ensure_success(response, || {
            tracing::debug!(collection, "Collection deleted");
        })
        .await
    }

    async fn query_page(
        &self,
        collection: &str,
        vector: &[f32],
        min_similarity: f32,
        offset: usize,
    ) -> Result<Vec<QueryPoint>, StoreError> {
        let body = json!({
            "query": vector,
            "limit": self.page_size,
            "offset": offset,
            "with_payload": true,
            "score_threshold": min_similarity,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection}/points/query"),
            )
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::MissingCollection(collection.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(collection, offset, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        Ok(match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), StoreError> {
        if self.collection_exists(collection).await? {
            return Ok(());
        }
        self.create_collection(collection, dimension).await
    }

    async fn reset_collection(&self, collection: &str, dimension: usize) -> Result<(), StoreError> {
        self.delete_collection(collection).await?;
        self.create_collection(collection, dimension).await
    }

    async fn upsert(
        &self,
        collection: &str,
        records: &[StoredRecord],
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let points: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "vector": record.embedding,
                    "payload": record.metadata,
                })
            })
            .collect();

        let point_count = points.len();
        let response = self
            .request(Method::PUT, &format!("collections/{collection}/points"))
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection, points = point_count, "Points upserted");
        })
        .await?;

        Ok(point_count)
    }

    async fn similarity_candidates(
        &self,
        collection: &str,
        vector: &[f32],
        min_similarity: f32,
    ) -> Result<Vec<SimilarityResult>, StoreError> {
        let mut results = Vec::new();
        let mut offset = 0usize;
        loop {
            let points = self
                .query_page(collection, vector, min_similarity, offset)
                .await?;
            let page_len = points.len();
            for point in points {
                results.push(SimilarityResult {
                    id: parse_point_id(&point.id)?,
                    data: point.payload.unwrap_or_default(),
                    similarity: point.score,
                });
            }
            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }

        tracing::debug!(
            collection,
            candidates = results.len(),
            pages = offset / self.page_size + 1,
            "Qdrant candidates collected"
        );
        Ok(results)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn parse_point_id(id: &Value) -> Result<RecordId, StoreError> {
    match id {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| StoreError::InvalidResponse(format!("non-integer point id {id}")))
}
