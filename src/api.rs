//! HTTP surface for plotsearch.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents` – Summarize, embed, and store a batch of documents. Returns the ingest
//!   counters (`documents`, `indexed`, `empty_summaries`).
//! - `POST /search` – Embed a query and return stored records whose similarity exceeds 0.5,
//!   most similar first.
//! - `GET /metrics` – Observe ingestion and search counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the pipeline with the CLI, so behavior is identical across interfaces.

use crate::embedding::EmbeddingClientError;
use crate::metrics::MetricsSnapshot;
use crate::processing::{Document, IngestOutcome, PipelineApi, ProcessingError};
use crate::search::{SearchError, SimilarityResult};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the pipeline.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/documents", post(ingest_documents::<S>))
        .route("/search", post(search::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /documents` endpoint.
#[derive(Deserialize)]
struct IngestRequest {
    documents: Vec<Document>,
}

/// Ingest a batch of documents into the configured collection.
async fn ingest_documents<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestOutcome>, AppError>
where
    S: PipelineApi,
{
    let outcome = service.ingest(request.documents).await?;
    tracing::info!(
        documents = outcome.documents,
        indexed = outcome.indexed,
        empty_summaries = outcome.empty_summaries,
        "Ingest request completed"
    );
    Ok(Json(outcome))
}

/// Request body for the `POST /search` endpoint.
#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

/// Response body for the `POST /search` endpoint.
#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SimilarityResult>,
}

async fn search<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: PipelineApi,
{
    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".into()));
    }
    let results = service.search(query).await?;
    Ok(Json(SearchResponse { results }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/documents",
                description: "Summarize, embed, and store documents. Response returns { \"documents\": number, \"indexed\": number, \"empty_summaries\": number }.",
                request_example: Some(json!({
                    "documents": [{
                        "id": 1,
                        "raw_text": "A crew plans one last heist.",
                        "metadata": { "Title": "Heat", "Release Year": 2001 }
                    }]
                })),
            },
            CommandDescriptor {
                name: "search",
                method: "POST",
                path: "/search",
                description: "Return stored records whose cosine similarity to the query exceeds 0.5, most similar first.",
                request_example: Some(json!({ "query": "bank robbery gone wrong" })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion and search counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Processing(ProcessingError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Processing(
                ProcessingError::Embedding(EmbeddingClientError::RateLimited(_))
                | ProcessingError::Search(SearchError::Embedding(
                    EmbeddingClientError::RateLimited(_),
                )),
            ) => StatusCode::TOO_MANY_REQUESTS,
            Self::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(message) => message,
            Self::Processing(error) => {
                tracing::error!(error = %error, "Request failed");
                error.to_string()
            }
        };
        (status, message).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::embedding::EmbeddingClientError;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{Document, IngestOutcome, PipelineApi, ProcessingError};
    use crate::search::{SearchError, SimilarityResult};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{Map, Value, json};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubPipeline {
        ingested: Mutex<Vec<Document>>,
        queries: Mutex<Vec<String>>,
        rate_limited: bool,
    }

    #[async_trait]
    impl PipelineApi for StubPipeline {
        async fn ingest(&self, documents: Vec<Document>) -> Result<IngestOutcome, ProcessingError> {
            let count = documents.len();
            self.ingested.lock().await.extend(documents);
            Ok(IngestOutcome {
                documents: count,
                indexed: count,
                empty_summaries: 0,
            })
        }

        async fn search(&self, query: &str) -> Result<Vec<SimilarityResult>, ProcessingError> {
            if self.rate_limited {
                return Err(ProcessingError::Search(SearchError::Embedding(
                    EmbeddingClientError::RateLimited("slow down".into()),
                )));
            }
            self.queries.lock().await.push(query.to_string());
            let mut data = Map::new();
            data.insert("Title".into(), json!("Heat"));
            Ok(vec![SimilarityResult {
                id: 7,
                data,
                similarity: 0.75,
            }])
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_indexed: 3,
                empty_summaries: 1,
                searches_served: 2,
            }
        }
    }

    async fn send(
        service: Arc<StubPipeline>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(payload) => {
                builder = builder.header("content-type", "application/json");
                Body::from(payload.to_string())
            }
            None => Body::empty(),
        };
        create_router(service)
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response")
    }

    async fn json_body(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_search_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let search = commands
            .iter()
            .find(|cmd| cmd.name == "search")
            .expect("search command present");

        assert_eq!(search.method, "POST");
        assert_eq!(search.path, "/search");
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn documents_route_forwards_batch() {
        let service = Arc::new(StubPipeline::default());
        let payload = json!({
            "documents": [
                { "id": 1, "raw_text": "First plot.", "metadata": { "Title": "One" } },
                { "id": 2, "raw_text": "Second plot." }
            ]
        });

        let response = send(service.clone(), Method::POST, "/documents", Some(payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["documents"], 2);
        assert_eq!(json["indexed"], 2);

        let ingested = service.ingested.lock().await;
        assert_eq!(ingested.len(), 2);
        assert_eq!(ingested[0].metadata["Title"], json!("One"));
        assert_eq!(ingested[1].raw_text, "Second plot.");
    }

    #[tokio::test]
    async fn search_route_returns_ranked_results() {
        let service = Arc::new(StubPipeline::default());

        let response = send(
            service.clone(),
            Method::POST,
            "/search",
            Some(json!({ "query": "  heist  " })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["results"][0]["id"], 7);
        assert_eq!(json["results"][0]["data"]["Title"], "Heat");
        assert_eq!(json["results"][0]["similarity"], 0.75);
        assert_eq!(*service.queries.lock().await, vec!["heist".to_string()]);
    }

    #[tokio::test]
    async fn blank_queries_are_rejected() {
        let service = Arc::new(StubPipeline::default());

        let response = send(
            service.clone(),
            Method::POST,
            "/search",
            Some(json!({ "query": "   " })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.queries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn rate_limits_map_to_429() {
        let service = Arc::new(StubPipeline {
            rate_limited: true,
            ..StubPipeline::default()
        });

        let response = send(
            service,
            Method::POST,
            "/search",
            Some(json!({ "query": "heist" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn metrics_route_reports_snapshot() {
        let response = send(Arc::new(StubPipeline::default()), Method::GET, "/metrics", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["documents_indexed"], 3);
        assert_eq!(json["empty_summaries"], 1);
        assert_eq!(json["searches_served"], 2);
    }
}
