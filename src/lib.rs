#![deny(missing_docs)]

//! Core library for plotsearch: extractive summarization, batched embedding, and cosine
//! similarity search over movie plot descriptions.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Ingestion pipeline orchestration and dataset loading.
pub mod processing;
/// Similarity search over stored embeddings.
pub mod search;
/// Vector store abstraction and backends.
pub mod store;
/// Extractive text summarization.
pub mod summarization;
