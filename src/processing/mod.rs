//! Ingestion pipeline: dataset loading, summarization, embedding, and storage orchestration.

pub mod dataset;
mod service;
pub mod types;

pub use dataset::{DatasetError, load_documents};
pub use service::{PipelineApi, PipelineService, PipelineSettings};
pub use types::{Document, IngestOutcome, ProcessingError, TEXT_FIELD};
