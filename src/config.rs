use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_BATCH_SIZE: usize = 45;
const DEFAULT_BATCH_PAUSE_SECS: u64 = 5;
const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6333";
const DEFAULT_COLLECTION: &str = "embedded_data";
const DEFAULT_CANDIDATE_LIMIT: usize = 1000;
const DEFAULT_SUMMARY_MAX_WORDS: usize = 300;
const DEFAULT_DATASET_PATH: &str = "data/wiki_movie_plots_deduped.csv";
const DEFAULT_DATASET_ROWS: usize = 100;
const DEFAULT_TEXT_COLUMN: &str = "Plot";
const DEFAULT_MIN_RELEASE_YEAR: i64 = 2000;
const DEFAULT_DATASET_SEED: u64 = 42;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration, built once at process start and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Embedding backend used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// API key for the Gemini embedding endpoint.
    pub gemini_api_key: Option<String>,
    /// Optional override for the Gemini API base URL.
    pub gemini_base_url: Option<String>,
    /// Maximum number of texts per embedding request.
    pub embedding_batch_size: usize,
    /// Pause inserted between consecutive embedding requests.
    pub embedding_batch_pause: Duration,
    /// Vector store backend holding the embedded records.
    pub vector_store: VectorStoreKind,
    /// Base URL of the Qdrant instance.
    pub qdrant_url: String,
    /// Name of the collection storing embedded records.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Page size used when collecting similarity candidates from the store.
    pub search_candidate_limit: usize,
    /// Word budget applied to every summary produced during ingestion.
    pub summary_max_words: usize,
    /// Dataset loading parameters for the `ingest` command.
    pub dataset: DatasetConfig,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Location and sampling parameters for the movie plot dataset.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Path to the CSV export.
    pub path: PathBuf,
    /// Number of rows sampled for ingestion.
    pub rows: usize,
    /// Column holding the text that is summarized and embedded.
    pub text_column: String,
    /// Rows released before this year are dropped.
    pub min_release_year: i64,
    /// Seed for the deterministic row sample.
    pub seed: u64,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted Gemini embeddings API.
    Gemini,
    /// Deterministic offline encoder.
    Hashed,
}

/// Supported vector store backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorStoreKind {
    /// Qdrant over HTTP.
    Qdrant,
    /// Process-local store, lost on exit.
    Memory,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider = match load_env_optional("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))?,
            None => EmbeddingProvider::Gemini,
        };
        let gemini_api_key = load_env_optional("GEMINI_API_KEY");
        if embedding_provider == EmbeddingProvider::Gemini && gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".into()));
        }

        let embedding_batch_size = parse_or("EMBEDDING_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if embedding_batch_size == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_BATCH_SIZE".into()));
        }

        Ok(Self {
            embedding_provider,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            gemini_api_key,
            gemini_base_url: load_env_optional("GEMINI_BASE_URL"),
            embedding_batch_size,
            embedding_batch_pause: Duration::from_secs(parse_or(
                "EMBEDDING_BATCH_PAUSE_SECS",
                DEFAULT_BATCH_PAUSE_SECS,
            )?),
            vector_store: match load_env_optional("VECTOR_STORE") {
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("VECTOR_STORE".into()))?,
                None => VectorStoreKind::Qdrant,
            },
            qdrant_url: load_env_optional("QDRANT_URL")
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            search_candidate_limit: parse_or("SEARCH_CANDIDATE_LIMIT", DEFAULT_CANDIDATE_LIMIT)?,
            summary_max_words: parse_or("SUMMARY_MAX_WORDS", DEFAULT_SUMMARY_MAX_WORDS)?,
            dataset: DatasetConfig {
                path: load_env_optional("DATASET_PATH")
                    .unwrap_or_else(|| DEFAULT_DATASET_PATH.to_string())
                    .into(),
                rows: parse_or("DATASET_ROWS", DEFAULT_DATASET_ROWS)?,
                text_column: load_env_optional("DATASET_TEXT_COLUMN")
                    .unwrap_or_else(|| DEFAULT_TEXT_COLUMN.to_string()),
                min_release_year: parse_or("DATASET_MIN_RELEASE_YEAR", DEFAULT_MIN_RELEASE_YEAR)?,
                seed: parse_or("DATASET_SEED", DEFAULT_DATASET_SEED)?,
            },
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Load and log the configuration. Callers read `.env` beforehand.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_env()?;
        tracing::debug!(
            provider = ?config.embedding_provider,
            model = %config.embedding_model,
            store = ?config.vector_store,
            collection = %config.qdrant_collection_name,
            batch_size = config.embedding_batch_size,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        Ok(config)
    }
}

impl Default for Config {
    /// Offline defaults: hashed embeddings and the in-memory store.
    fn default() -> Self {
        Self {
            embedding_provider: EmbeddingProvider::Hashed,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            gemini_api_key: None,
            gemini_base_url: None,
            embedding_batch_size: DEFAULT_BATCH_SIZE,
            embedding_batch_pause: Duration::from_secs(DEFAULT_BATCH_PAUSE_SECS),
            vector_store: VectorStoreKind::Memory,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            qdrant_collection_name: DEFAULT_COLLECTION.to_string(),
            qdrant_api_key: None,
            search_candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            summary_max_words: DEFAULT_SUMMARY_MAX_WORDS,
            dataset: DatasetConfig {
                path: DEFAULT_DATASET_PATH.into(),
                rows: DEFAULT_DATASET_ROWS,
                text_column: DEFAULT_TEXT_COLUMN.to_string(),
                min_release_year: DEFAULT_MIN_RELEASE_YEAR,
                seed: DEFAULT_DATASET_SEED,
            },
            server_port: None,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "hashed" => Ok(Self::Hashed),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for VectorStoreKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_parse_case_insensitively() {
        assert_eq!("Gemini".parse(), Ok(EmbeddingProvider::Gemini));
        assert_eq!(" hashed ".parse(), Ok(EmbeddingProvider::Hashed));
        assert!("openai".parse::<EmbeddingProvider>().is_err());
        assert_eq!("MEMORY".parse(), Ok(VectorStoreKind::Memory));
    }

    #[test]
    fn defaults_match_reference_configuration() {
        let config = Config::default();
        assert_eq!(config.embedding_batch_size, 45);
        assert_eq!(config.embedding_batch_pause, Duration::from_secs(5));
        assert_eq!(config.embedding_dimension, 768);
        assert_eq!(config.summary_max_words, 300);
        assert_eq!(config.dataset.rows, 100);
        assert_eq!(config.dataset.text_column, "Plot");
    }
}
