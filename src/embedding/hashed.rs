//! Deterministic offline embedding client.

use super::{Embedding, EmbeddingClient, EmbeddingClientError, ModelHandle, TaskMode};
use async_trait::async_trait;

/// Folds the lowercased words of a text into a fixed number of slots and L2-normalises the
/// result. Texts sharing vocabulary land close together, which is enough for demos and tests
/// without network access. The task mode does not change the encoding.
#[derive(Debug, Clone, Copy)]
pub struct HashedEmbeddingClient {
    dimension: usize,
}

impl HashedEmbeddingClient {
    /// Construct a client producing vectors of `dimension` values.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Encode `text` into a unit vector (all zeros for text without words).
    pub fn encode(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0_f32; self.dimension];
        if self.dimension == 0 {
            return embedding;
        }

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let slot = fnv1a(&word.to_lowercase()) as usize % self.dimension;
            embedding[slot] += 1.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingClient for HashedEmbeddingClient {
    async fn generate_embeddings(
        &self,
        model: &ModelHandle,
        texts: &[String],
        task: TaskMode,
    ) -> Result<Vec<Embedding>, EmbeddingClientError> {
        tracing::debug!(
            model = model.name(),
            %task,
            dimension = self.dimension,
            texts = texts.len(),
            "Generating hashed embeddings"
        );

        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}
