//! Process-local vector store with exact cosine scoring.

use super::{RecordId, StoreError, StoredRecord, VectorStore, cosine_similarity};
use crate::search::SimilarityResult;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    records: BTreeMap<RecordId, StoredRecord>,
}

/// Vector store kept in memory behind a `tokio::sync::RwLock`.
///
/// Searches scan every record of the collection. Suitable for demos, tests and small datasets.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held by `collection`, if it exists.
    pub async fn len(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|entry| entry.records.len())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dimension,
                records: BTreeMap::new(),
            });
        Ok(())
    }

    async fn reset_collection(&self, collection: &str, dimension: usize) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections.insert(
            collection.to_string(),
            Collection {
                dimension,
                records: BTreeMap::new(),
            },
        );
        tracing::debug!(collection, "In-memory collection reset");
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        records: &[StoredRecord],
    ) -> Result<usize, StoreError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::MissingCollection(collection.to_string()))?;

        if let Some(record) = records
            .iter()
            .find(|record| record.embedding.len() != entry.dimension)
        {
            return Err(StoreError::DimensionMismatch {
                expected: entry.dimension,
                actual: record.embedding.len(),
            });
        }

        for record in records {
            entry.records.insert(record.id, record.clone());
        }
        Ok(records.len())
    }

    async fn similarity_candidates(
        &self,
        collection: &str,
        vector: &[f32],
        min_similarity: f32,
    ) -> Result<Vec<SimilarityResult>, StoreError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| StoreError::MissingCollection(collection.to_string()))?;

        if vector.len() != entry.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: entry.dimension,
                actual: vector.len(),
            });
        }

        Ok(entry
            .records
            .values()
            .filter_map(|record| {
                let similarity = cosine_similarity(vector, &record.embedding);
                (similarity >= min_similarity).then(|| SimilarityResult {
                    id: record.id,
                    data: record.metadata.clone(),
                    similarity,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};

    fn record(id: RecordId, embedding: Vec<f32>) -> StoredRecord {
        let mut metadata = Map::new();
        metadata.insert("Title".into(), Value::String(format!("Movie {id}")));
        StoredRecord {
            id,
            metadata,
            embedding,
        }
    }

    #[tokio::test]
    async fn upsert_requires_an_existing_collection() {
        let store = InMemoryStore::new();
        let error = store
            .upsert("missing", &[record(1, vec![1.0, 0.0])])
            .await
            .expect_err("missing collection");
        assert!(matches!(error, StoreError::MissingCollection(name) if name == "missing"));
    }

    #[tokio::test]
    async fn upsert_replaces_records_by_id() {
        let store = InMemoryStore::new();
        store.ensure_collection("plots", 2).await.expect("collection");
        store
            .upsert("plots", &[record(1, vec![1.0, 0.0]), record(2, vec![0.0, 1.0])])
            .await
            .expect("upsert");
        store
            .upsert("plots", &[record(1, vec![0.5, 0.5])])
            .await
            .expect("upsert");
        assert_eq!(store.len("plots").await, Some(2));
    }

    #[tokio::test]
    async fn candidates_carry_metadata_and_similarity() {
        let store = InMemoryStore::new();
        store.ensure_collection("plots", 2).await.expect("collection");
        store
            .upsert(
                "plots",
                &[
                    record(1, vec![1.0, 0.0]),
                    record(2, vec![0.0, 1.0]),
                    record(3, vec![-1.0, 0.0]),
                ],
            )
            .await
            .expect("upsert");

        let candidates = store
            .similarity_candidates("plots", &[1.0, 0.0], 0.0)
            .await
            .expect("candidates");

        let ids: Vec<RecordId> = candidates.iter().map(|hit| hit.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!((candidates[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(candidates[0].data["Title"], json!("Movie 1"));
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected() {
        let store = InMemoryStore::new();
        store.ensure_collection("plots", 3).await.expect("collection");
        let error = store
            .similarity_candidates("plots", &[1.0, 0.0], 0.5)
            .await
            .expect_err("dimension mismatch");
        assert!(matches!(
            error,
            StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn reset_empties_the_collection() {
        let store = InMemoryStore::new();
        store.ensure_collection("plots", 2).await.expect("collection");
        store
            .upsert("plots", &[record(1, vec![1.0, 0.0])])
            .await
            .expect("upsert");
        store.reset_collection("plots", 2).await.expect("reset");
        assert_eq!(store.len("plots").await, Some(0));
    }
}
