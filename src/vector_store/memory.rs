//! In-memory vector store implementation.
//!
//! Useful for testing and throwaway sessions.

use super::{check_dimensions, rank, Record, ScoredText, VectorStore};
use crate::error::{KimiError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct MemoryCollection {
    dimension: usize,
    records: Vec<Record>,
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    collections: RwLock<BTreeMap<String, MemoryCollection>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, MemoryCollection>>> {
        self.collections
            .read()
            .map_err(|e| KimiError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, MemoryCollection>>> {
        self.collections
            .write()
            .map_err(|e| KimiError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        _description: &str,
        dimension: usize,
    ) -> Result<bool> {
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            return Ok(false);
        }
        collections.insert(
            name.to_string(),
            MemoryCollection {
                dimension,
                records: Vec::new(),
            },
        );
        Ok(true)
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn insert(&self, collection: &str, records: &[Record]) -> Result<usize> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| KimiError::CollectionNotFound(collection.to_string()))?;

        check_dimensions(collection, target.dimension, records)?;
        target.records.extend_from_slice(records);
        Ok(records.len())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredText>> {
        let collections = self.read()?;
        let target = collections
            .get(collection)
            .ok_or_else(|| KimiError::CollectionNotFound(collection.to_string()))?;

        Ok(rank(
            target
                .records
                .iter()
                .map(|r| (r.text.as_str(), r.embedding.as_slice())),
            query_embedding,
            limit,
        ))
    }

    async fn fetch_texts(&self, collection: &str, limit: usize) -> Result<Vec<String>> {
        let collections = self.read()?;
        let target = collections
            .get(collection)
            .ok_or_else(|| KimiError::CollectionNotFound(collection.to_string()))?;

        Ok(target
            .records
            .iter()
            .take(limit)
            .map(|r| r.text.clone())
            .collect())
    }

    async fn row_count(&self, collection: &str) -> Result<usize> {
        let collections = self.read()?;
        collections
            .get(collection)
            .map(|c| c.records.len())
            .ok_or_else(|| KimiError::CollectionNotFound(collection.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        assert!(store.create_collection("kimi_agent_notes", "", 3).await.unwrap());
        assert!(!store.create_collection("kimi_agent_notes", "", 3).await.unwrap());

        let records = vec![
            Record::new("Hello world".to_string(), vec![1.0, 0.0, 0.0]),
            Record::new("Goodbye world".to_string(), vec![0.0, 1.0, 0.0]),
        ];
        assert_eq!(store.insert("kimi_agent_notes", &records).await.unwrap(), 2);
        assert_eq!(store.row_count("kimi_agent_notes").await.unwrap(), 2);

        let results = store
            .search("kimi_agent_notes", &[1.0, 0.0, 0.0], 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].text, "Hello world");

        let texts = store.fetch_texts("kimi_agent_notes", 1).await.unwrap();
        assert_eq!(texts, vec!["Hello world".to_string()]);

        assert_eq!(
            store.list_collections().await.unwrap(),
            vec!["kimi_agent_notes".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_found() {
        let store = MemoryVectorStore::new();
        let err = store.search("nope", &[1.0], 5).await.unwrap_err();
        assert!(matches!(err, KimiError::CollectionNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = MemoryVectorStore::new();
        store.create_collection("c", "", 2).await.unwrap();
        let err = store
            .insert("c", &[Record::new("x".into(), vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, KimiError::VectorStore(_)));
        assert_eq!(store.row_count("c").await.unwrap(), 0);
    }
}
