//! Vector store abstraction for kimi-agent.
//!
//! Provides a collection-oriented, trait-based interface over the storage
//! backend. Similarity is cosine; higher scores are better.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A piece of text stored with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique record ID.
    pub id: Uuid,
    /// Stored text.
    pub text: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl Record {
    /// Create a new record with a fresh ID.
    pub fn new(text: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            embedding,
        }
    }
}

/// A search hit: stored text and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredText {
    pub text: String,
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection. Returns `false` if it already existed.
    async fn create_collection(&self, name: &str, description: &str, dimension: usize)
        -> Result<bool>;

    /// Check whether a collection exists.
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Names of all collections, sorted.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Insert records into a collection. Returns the number inserted.
    async fn insert(&self, collection: &str, records: &[Record]) -> Result<usize>;

    /// Search a collection for the texts most similar to `query_embedding`.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredText>>;

    /// Stored texts of a collection in insertion order, at most `limit`.
    async fn fetch_texts(&self, collection: &str, limit: usize) -> Result<Vec<String>>;

    /// Number of records in a collection.
    async fn row_count(&self, collection: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score every record against the query and keep the best `limit`.
fn rank<'a>(
    records: impl Iterator<Item = (&'a str, &'a [f32])>,
    query_embedding: &[f32],
    limit: usize,
) -> Vec<ScoredText> {
    let mut results: Vec<ScoredText> = records
        .map(|(text, embedding)| ScoredText {
            text: text.to_string(),
            score: cosine_similarity(query_embedding, embedding),
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

/// Reject embeddings whose length does not match the collection.
fn check_dimensions(collection: &str, dimension: usize, records: &[Record]) -> Result<()> {
    if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimension) {
        return Err(crate::error::KimiError::VectorStore(format!(
            "Embedding has {} dimensions, collection '{}' expects {}",
            bad.embedding.len(),
            collection,
            dimension
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let records = vec![
            Record::new("far".into(), vec![0.0, 1.0]),
            Record::new("near".into(), vec![1.0, 0.1]),
            Record::new("exact".into(), vec![1.0, 0.0]),
        ];
        let ranked = rank(
            records.iter().map(|r| (r.text.as_str(), r.embedding.as_slice())),
            &[1.0, 0.0],
            2,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].text, "exact");
        assert_eq!(ranked[1].text, "near");
    }
}
