//! Vector store abstraction.
//!
//! A store is a persistent, id-addressed collection of documents and their
//! vectors. Each call is atomic on its own; nothing spans calls.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::{StoreHit, StoreRecord};
use async_trait::async_trait;
use lake_core::{AppError, AppResult};
use std::cmp::Ordering;

/// Trait for vector store backends.
#[async_trait]
pub trait VectorStore: Send + Sync + std::fmt::Debug {
    /// Collection this store addresses.
    fn collection(&self) -> &str;

    /// Insert or overwrite every record by id. All or nothing.
    async fn upsert(&self, records: Vec<StoreRecord>) -> AppResult<()>;

    /// Top-k most similar records, descending score, ties by id ascending.
    async fn query(&self, vector: Vec<f32>, top_k: usize) -> AppResult<Vec<StoreHit>>;

    /// Remove the given ids. Returns the ids that were actually present.
    async fn delete(&self, ids: Vec<String>) -> AppResult<Vec<String>>;

    /// Subset of `ids` already stored, in the given order.
    async fn existing_ids(&self, ids: Vec<String>) -> AppResult<Vec<String>>;

    /// Number of stored records.
    async fn count(&self) -> AppResult<usize>;
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
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

/// Sort by descending score, ties by id ascending, and keep `top_k`.
pub(crate) fn rank_hits(mut hits: Vec<StoreHit>, top_k: usize) -> Vec<StoreHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(top_k);
    hits
}

/// Every record in a batch must share one dimension, matching the pinned one if any.
pub(crate) fn check_batch_dimension(
    records: &[StoreRecord],
    pinned: Option<usize>,
) -> AppResult<Option<usize>> {
    let Some(first) = records.first() else {
        return Ok(pinned);
    };
    let expected = pinned.unwrap_or(first.vector.len());

    if expected == 0 {
        return Err(AppError::Store("Cannot store empty vectors".to_string()));
    }

    if let Some(record) = records.iter().find(|r| r.vector.len() != expected) {
        return Err(AppError::Store(format!(
            "Vector dimension mismatch for '{}': collection uses {}, got {}",
            record.id,
            expected,
            record.vector.len()
        )));
    }

    Ok(Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn hit(id: &str, score: f32) -> StoreHit {
        StoreHit {
            id: id.to_string(),
            text: String::new(),
            metadata: Metadata::new(),
            score,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![1.0, 0.0, 0.0];
        let d = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&c, &d) - 0.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_hits_breaks_ties_by_id() {
        let ranked = rank_hits(
            vec![hit("c", 0.5), hit("a", 0.9), hit("b", 0.5), hit("d", 0.1)],
            3,
        );
        let ids: Vec<&str> = ranked.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
