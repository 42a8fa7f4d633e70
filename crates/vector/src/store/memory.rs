//! In-process vector store with the same semantics as the SQLite store.

use crate::store::{check_batch_dimension, cosine_similarity, rank_hits, VectorStore};
use crate::types::{StoreHit, StoreRecord};
use async_trait::async_trait;
use lake_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    dimension: Option<usize>,
    records: BTreeMap<String, StoreRecord>,
}

/// Non-persistent store, mainly for tests and embedding the service.
#[derive(Debug)]
pub struct MemoryStore {
    collection: String,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            inner: RwLock::new(Inner::default()),
        }
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Store("Memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, records: Vec<StoreRecord>) -> AppResult<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        // Validate the whole batch before touching the map
        inner.dimension = check_batch_dimension(&records, inner.dimension)?;
        for record in records {
            inner.records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(&self, vector: Vec<f32>, top_k: usize) -> AppResult<Vec<StoreHit>> {
        let inner = self.inner.read().map_err(poisoned)?;

        match inner.dimension {
            None => return Ok(Vec::new()),
            Some(dim) if dim != vector.len() => {
                return Err(AppError::Store(format!(
                    "Query vector dimension mismatch: collection uses {}, got {}",
                    dim,
                    vector.len()
                )))
            }
            Some(_) => {}
        }

        let hits = inner
            .records
            .values()
            .map(|record| StoreHit {
                id: record.id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                score: cosine_similarity(&vector, &record.vector),
            })
            .collect();

        Ok(rank_hits(hits, top_k))
    }

    async fn delete(&self, ids: Vec<String>) -> AppResult<Vec<String>> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        Ok(ids
            .into_iter()
            .filter(|id| inner.records.remove(id).is_some())
            .collect())
    }

    async fn existing_ids(&self, ids: Vec<String>) -> AppResult<Vec<String>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(ids
            .into_iter()
            .filter(|id| inner.records.contains_key(id))
            .collect())
    }

    async fn count(&self) -> AppResult<usize> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.records.len())
    }
}
