//! SQLite-backed vector store.
//!
//! One database file per collection. Vectors are stored as little-endian
//! `f32` blobs and searched with a full cosine scan. The first write pins the
//! collection's vector dimension in `collection_meta`.

use crate::store::{check_batch_dimension, cosine_similarity, rank_hits, VectorStore};
use crate::types::{Metadata, StoreHit, StoreRecord};
use async_trait::async_trait;
use lake_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Persistent store for one collection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    collection: String,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the collection database at `db_path`.
    pub fn open(db_path: &Path, collection: &str) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collection_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        conn.execute(
            "INSERT OR IGNORE INTO collection_meta (key, value) VALUES ('collection', ?1)",
            params![collection],
        )
        .map_err(|e| AppError::Store(format!("Failed to record collection name: {}", e)))?;

        tracing::debug!("Opened SQLite store for '{}' at {:?}", collection, db_path);

        Ok(Self {
            path: db_path.to_path_buf(),
            collection: collection.to_string(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run blocking SQLite work off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::Store("SQLite connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::Store(format!("Store task failed: {}", e)))?
    }
}

fn pinned_dimension(conn: &Connection) -> AppResult<Option<usize>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM collection_meta WHERE key = 'dimension'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| AppError::Store(format!("Failed to read collection metadata: {}", e)))?;

    value
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::Store(format!("Invalid pinned dimension '{}'", v)))
        })
        .transpose()
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, records: Vec<StoreRecord>) -> AppResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

            let pinned = pinned_dimension(&tx)?;
            let dimension = check_batch_dimension(&records, pinned)?;
            if let (None, Some(dim)) = (pinned, dimension) {
                tx.execute(
                    "INSERT INTO collection_meta (key, value) VALUES ('dimension', ?1)",
                    params![dim.to_string()],
                )
                .map_err(|e| AppError::Store(format!("Failed to pin dimension: {}", e)))?;
            }

            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO documents (id, text, metadata, embedding)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(id) DO UPDATE SET
                             text = excluded.text,
                             metadata = excluded.metadata,
                             embedding = excluded.embedding",
                    )
                    .map_err(|e| AppError::Store(format!("Failed to prepare upsert: {}", e)))?;

                for record in &records {
                    let metadata_json = serde_json::to_string(&record.metadata).map_err(|e| {
                        AppError::Store(format!("Failed to serialize metadata: {}", e))
                    })?;

                    stmt.execute(params![
                        record.id,
                        record.text,
                        metadata_json,
                        embedding_to_bytes(&record.vector),
                    ])
                    .map_err(|e| {
                        AppError::Store(format!("Failed to upsert '{}': {}", record.id, e))
                    })?;
                }
            }

            tx.commit()
                .map_err(|e| AppError::Store(format!("Failed to commit upsert: {}", e)))?;

            tracing::debug!("Upserted {} records", records.len());
            Ok(())
        })
        .await
    }

    async fn query(&self, vector: Vec<f32>, top_k: usize) -> AppResult<Vec<StoreHit>> {
        self.with_conn(move |conn| {
            let Some(dimension) = pinned_dimension(conn)? else {
                return Ok(Vec::new());
            };
            if vector.len() != dimension {
                return Err(AppError::Store(format!(
                    "Query vector dimension mismatch: collection uses {}, got {}",
                    dimension,
                    vector.len()
                )));
            }

            let mut stmt = conn
                .prepare("SELECT id, text, metadata, embedding FROM documents")
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                })
                .map_err(|e| AppError::Store(format!("Failed to query documents: {}", e)))?;

            let mut hits = Vec::new();
            for row in rows {
                let (id, text, metadata_json, embedding_bytes) =
                    row.map_err(|e| AppError::Store(format!("Failed to read document: {}", e)))?;

                let embedding = bytes_to_embedding(&embedding_bytes)?;
                let metadata: Metadata = serde_json::from_str(&metadata_json).map_err(|e| {
                    AppError::Store(format!("Corrupt metadata for '{}': {}", id, e))
                })?;

                hits.push(StoreHit {
                    score: cosine_similarity(&vector, &embedding),
                    id,
                    text,
                    metadata,
                });
            }

            let ranked = rank_hits(hits, top_k);
            tracing::debug!(
                "Retrieved {} documents (requested top-{})",
                ranked.len(),
                top_k
            );
            Ok(ranked)
        })
        .await
    }

    async fn delete(&self, ids: Vec<String>) -> AppResult<Vec<String>> {
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

            let mut removed = Vec::new();
            {
                let mut stmt = tx
                    .prepare("DELETE FROM documents WHERE id = ?1")
                    .map_err(|e| AppError::Store(format!("Failed to prepare delete: {}", e)))?;

                for id in ids {
                    let affected = stmt.execute(params![id]).map_err(|e| {
                        AppError::Store(format!("Failed to delete '{}': {}", id, e))
                    })?;
                    if affected > 0 {
                        removed.push(id);
                    }
                }
            }

            tx.commit()
                .map_err(|e| AppError::Store(format!("Failed to commit delete: {}", e)))?;

            Ok(removed)
        })
        .await
    }

    async fn existing_ids(&self, ids: Vec<String>) -> AppResult<Vec<String>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT 1 FROM documents WHERE id = ?1")
                .map_err(|e| AppError::Store(format!("Failed to prepare lookup: {}", e)))?;

            let mut existing = Vec::new();
            for id in ids {
                let found = stmt
                    .exists(params![id])
                    .map_err(|e| AppError::Store(format!("Failed to look up '{}': {}", id, e)))?;
                if found {
                    existing.push(id);
                }
            }
            Ok(existing)
        })
        .await
    }

    async fn count(&self) -> AppResult<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .map_err(|e| AppError::Store(format!("Failed to count documents: {}", e)))
        })
        .await
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lake_core::ErrorKind;
    use tempfile::TempDir;

    fn record(id: &str, text: &str, vector: Vec<f32>) -> StoreRecord {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), serde_json::json!(id));
        StoreRecord {
            id: id.to_string(),
            text: text.to_string(),
            metadata,
            vector,
        }
    }

    fn open(temp: &TempDir) -> SqliteStore {
        SqliteStore::open(&temp.path().join("db").join("lake.sqlite"), "lake").unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        assert!(store.path().exists());
        assert_eq!(store.collection(), "lake");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_and_query() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        store
            .upsert(vec![
                record("a", "first", vec![1.0, 0.0, 0.0]),
                record("b", "second", vec![0.0, 1.0, 0.0]),
                record("c", "third", vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(vec![1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].metadata["source"], serde_json::json!("a"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        store
            .upsert(vec![record("a", "old", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(vec![record("a", "new", vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.query(vec![0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].text, "new");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = open(&temp);
            store
                .upsert(vec![record("kept", "persisted text", vec![0.5, 0.5])])
                .await
                .unwrap();
        }

        let reopened = open(&temp);
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(
            reopened.existing_ids(vec!["kept".to_string(), "gone".to_string()]).await.unwrap(),
            vec!["kept".to_string()]
        );
    }

    #[tokio::test]
    async fn test_dimension_change_rejected() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        store
            .upsert(vec![record("a", "first", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let err = store
            .upsert(vec![
                record("b", "ok", vec![0.0, 1.0, 0.0]),
                record("c", "wrong", vec![1.0, 0.0]),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreError);

        // Whole batch rejected
        assert_eq!(store.count().await.unwrap(), 1);

        let err = store.query(vec![1.0, 0.0], 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreError);
    }

    #[tokio::test]
    async fn test_delete_reports_removed_only() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        store
            .upsert(vec![
                record("a", "first", vec![1.0, 0.0]),
                record("b", "second", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let removed = store
            .delete(vec!["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, vec!["a".to_string()]);
        assert_eq!(store.count().await.unwrap(), 1);

        let removed = store.delete(vec!["a".to_string()]).await.unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn test_query_empty_collection() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        let hits = store.query(vec![1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_embedding_bytes_reject_truncated_blob() {
        assert!(bytes_to_embedding(&[0, 0, 128]).is_err());
        let bytes = embedding_to_bytes(&[1.5, -2.0]);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![1.5, -2.0]);
    }
}
