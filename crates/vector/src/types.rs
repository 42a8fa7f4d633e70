//! Request, record and report types for the vector service.
//!
//! Request types can only be built by the validators in [`crate::validate`],
//! so holding one means its invariants already hold.

use serde::{Deserialize, Serialize};

/// Flat metadata mapping: string keys to JSON scalars.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A validated batch of documents to ingest.
///
/// `documents`, `metadatas` and `ids` have equal length, align positionally,
/// ids are unique and non-empty, texts are non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionRequest {
    documents: Vec<String>,
    metadatas: Vec<Metadata>,
    ids: Vec<String>,
}

impl IngestionRequest {
    pub(crate) fn new_unchecked(
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
        ids: Vec<String>,
    ) -> Self {
        Self {
            documents,
            metadatas,
            ids,
        }
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadatas(&self) -> &[Metadata] {
        &self.metadatas
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Pair every document with its vector, consuming the request.
    pub(crate) fn into_records(self, vectors: Vec<Vec<f32>>) -> Vec<StoreRecord> {
        self.ids
            .into_iter()
            .zip(self.documents)
            .zip(self.metadatas)
            .zip(vectors)
            .map(|(((id, text), metadata), vector)| StoreRecord {
                id,
                text,
                metadata,
                vector,
            })
            .collect()
    }
}

/// A validated similarity query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    text: String,
    top_k: usize,
}

impl QueryRequest {
    pub(crate) fn new_unchecked(text: String, top_k: usize) -> Self {
        Self { text, top_k }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// A validated, non-empty set of ids to delete (request order kept).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    ids: Vec<String>,
}

impl DeleteRequest {
    pub(crate) fn new_unchecked(ids: Vec<String>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// A document with its vector, as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

/// A raw store match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

/// One ranked query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

impl From<StoreHit> for QueryHit {
    fn from(hit: StoreHit) -> Self {
        Self {
            id: hit.id,
            text: hit.text,
            metadata: hit.metadata,
            score: hit.score,
        }
    }
}

/// Ranked results, descending relevance, at most `top_k` long.
pub type QueryResult = Vec<QueryHit>;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub count: usize,
    /// Ingested ids in request order
    pub ids: Vec<String>,
    pub collection: String,
}

/// Outcome of a deletion; both lists keep request order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub deleted_ids: Vec<String>,
    pub missing_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_records_keeps_alignment() {
        let mut meta = Metadata::new();
        meta.insert("lang".to_string(), serde_json::json!("en"));

        let request = IngestionRequest::new_unchecked(
            vec!["first".to_string(), "second".to_string()],
            vec![Metadata::new(), meta.clone()],
            vec!["a".to_string(), "b".to_string()],
        );

        let records = request.into_records(vec![vec![1.0], vec![2.0]]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "b");
        assert_eq!(records[1].text, "second");
        assert_eq!(records[1].metadata, meta);
        assert_eq!(records[1].vector, vec![2.0]);
    }

    #[test]
    fn test_deletion_report_json_shape() {
        let report = DeletionReport {
            deleted_ids: vec!["a".to_string()],
            missing_ids: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["deletedIds"][0], "a");
        assert!(json["missingIds"].as_array().unwrap().is_empty());
    }
}
