//! Lake vector service.
//!
//! Validates ingestion, query and delete requests, embeds text through a
//! pluggable backend and persists documents in a vector collection.
//!
//! # Example
//! ```no_run
//! use lake_core::AppConfig;
//! use lake_vector::{validate, VectorService};
//!
//! # async fn run() -> lake_core::AppResult<()> {
//! let service = VectorService::open(AppConfig::default())?;
//! let opts = service.call_options();
//!
//! let request = validate::parse_ingestion_payload(
//!     r#"{"documents": ["hello lake"], "metadatas": [{}], "ids": ["doc-1"]}"#,
//! )?;
//! service.ingest(request, &opts).await?;
//!
//! let query = validate::validate_query("hello", 5, service.max_top_k())?;
//! for hit in service.query(query, &opts).await? {
//!     println!("{} {:.3}", hit.id, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod embeddings;
pub mod service;
pub mod store;
pub mod types;
pub mod validate;


pub use embeddings::{create_backend, EmbeddingBackend, EmbeddingBackendConfig, EmbeddingProvider};
pub use service::{CallOptions, VectorService};
pub use store::{MemoryStore, SqliteStore, VectorStore};
pub use types::{
    DeleteRequest, DeletionReport, IngestionReport, IngestionRequest, Metadata, QueryHit,
    QueryRequest, QueryResult, StoreHit, StoreRecord,
};

// Re-export from core for convenience
pub use lake_core::{AppError, AppResult, ErrorKind};
