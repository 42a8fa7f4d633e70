//! The vector service: validated requests in, embeddings and store calls out.
//!
//! A [`VectorService`] is built once from the configuration snapshot and then
//! shared. It holds no mutable state of its own; all shared mutable state
//! lives behind the store.

pub mod call;
mod delete;
mod ingest;
mod query;

pub use call::CallOptions;

use crate::embeddings::{create_backend, EmbeddingBackendConfig, EmbeddingProvider};
use crate::store::{SqliteStore, VectorStore};
use lake_core::{AppConfig, AppResult, IngestMode};
use std::sync::Arc;
use std::time::Duration;

/// Service context: configuration snapshot, embedding backend and store.
#[derive(Debug, Clone)]
pub struct VectorService {
    config: Arc<AppConfig>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl VectorService {
    /// Build the service from configuration: validates it, constructs the
    /// selected embedding backend and opens the SQLite collection.
    pub fn open(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let backend = create_backend(&EmbeddingBackendConfig::from_app_config(&config))?;

        config.ensure_persist_dir()?;
        let store = SqliteStore::open(&config.store_path(), &config.collection_name)?;

        tracing::info!(
            "Opened collection '{}' at {:?} (backend: {}, model: {})",
            config.collection_name,
            store.path(),
            backend.provider_name(),
            backend.model_name()
        );

        Ok(Self::new(config, Arc::new(backend), Arc::new(store)))
    }

    /// Assemble a service from explicit parts.
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            embedder,
            store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn collection(&self) -> &str {
        self.store.collection()
    }

    pub fn ingest_mode(&self) -> IngestMode {
        self.config.ingest_mode
    }

    pub fn max_top_k(&self) -> usize {
        self.config.max_top_k
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Call options carrying the configured per-call deadline.
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            timeout: self.config.timeout_secs.map(Duration::from_secs),
            ..CallOptions::default()
        }
    }
}
