//! Embedding backend configuration.

use lake_core::{AppConfig, BackendKind, Secret};
use std::time::Duration;

pub const DEFAULT_LOCAL_MODEL: &str = "trigram-v1";
pub const DEFAULT_LOCAL_DIMENSIONS: usize = 384;

pub const DEFAULT_REMOTE_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_REMOTE_DIMENSIONS: usize = 1536;
pub const DEFAULT_REMOTE_ENDPOINT: &str = "https://api.openai.com/v1";

/// Backend selection resolved once at startup. Read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingBackendConfig {
    pub kind: BackendKind,

    /// Model identifier (backend-specific)
    pub model: String,

    /// Fixed vector length of the backend instance
    pub dimensions: usize,

    /// Base URL of the remote API (ignored by the local backend)
    pub endpoint: String,

    /// HTTP timeout for the remote backend
    pub request_timeout: Duration,

    /// Provider credential; required iff `kind` is remote
    pub credential: Option<Secret>,
}

impl Default for EmbeddingBackendConfig {
    fn default() -> Self {
        Self::for_kind(BackendKind::Local)
    }
}

impl EmbeddingBackendConfig {
    /// Defaults for a backend kind.
    pub fn for_kind(kind: BackendKind) -> Self {
        let (model, dimensions) = match kind {
            BackendKind::Local => (DEFAULT_LOCAL_MODEL, DEFAULT_LOCAL_DIMENSIONS),
            BackendKind::Remote => (DEFAULT_REMOTE_MODEL, DEFAULT_REMOTE_DIMENSIONS),
        };

        Self {
            kind,
            model: model.to_string(),
            dimensions,
            endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(lake_core::config::DEFAULT_REQUEST_TIMEOUT_SECS),
            credential: None,
        }
    }

    /// Derive the backend settings from the application config snapshot.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let defaults = Self::for_kind(config.embedding_backend);

        Self {
            kind: config.embedding_backend,
            model: config.embedding_model.clone().unwrap_or(defaults.model),
            dimensions: config.embedding_dimensions.unwrap_or(defaults.dimensions),
            endpoint: config
                .embedding_endpoint
                .clone()
                .unwrap_or(defaults.endpoint),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            credential: config.api_key.clone(),
        }
    }
}
