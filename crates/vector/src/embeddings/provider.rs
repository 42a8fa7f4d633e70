//! Embedding provider trait and backend construction.

use crate::embeddings::config::EmbeddingBackendConfig;
use crate::embeddings::providers::{LocalBackend, RemoteBackend};
use lake_core::{AppError, AppResult, BackendKind};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "local", "remote")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// Returns one vector per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::BackendUnavailable("No embedding returned".to_string()))
    }
}

/// The closed set of embedding backends.
#[derive(Debug)]
pub enum EmbeddingBackend {
    Remote(RemoteBackend),
    Local(LocalBackend),
}

impl EmbeddingBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Remote(_) => BackendKind::Remote,
            Self::Local(_) => BackendKind::Local,
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for EmbeddingBackend {
    fn provider_name(&self) -> &str {
        match self {
            Self::Remote(backend) => backend.provider_name(),
            Self::Local(backend) => backend.provider_name(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Self::Remote(backend) => backend.model_name(),
            Self::Local(backend) => backend.model_name(),
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Self::Remote(backend) => backend.dimensions(),
            Self::Local(backend) => backend.dimensions(),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        match self {
            Self::Remote(backend) => backend.embed_batch(texts).await,
            Self::Local(backend) => backend.embed_batch(texts).await,
        }
    }
}

/// Create the embedding backend selected by configuration.
///
/// Fails with `CredentialMissing` for a remote backend without a credential,
/// before any network call.
pub fn create_backend(config: &EmbeddingBackendConfig) -> AppResult<EmbeddingBackend> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be at least 1".to_string(),
        ));
    }

    let backend = match config.kind {
        BackendKind::Local => {
            EmbeddingBackend::Local(LocalBackend::new(&config.model, config.dimensions))
        }
        BackendKind::Remote => EmbeddingBackend::Remote(RemoteBackend::new(config)?),
    };

    tracing::debug!(
        "Created embedding backend: provider={}, model={}, dimensions={}",
        backend.provider_name(),
        backend.model_name(),
        backend.dimensions()
    );

    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lake_core::{ErrorKind, Secret};

    #[test]
    fn test_create_local_backend() {
        let backend = create_backend(&EmbeddingBackendConfig::default()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Local);
        assert_eq!(backend.provider_name(), "local");
        assert_eq!(backend.model_name(), "trigram-v1");
        assert_eq!(backend.dimensions(), 384);
    }

    #[test]
    fn test_create_remote_backend_requires_credential() {
        let config = EmbeddingBackendConfig::for_kind(BackendKind::Remote);
        let err = create_backend(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialMissing);

        let config = EmbeddingBackendConfig {
            credential: Secret::new("sk-test"),
            ..EmbeddingBackendConfig::for_kind(BackendKind::Remote)
        };
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.kind(), BackendKind::Remote);
        assert_eq!(backend.dimensions(), 1536);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = EmbeddingBackendConfig {
            dimensions: 0,
            ..Default::default()
        };
        assert!(create_backend(&config).is_err());
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let backend = create_backend(&EmbeddingBackendConfig::default()).unwrap();
        let embedding = backend.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
