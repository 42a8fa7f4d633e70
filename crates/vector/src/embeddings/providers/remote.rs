//! Remote embedding backend.
//!
//! Talks to any OpenAI-compatible `POST {endpoint}/embeddings` API with a
//! bearer credential. One request per batch; failures are reported as
//! `BackendUnavailable` and never retried here.

use crate::embeddings::config::EmbeddingBackendConfig;
use crate::embeddings::provider::EmbeddingProvider;
use async_trait::async_trait;
use lake_core::{AppError, AppResult, Secret};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedding backend backed by an external provider.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    url: String,
    model: String,
    credential: Secret,
    dimensions: usize,
    request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl RemoteBackend {
    /// Build the backend. Fails fast without a credential.
    pub fn new(config: &EmbeddingBackendConfig) -> AppResult<Self> {
        let credential = config.credential.clone().ok_or_else(|| {
            AppError::CredentialMissing(
                "the remote embedding backend requires a provider credential".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::BackendUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            credential,
            dimensions: config.dimensions,
            request_timeout: config.request_timeout,
        })
    }

    /// Client deadline expiry is a timeout; any other transport failure
    /// means the backend is unavailable.
    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(format!(
                "embedding API at {} did not respond within {:?}",
                self.url, self.request_timeout
            ))
        } else {
            AppError::BackendUnavailable(format!(
                "Failed to reach embedding API at {}: {}",
                self.url, e
            ))
        }
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn request_embeddings(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .map(|d| d.message)
                .unwrap_or(body);
            return Err(AppError::BackendUnavailable(format!(
                "Embedding API error ({}): {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                return self.transport_error(e);
            }
            AppError::BackendUnavailable(format!("Failed to parse embedding API response: {}", e))
        })?;

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);

        if data.len() != texts.len() {
            return Err(AppError::BackendUnavailable(format!(
                "Embedding API returned {} vectors for {} texts",
                data.len(),
                texts.len()
            )));
        }

        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();

        if let Some((i, emb)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, emb)| emb.len() != self.dimensions)
        {
            return Err(AppError::BackendUnavailable(format!(
                "Embedding dimension mismatch at index {}: expected {}, got {} (model: {})",
                i,
                self.dimensions,
                emb.len(),
                self.model
            )));
        }

        debug!("Received {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteBackend {
    fn provider_name(&self) -> &str {
        "remote"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_embeddings(texts).await
    }
}
