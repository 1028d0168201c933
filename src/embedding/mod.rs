//! Embedding client abstraction and adapters.
//!
//! The production adapter issues synchronous HTTP requests to an
//! Ollama-compatible embeddings endpoint. There is no caching layer: every
//! call re-embeds, and determinism is provider-dependent.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::EmbeddingConfig;

/// Errors raised by embedding providers.
///
/// Every transport, status, and decode failure collapses into
/// [`EmbeddingError::Unavailable`]: ingestion treats it as retryable per
/// chunk, query-time retrieval treats it as the trigger for the non-semantic
/// fallback.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider was unreachable or unable to produce an embedding.
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for the supplied text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimensionality the provider is configured to produce.
    fn dimension(&self) -> usize;
}

/// HTTP embedding client for an Ollama-compatible runtime.
pub struct OllamaEmbeddingClient {
    http: Client,
    config: EmbeddingConfig,
}

impl OllamaEmbeddingClient {
    /// Construct a client from injected provider settings.
    pub fn new(config: EmbeddingConfig) -> Self {
        let http = Client::builder()
            .user_agent("cramkit/0.1")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let payload = json!({
            "model": self.config.model,
            "prompt": text,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingError::Unavailable(format!(
                    "failed to reach embedding provider at {}: {error}",
                    self.config.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Unavailable(format!(
                "embedding provider returned {status}: {body}"
            )));
        }

        let body: EmbeddingsResponse = response.json().await.map_err(|error| {
            EmbeddingError::Unavailable(format!("failed to decode embedding response: {error}"))
        })?;

        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
