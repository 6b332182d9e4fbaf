//! Embedding providers.
//!
//! The default provider talks to an Ollama server's embeddings endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Request timeout for a single embedding call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for embedding providers.
///
/// This is the only network dependency of the retrieval core. Both calls
/// are fallible and potentially slow; callers decide how failures degrade.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Name of this provider, for logs.
    fn name(&self) -> &str;

    /// Length of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Generate an embedding for one text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts.
    ///
    /// Default implementation processes sequentially; providers with a
    /// native batch endpoint can override.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Ollama embedding provider.
///
/// Calls `POST {host}/api/embeddings` with `{"model", "prompt"}`.
pub struct OllamaProvider {
    /// Base URL of the Ollama server.
    host: String,

    /// Embedding model name.
    model: String,

    /// Expected output dimension for the configured model.
    dimension: usize,

    /// HTTP client.
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Default Ollama host.
    pub const DEFAULT_HOST: &'static str = "http://localhost:11434";

    /// Default embedding model and its dimension.
    pub const DEFAULT_MODEL: &'static str = "bge-m3";
    pub const DEFAULT_DIMENSION: usize = 1024;

    /// Create a provider with default host and model.
    pub fn new() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            dimension: Self::DEFAULT_DIMENSION,
            client: reqwest::Client::new(),
        }
    }

    /// Set the server base URL.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the expected output dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!("Requesting embedding for {} chars", text.len());

        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.host))
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "{status}: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await?;

        if result.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "empty embedding in response".to_string(),
            ));
        }

        Ok(result.embedding)
    }
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}
