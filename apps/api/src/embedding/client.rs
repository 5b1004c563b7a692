//! Embedding client — REST wrapper around the embeddings endpoint.
//!
//! Mirrors the llm_client layering: modules never build embedding requests
//! themselves, they go through [`EmbeddingProvider`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EMBEDDINGS_API_URL: &str = "https://api.openai.com/v1/embeddings";
/// Embedding model used for both indexing and query embedding. Hardcoded:
/// mixing models in one index silently degrades similarity scores.
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding response contained no vectors")]
    EmptyResponse,
}

/// Seam for embedding generation, so batching and index logic are testable
/// without network access.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Production embedding provider.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    api_key: String,
}

impl EmbeddingClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(EMBEDDINGS_API_URL)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: EMBEDDING_MODEL,
                input: text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::EmptyResponse)
    }
}

/// Deterministic bag-of-tokens embedder for tests: identical text maps to an
/// identical vector, overlapping text to nearby vectors.
#[cfg(test)]
pub struct MockEmbedder;

#[cfg(test)]
pub fn mock_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 64];
    for token in text.to_lowercase().split_whitespace() {
        let mut hash: u64 = 0;
        for byte in token.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(u64::from(byte));
        }
        vector[(hash % 64) as usize] += 1.0;
    }
    vector
}

#[cfg(test)]
#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(mock_embedding(text))
    }
}
