//! Vector index collaborator.
//!
//! The index is shared across all users; isolation comes from metadata
//! predicates on the caller side and upserts are last-write-wins. The trait
//! seam keeps the pipeline testable against an in-memory double.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::embedding::client::{EmbeddingError, EmbeddingProvider};
use crate::embedding::{EmbeddedChunk, RetrievedChunk};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Malformed index response: {0}")]
    InvalidResponse(String),
}

/// Nearest-neighbor store over embedded chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces one chunk, keyed by `source_id:chunk_index`.
    async fn upsert(&self, chunk: &EmbeddedChunk) -> Result<(), IndexError>;

    /// Top-k chunks for a free-text query, best first.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError>;

    /// Removes every chunk belonging to the source item.
    async fn delete(&self, source_id: Uuid) -> Result<(), IndexError>;
}

/// REST-backed vector index (bearer-token API with /upsert, /query and
/// prefix /delete endpoints). Query embedding happens here so callers only
/// ever deal in text.
pub struct RestVectorIndex {
    client: reqwest::Client,
    base_url: String,
    token: String,
    embedder: Box<dyn EmbeddingProvider>,
}

impl RestVectorIndex {
    pub fn new(base_url: String, token: String, embedder: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            embedder,
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, IndexError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl VectorIndex for RestVectorIndex {
    async fn upsert(&self, chunk: &EmbeddedChunk) -> Result<(), IndexError> {
        let mut metadata = chunk.metadata.clone();
        metadata.insert("type".to_string(), json!(chunk.source_type.as_str()));
        metadata.insert("source_id".to_string(), json!(chunk.source_id));
        metadata.insert("chunk_index".to_string(), json!(chunk.chunk_index));
        metadata.insert("total_chunks".to_string(), json!(chunk.total_chunks));
        metadata.insert("content".to_string(), json!(chunk.content));

        self.post(
            "upsert",
            json!([{
                "id": chunk.vector_id(),
                "vector": chunk.embedding,
                "metadata": metadata,
            }]),
        )
        .await?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        let vector = self.embedder.embed(query).await?;
        let body = self
            .post(
                "query",
                json!({
                    "vector": vector,
                    "topK": k,
                    "includeMetadata": true,
                }),
            )
            .await?;

        let hits = body
            .get("result")
            .and_then(|r| r.as_array())
            .ok_or_else(|| IndexError::InvalidResponse("missing result array".to_string()))?;

        Ok(hits
            .iter()
            .map(|hit| {
                let metadata = hit
                    .get("metadata")
                    .and_then(|m| m.as_object())
                    .cloned()
                    .unwrap_or_else(Map::new);
                let content = metadata
                    .get("content")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string();
                RetrievedChunk {
                    content,
                    metadata,
                    score: hit.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0),
                }
            })
            .collect())
    }

    async fn delete(&self, source_id: Uuid) -> Result<(), IndexError> {
        self.post("delete", json!({ "prefix": format!("{source_id}:") }))
            .await?;
        Ok(())
    }
}

/// In-memory index for tests: cosine similarity over chunks held in a Vec.
#[cfg(test)]
pub struct InMemoryVectorIndex {
    chunks: std::sync::Mutex<Vec<EmbeddedChunk>>,
}

#[cfg(test)]
impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            chunks: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }
}

#[cfg(test)]
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    f64::from(dot / (norm_a * norm_b))
}

#[cfg(test)]
#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, chunk: &EmbeddedChunk) -> Result<(), IndexError> {
        let mut chunks = self.chunks.lock().unwrap();
        // Last write wins on the composite id.
        chunks.retain(|existing| existing.vector_id() != chunk.vector_id());
        chunks.push(chunk.clone());
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        let query_vector = crate::embedding::client::mock_embedding(query);
        let chunks = self.chunks.lock().unwrap();
        let mut scored: Vec<RetrievedChunk> = chunks
            .iter()
            .map(|chunk| {
                let mut metadata = chunk.metadata.clone();
                metadata.insert("type".to_string(), json!(chunk.source_type.as_str()));
                metadata.insert("source_id".to_string(), json!(chunk.source_id));
                RetrievedChunk {
                    content: chunk.content.clone(),
                    metadata,
                    score: cosine(&query_vector, &chunk.embedding),
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete(&self, source_id: Uuid) -> Result<(), IndexError> {
        self.chunks
            .lock()
            .unwrap()
            .retain(|chunk| chunk.source_id != source_id);
        Ok(())
    }
}
