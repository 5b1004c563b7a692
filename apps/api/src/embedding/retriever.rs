//! Semantic retrieval with graceful degradation.

use tracing::warn;

use crate::embedding::index::VectorIndex;
use crate::embedding::RetrievedChunk;

/// Default top-k for synthesis-time retrieval.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 5;

/// Returns the top-k chunks for a query. An unreachable index is not an
/// error here: the caller proceeds with reduced context, so this logs and
/// returns an empty set instead of failing.
pub async fn retrieve_related(
    index: &dyn VectorIndex,
    query: &str,
    k: usize,
) -> Vec<RetrievedChunk> {
    match index.similarity_search(query, k).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!("Retrieval for '{query}' unavailable ({e}); continuing without context");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Map;
    use uuid::Uuid;

    use super::*;
    use crate::embedding::client::mock_embedding;
    use crate::embedding::index::{InMemoryVectorIndex, IndexError};
    use crate::embedding::{EmbeddedChunk, SourceType};

    struct UnreachableIndex;

    #[async_trait]
    impl VectorIndex for UnreachableIndex {
        async fn upsert(&self, _chunk: &EmbeddedChunk) -> Result<(), IndexError> {
            Err(IndexError::InvalidResponse("index offline".to_string()))
        }

        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<RetrievedChunk>, IndexError> {
            Err(IndexError::InvalidResponse("index offline".to_string()))
        }

        async fn delete(&self, _source_id: Uuid) -> Result<(), IndexError> {
            Err(IndexError::InvalidResponse("index offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_retrieval_returns_ranked_hits() {
        let index = InMemoryVectorIndex::new();
        for content in ["review auth pull request", "plan database migration"] {
            index
                .upsert(&EmbeddedChunk {
                    source_id: Uuid::new_v4(),
                    source_type: SourceType::PullRequest,
                    chunk_index: 0,
                    total_chunks: 1,
                    embedding: mock_embedding(content),
                    content: content.to_string(),
                    metadata: Map::new(),
                })
                .await
                .unwrap();
        }

        let hits = retrieve_related(&index, "review auth pull request", 2).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "review auth pull request");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_unreachable_index_degrades_to_empty() {
        let hits = retrieve_related(&UnreachableIndex, "anything", 5).await;
        assert!(hits.is_empty());
    }
}
