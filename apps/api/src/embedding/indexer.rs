//! Batched embed-and-upsert pipeline.
//!
//! Items are processed in fixed-size batches, concurrently within a batch.
//! One item failing to embed is logged and counted; the batch and the run
//! continue.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::chunker::chunk_item;
use crate::embedding::client::EmbeddingProvider;
use crate::embedding::index::{IndexError, VectorIndex};
use crate::embedding::{EmbeddableItem, EmbeddedChunk};

/// Items per processing batch.
pub const BATCH_SIZE: usize = 100;

/// Outcome tally for one indexing run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EmbedReport {
    pub items: usize,
    pub embedded_chunks: usize,
    pub failed_items: usize,
}

/// Embeds and upserts a collection of items. Never fails as a whole: the
/// report says how much of the input made it into the index.
pub async fn embed_items(
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    items: &[EmbeddableItem],
) -> EmbedReport {
    let mut report = EmbedReport {
        items: items.len(),
        ..EmbedReport::default()
    };

    let batch_count = items.len().div_ceil(BATCH_SIZE);
    for (batch_no, batch) in items.chunks(BATCH_SIZE).enumerate() {
        debug!("Embedding batch {} of {batch_count}", batch_no + 1);

        let outcomes = join_all(
            batch
                .iter()
                .map(|item| async move { (item, embed_one(embedder, index, item).await) }),
        )
        .await;

        for (item, outcome) in outcomes {
            match outcome {
                Ok(chunk_count) => report.embedded_chunks += chunk_count,
                Err(e) => {
                    warn!("Embedding {} {} failed: {e}", item.source_type, item.id);
                    report.failed_items += 1;
                }
            }
        }
    }

    report
}

/// Re-embeds one item as delete-then-reinsert; a partial in-place patch of
/// stale chunks is never attempted. A failed delete is logged and the
/// reinsert proceeds (upserts overwrite matching chunk ids anyway).
pub async fn reindex_item(
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    item: &EmbeddableItem,
) -> EmbedReport {
    if let Err(e) = index.delete(item.id).await {
        warn!("Deleting stale chunks for {} failed: {e}", item.id);
    }
    embed_items(embedder, index, std::slice::from_ref(item)).await
}

async fn embed_one(
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    item: &EmbeddableItem,
) -> Result<usize, IndexError> {
    let chunk_texts = chunk_item(item);
    let total_chunks = chunk_texts.len();

    for (chunk_index, content) in chunk_texts.iter().enumerate() {
        let embedding = embedder.embed(content).await?;
        index
            .upsert(&EmbeddedChunk {
                source_id: item.id,
                source_type: item.source_type,
                chunk_index,
                total_chunks,
                embedding,
                content: content.clone(),
                metadata: item.metadata.clone(),
            })
            .await?;
    }

    Ok(total_chunks)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Map;
    use uuid::Uuid;

    use super::*;
    use crate::embedding::client::{EmbeddingError, MockEmbedder};
    use crate::embedding::index::InMemoryVectorIndex;
    use crate::embedding::SourceType;

    fn item(source_type: SourceType, content: &str) -> EmbeddableItem {
        EmbeddableItem {
            id: Uuid::new_v4(),
            source_type,
            content: content.to_string(),
            metadata: Map::new(),
        }
    }

    /// Embedder that fails on a marker token, for isolation tests.
    struct FlakyEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("poison") {
                return Err(EmbeddingError::EmptyResponse);
            }
            Ok(crate::embedding::client::mock_embedding(text))
        }
    }

    #[tokio::test]
    async fn test_embed_items_indexes_every_chunk() {
        let index = InMemoryVectorIndex::new();
        let long_body = "word ".repeat(500);
        let items = vec![
            item(SourceType::Issue, &long_body),
            item(SourceType::Commit, "fix: clamp retry budget"),
        ];

        let report = embed_items(&MockEmbedder, &index, &items).await;

        assert_eq!(report.items, 2);
        assert_eq!(report.failed_items, 0);
        assert!(report.embedded_chunks > 2, "long issue should split");
        assert_eq!(index.len(), report.embedded_chunks);
    }

    #[tokio::test]
    async fn test_single_item_failure_is_isolated() {
        let index = InMemoryVectorIndex::new();
        let items = vec![
            item(SourceType::Issue, "healthy item"),
            item(SourceType::Issue, "poison item"),
            item(SourceType::Issue, "another healthy item"),
        ];

        let report = embed_items(&FlakyEmbedder, &index, &items).await;

        assert_eq!(report.failed_items, 1);
        assert_eq!(report.embedded_chunks, 2);
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_chunk_metadata_records_position() {
        let index = InMemoryVectorIndex::new();
        let long_body = "word ".repeat(500);
        let items = vec![item(SourceType::Activity, &long_body)];

        let report = embed_items(&MockEmbedder, &index, &items).await;
        assert!(report.embedded_chunks >= 2);

        let hits = index.similarity_search("word", 10).await.unwrap();
        assert_eq!(hits.len(), report.embedded_chunks);
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_chunks() {
        let index = InMemoryVectorIndex::new();
        let mut the_item = item(SourceType::Issue, &"old content ".repeat(200));
        embed_items(&MockEmbedder, &index, std::slice::from_ref(&the_item)).await;
        let before = index.len();
        assert!(before > 1);

        the_item.content = "short new content".to_string();
        let report = reindex_item(&MockEmbedder, &index, &the_item).await;

        assert_eq!(report.embedded_chunks, 1);
        assert_eq!(index.len(), 1);
        let hits = index.similarity_search("short new content", 5).await.unwrap();
        assert_eq!(hits[0].content, "short new content");
    }

    #[tokio::test]
    async fn test_empty_input_is_a_noop() {
        let index = InMemoryVectorIndex::new();
        let report = embed_items(&MockEmbedder, &index, &[]).await;
        assert_eq!(report.items, 0);
        assert_eq!(report.embedded_chunks, 0);
        assert_eq!(index.len(), 0);
    }
}
