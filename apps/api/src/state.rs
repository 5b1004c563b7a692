use std::sync::Arc;

use sqlx::PgPool;

use crate::embedding::client::EmbeddingProvider;
use crate::embedding::index::VectorIndex;
use crate::synthesis::ScheduleSynthesisStrategy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Embedding provider used by index maintenance.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Shared vector index; isolation between users is by metadata only.
    pub index: Arc<dyn VectorIndex>,
    /// Pluggable synthesis pipeline. Reference implementation:
    /// multi-stage with retrieval and per-task isolation.
    pub synthesis: Arc<dyn ScheduleSynthesisStrategy>,
}
