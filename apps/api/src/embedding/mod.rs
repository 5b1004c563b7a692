//! Content embedding and semantic retrieval.
//!
//! Heterogeneous records (engineering artifacts, calendar events, telemetry)
//! are chunked, embedded, and upserted into a shared vector index; the
//! synthesis pipeline retrieves nearest neighbors to ground task details.

pub mod chunker;
pub mod client;
pub mod handlers;
pub mod index;
pub mod indexer;
pub mod retriever;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Source tag carried on every chunk so retrieval results are attributable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    PullRequest,
    Commit,
    Issue,
    CalendarEvent,
    Activity,
    CodingSession,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::PullRequest => "pull-request",
            SourceType::Commit => "commit",
            SourceType::Issue => "issue",
            SourceType::CalendarEvent => "calendar-event",
            SourceType::Activity => "activity",
            SourceType::CodingSession => "coding-session",
        }
    }

    /// Structured/code-bearing sources stay whole: splitting a PR body or a
    /// commit message mid-diff destroys the very structure retrieval needs.
    pub fn is_atomic(&self) -> bool {
        matches!(self, SourceType::PullRequest | SourceType::Commit)
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record queued for indexing, before chunking.
#[derive(Debug, Clone)]
pub struct EmbeddableItem {
    pub id: Uuid,
    pub source_type: SourceType,
    pub content: String,
    /// Source-specific fields carried through to chunk metadata.
    pub metadata: Map<String, Value>,
}

/// One embedded chunk of a source item. `chunk_index`/`total_chunks` let a
/// consumer reassemble the parent in order.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub source_id: Uuid,
    pub source_type: SourceType,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub embedding: Vec<f32>,
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl EmbeddedChunk {
    /// Index-side id. Prefixing with the source id makes delete-by-item a
    /// prefix operation.
    pub fn vector_id(&self) -> String {
        format!("{}:{}", self.source_id, self.chunk_index)
    }
}

/// A retrieval hit handed to the synthesis pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: Map<String, Value>,
    pub score: f64,
}
