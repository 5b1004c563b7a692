//! Schedule Synthesizer — multi-stage LLM orchestration.
//!
//! Flow: INIT → DRAFTING → DETAILING → REFINING → VALIDATING → PERSISTED,
//! with FAILED as the other terminal. DRAFTING failures are fatal before
//! anything is written; DETAILING isolates per-task failures; REFINING is
//! best-effort; VALIDATING drops violators instead of correcting them.

pub mod context;
pub mod pipeline;
pub mod prompts;
pub mod validate;

use std::fmt;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::suggestion::SuggestedEventRow;

/// Pipeline stage, used for transition logging and failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStage {
    Init,
    Drafting,
    Detailing,
    Refining,
    Validating,
    Persisted,
    Failed,
}

impl fmt::Display for SynthesisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SynthesisStage::Init => "INIT",
            SynthesisStage::Drafting => "DRAFTING",
            SynthesisStage::Detailing => "DETAILING",
            SynthesisStage::Refining => "REFINING",
            SynthesisStage::Validating => "VALIDATING",
            SynthesisStage::Persisted => "PERSISTED",
            SynthesisStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Strategy seam for schedule generation.
///
/// Earlier iterations of the product shipped a single-shot prompt without
/// retrieval; that variant is deprecated. [`pipeline::MultiStageSynthesis`]
/// is the reference implementation.
#[async_trait]
pub trait ScheduleSynthesisStrategy: Send + Sync {
    /// Runs one generation for the user's upcoming week and returns the
    /// persisted suggestions. No mutual exclusion is provided between
    /// concurrent runs for the same user.
    async fn synthesize(
        &self,
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<SuggestedEventRow>, AppError>;
}
