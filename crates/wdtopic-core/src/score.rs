//! The classifier seam.
//!
//! The topic model is an opaque pre-trained artifact. The service and the
//! bulk runner only depend on this trait: feature tokens in, one score
//! per taxonomy label out. The real implementation lives in
//! `wdtopic-model`; tests inject fixed maps.

use thiserror::Error;

use crate::threshold::LabelScoreMap;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("classifier inference failed: {0}")]
    Inference(String),
}

/// Multi-label scoring over a fixed taxonomy.
///
/// Implementations must be deterministic for identical token sequences
/// and safe to call from concurrent tasks; the loaded artifact is never
/// mutated after startup. An empty token sequence is valid input.
pub trait TopicScorer: Send + Sync {
    fn score(&self, tokens: &[String]) -> Result<LabelScoreMap, ScoreError>;
}
