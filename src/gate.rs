//! Relevance gate.
//!
//! Scores are cosine similarities (higher = more relevant). An answer is
//! attempted only when the best hit reaches `min_score`; otherwise the
//! turn ends with the no-match reply and the language model is not called.

use crate::models::RetrievalResult;

/// Characters of the top chunk included in diagnostic logs.
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Retrieval returned nothing.
    Empty,
    /// The best hit scored below the threshold.
    BelowThreshold { top_score: f64 },
    Proceed { top_score: f64 },
}

impl GateDecision {
    pub fn should_answer(&self) -> bool {
        matches!(self, GateDecision::Proceed { .. })
    }
}

/// Decide whether `results` (best first) are good enough to answer from.
pub fn evaluate(results: &[RetrievalResult], min_score: f64) -> GateDecision {
    let Some(top) = results.first() else {
        tracing::debug!(results = 0, "no matching chunks");
        return GateDecision::Empty;
    };

    let top_score = top.score;
    if top_score < min_score {
        let preview: String = top.chunk.text.chars().take(PREVIEW_CHARS).collect();
        tracing::debug!(
            results = results.len(),
            top_score,
            min_score,
            top_chunk = %top.chunk.id,
            preview = %preview,
            "best match below threshold"
        );
        return GateDecision::BelowThreshold { top_score };
    }

    tracing::debug!(results = results.len(), top_score, "retrieval passed gate");
    GateDecision::Proceed { top_score }
}
