//! Typed errors for the pipeline stages.
//!
//! Stage internals use `anyhow`; each stage boundary wraps the failure in a
//! [`RagError`] variant so callers can tell a dead session from a failed turn.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("failed to load corpus: {0:#}")]
    CorpusLoad(anyhow::Error),

    #[error("failed to build index: {0:#}")]
    IndexBuild(anyhow::Error),

    #[error("retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),

    #[error("answer generation failed: {0:#}")]
    Generation(anyhow::Error),
}

impl RagError {
    /// Whether the error prevents a session from starting.
    ///
    /// Retrieval and generation failures only affect the current turn.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            RagError::Config(_) | RagError::CorpusLoad(_) | RagError::IndexBuild(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Config(_) => "config",
            RagError::CorpusLoad(_) => "corpus_load",
            RagError::IndexBuild(_) => "index_build",
            RagError::Retrieval(_) => "retrieval",
            RagError::Generation(_) => "generation",
        }
    }
}
