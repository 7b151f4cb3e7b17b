//! Core data models used throughout newsrag.
//!
//! These types represent the news records, chunks, index entries, and
//! answers that flow through the indexing and question-answering pipeline.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Fixed reply returned when retrieval finds nothing good enough to answer from.
pub const NO_MATCH_MESSAGE: &str = "Unable to find matching results.";

/// One record from the corpus file.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    /// Stable identifier within one corpus load: `<group>/<position>`.
    pub id: String,
    /// Top-level key of the corpus object the record was listed under.
    pub group: String,
    pub full_text: String,
    pub ticker: Option<String>,
    pub link: Option<String>,
}

/// Optional provenance attached to a chunk when metadata propagation is on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkMetadata {
    pub ticker: Option<String>,
    pub link: Option<String>,
}

impl ChunkMetadata {
    pub fn is_empty(&self) -> bool {
        self.ticker.is_none() && self.link.is_none()
    }
}

/// A contiguous window of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// `<document_id>#<chunk_index>`; stable for a given corpus and chunking parameters.
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    /// Byte offset of the chunk start in the source text.
    pub start: usize,
    /// Byte offset one past the chunk end in the source text.
    pub end: usize,
    pub metadata: ChunkMetadata,
}

/// A chunk paired with its embedding, as written to the vector store.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A stored chunk returned from similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// Cosine similarity to the query; higher is more relevant.
    pub score: f64,
}

/// Where an index lives: an on-disk location plus a named collection in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexLocation {
    pub path: PathBuf,
    pub collection: String,
}

impl IndexLocation {
    pub fn new(path: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for IndexLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.path.display(), self.collection)
    }
}

/// Counters reported by an index rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks_indexed: usize,
    /// Whitespace-only chunks that were not embedded.
    pub chunks_skipped: usize,
}

/// The reply to one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Raw language-model output.
    Generated(String),
    NoMatch,
}

impl Answer {
    pub fn is_no_match(&self) -> bool {
        matches!(self, Answer::NoMatch)
    }

    pub fn text(&self) -> &str {
        match self {
            Answer::Generated(text) => text,
            Answer::NoMatch => NO_MATCH_MESSAGE,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
