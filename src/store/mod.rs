//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the narrow interface the pipeline uses to
//! persist and search embedded chunks. Every call names its
//! [`IndexLocation`] explicitly, so two sessions pointed at the same
//! location visibly share (and can clobber) the same index.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`rebuild`](VectorStore::rebuild) | Erase everything at the location, recreate an empty collection |
//! | [`insert`](VectorStore::insert) | Add embedded chunks to a collection |
//! | [`search`](VectorStore::search) | Top-k chunks by cosine similarity, best first |
//! | [`count`](VectorStore::count) | Number of entries in a collection |
//!
//! Backends: [`memory::InMemoryVectorStore`] and [`sqlite::SqliteVectorStore`].

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;

use crate::models::{IndexEntry, IndexLocation, RetrievalResult};

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Erase any index at `location.path` and create an empty collection.
    ///
    /// Safe to call when nothing exists there yet.
    async fn rebuild(&self, location: &IndexLocation) -> Result<()>;

    /// Insert entries into an existing collection; returns the number written.
    ///
    /// Fails if the collection was never rebuilt or a chunk id is already present.
    async fn insert(&self, location: &IndexLocation, entries: &[IndexEntry]) -> Result<usize>;

    /// Return at most `k` entries ordered by descending similarity to `query_vec`.
    async fn search(
        &self,
        location: &IndexLocation,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalResult>>;

    async fn count(&self, location: &IndexLocation) -> Result<usize>;
}

/// Sort results best-first and keep the top `k`.
///
/// The sort is stable, so equal scores keep insertion order.
pub(crate) fn rank_top_k(results: &mut Vec<RetrievalResult>, k: usize) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(k);
}
