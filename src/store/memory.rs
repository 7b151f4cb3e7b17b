//! In-memory [`VectorStore`] implementation for tests and throwaway sessions.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`, keyed by
//! index location. Search is brute-force cosine similarity over the
//! collection's vectors.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, IndexEntry, IndexLocation, RetrievalResult};

use super::{rank_top_k, VectorStore};

struct StoredEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Default)]
struct Collection {
    entries: Vec<StoredEntry>,
    ids: HashSet<String>,
}

/// In-memory store; contents vanish with the process.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<IndexLocation, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> anyhow::Error {
    anyhow!("in-memory vector store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn rebuild(&self, location: &IndexLocation) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        // Wiping a path drops every collection stored under it.
        collections.retain(|loc, _| loc.path != location.path);
        collections.insert(location.clone(), Collection::default());
        Ok(())
    }

    async fn insert(&self, location: &IndexLocation, entries: &[IndexEntry]) -> Result<usize> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let collection = collections
            .get_mut(location)
            .ok_or_else(|| anyhow!("collection {} does not exist; rebuild it first", location))?;

        let mut batch_ids = HashSet::new();
        for entry in entries {
            if collection.ids.contains(&entry.chunk.id) || !batch_ids.insert(&entry.chunk.id) {
                bail!("duplicate chunk id in {}: {}", location, entry.chunk.id);
            }
        }

        for entry in entries {
            collection.ids.insert(entry.chunk.id.clone());
            collection.entries.push(StoredEntry {
                chunk: entry.chunk.clone(),
                vector: entry.embedding.clone(),
            });
        }
        Ok(entries.len())
    }

    async fn search(
        &self,
        location: &IndexLocation,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let collection = collections
            .get(location)
            .ok_or_else(|| anyhow!("no index found at {}", location))?;

        let mut results: Vec<RetrievalResult> = collection
            .entries
            .iter()
            .map(|stored| RetrievalResult {
                chunk: stored.chunk.clone(),
                score: cosine_similarity(query_vec, &stored.vector) as f64,
            })
            .collect();
        rank_top_k(&mut results, k);
        Ok(results)
    }

    async fn count(&self, location: &IndexLocation) -> Result<usize> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(location)
            .map(|c| c.entries.len())
            .unwrap_or(0))
    }
}
