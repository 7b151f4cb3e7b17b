//! Index building: chunk → embed → store.
//!
//! Every build starts from an empty index. The location is wiped, all
//! chunks are embedded in batches, and the entries are written in one
//! insert call. If any embedding batch fails the build aborts before
//! anything is inserted, leaving an empty collection rather than a partial one.
//!
//! Builds are not coordinated across sessions: two sessions that share an
//! index location and start at the same time can wipe each other's data.

use anyhow::{bail, Context, Result};

use crate::chunk::chunk_news_item;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::models::{Chunk, IndexEntry, IndexLocation, IndexStats, NewsItem};
use crate::store::VectorStore;

/// Chunk every item, in corpus order.
pub fn chunk_corpus(items: &[NewsItem], config: &Config) -> Vec<Chunk> {
    items
        .iter()
        .flat_map(|item| chunk_news_item(item, &config.chunking))
        .collect()
}

/// Rebuild the index at `location` from `items`.
pub async fn build_index(
    items: &[NewsItem],
    config: &Config,
    location: &IndexLocation,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
) -> Result<IndexStats> {
    let (chunks, skipped): (Vec<Chunk>, Vec<Chunk>) = chunk_corpus(items, config)
        .into_iter()
        .partition(|c| !c.text.trim().is_empty());

    tracing::info!(
        %location,
        documents = items.len(),
        chunks = chunks.len(),
        skipped = skipped.len(),
        "rebuilding index"
    );

    store
        .rebuild(location)
        .await
        .with_context(|| format!("Failed to reset index {}", location))?;

    let vectors = embed_chunks(&chunks, config.embedding.batch_size, embedder).await?;

    let entries: Vec<IndexEntry> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
        .collect();

    let written = if entries.is_empty() {
        0
    } else {
        store
            .insert(location, &entries)
            .await
            .with_context(|| format!("Failed to write index {}", location))?
    };

    Ok(IndexStats {
        documents: items.len(),
        chunks_indexed: written,
        chunks_skipped: skipped.len(),
    })
}

async fn embed_chunks(
    chunks: &[Chunk],
    batch_size: usize,
    embedder: &dyn Embedder,
) -> Result<Vec<Vec<f32>>> {
    let expected_dims = embedder.dims();
    let mut vectors = Vec::with_capacity(chunks.len());

    for (batch_no, batch) in chunks.chunks(batch_size.max(1)).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let batch_vectors = embedder
            .embed(&texts)
            .await
            .with_context(|| format!("Embedding batch {} failed", batch_no))?;

        if batch_vectors.len() != batch.len() {
            bail!(
                "Embedding batch {} returned {} vectors for {} chunks",
                batch_no,
                batch_vectors.len(),
                batch.len()
            );
        }
        for (chunk, vector) in batch.iter().zip(&batch_vectors) {
            if expected_dims > 0 && vector.len() != expected_dims {
                bail!(
                    "Embedding for chunk {} has {} dimensions, expected {}",
                    chunk.id,
                    vector.len(),
                    expected_dims
                );
            }
        }

        tracing::debug!(batch = batch_no, size = batch.len(), "embedded batch");
        vectors.extend(batch_vectors);
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as (length, vowel count, 1.0); fails on the configured call number.
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
        dims: usize,
    }

    impl CountingEmbedder {
        fn new(dims: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_call: None,
                dims,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                bail!("connection refused");
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                    vec![t.len() as f32, vowels as f32, 1.0]
                })
                .collect())
        }
    }

    fn item(id: &str, text: &str) -> NewsItem {
        NewsItem {
            id: id.to_string(),
            group: "TEST".to_string(),
            full_text: text.to_string(),
            ticker: None,
            link: None,
        }
    }

    fn small_chunk_config(batch_size: usize) -> Config {
        let mut config = Config::default();
        config.chunking.max_chars = 30;
        config.chunking.overlap_chars = 5;
        config.embedding.batch_size = batch_size;
        config
    }

    fn location() -> IndexLocation {
        IndexLocation::new("/tmp/newsrag-index-test", "stock_news")
    }

    #[tokio::test]
    async fn test_build_indexes_all_chunks_in_batches() {
        let items = vec![
            item("A/0", "Apple reported record profit in the third quarter of the year."),
            item("B/0", "Banks rallied after the rate decision."),
        ];
        let config = small_chunk_config(2);
        let expected = chunk_corpus(&items, &config).len();
        let embedder = CountingEmbedder::new(3);
        let store = InMemoryVectorStore::new();

        let stats = build_index(&items, &config, &location(), &embedder, &store)
            .await
            .unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunks_indexed, expected);
        assert_eq!(store.count(&location()).await.unwrap(), expected);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), expected.div_ceil(2));
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_empty_index() {
        let items = vec![item("A/0", "Apple reported record profit in the third quarter.")];
        let config = small_chunk_config(1);
        let mut embedder = CountingEmbedder::new(3);
        embedder.fail_on_call = Some(1);
        let store = InMemoryVectorStore::new();

        let err = build_index(&items, &config, &location(), &embedder, &store)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
        assert_eq!(store.count(&location()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let items = vec![item("A/0", "Apple")];
        let embedder = CountingEmbedder::new(768);
        let store = InMemoryVectorStore::new();
        let err = build_index(&items, &Config::default(), &location(), &embedder, &store)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[tokio::test]
    async fn test_whitespace_chunks_skipped() {
        let items = vec![item("A/0", "   "), item("B/0", "Oil prices climbed.")];
        let embedder = CountingEmbedder::new(3);
        let store = InMemoryVectorStore::new();
        let stats = build_index(&items, &Config::default(), &location(), &embedder, &store)
            .await
            .unwrap();
        assert_eq!(stats.chunks_indexed, 1);
        assert_eq!(stats.chunks_skipped, 1);
    }

    #[tokio::test]
    async fn test_empty_corpus_builds_empty_index() {
        let embedder = CountingEmbedder::new(3);
        let store = InMemoryVectorStore::new();
        let stats = build_index(&[], &Config::default(), &location(), &embedder, &store)
            .await
            .unwrap();
        assert_eq!(stats, IndexStats::default());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(store.search(&location(), &[1.0, 0.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_twice_has_no_duplicates() {
        let items = vec![item("A/0", "Apple reported record profit in the third quarter.")];
        let config = small_chunk_config(4);
        let embedder = CountingEmbedder::new(3);
        let store = InMemoryVectorStore::new();

        let first = build_index(&items, &config, &location(), &embedder, &store)
            .await
            .unwrap();
        let second = build_index(&items, &config, &location(), &embedder, &store)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count(&location()).await.unwrap(), first.chunks_indexed);
    }
}
