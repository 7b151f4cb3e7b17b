//! Query-time retrieval.

use anyhow::{Context, Result};

use crate::embedding::{embed_query, Embedder};
use crate::models::{IndexLocation, RetrievalResult};
use crate::store::VectorStore;

/// Embed `query` and return up to `k` stored chunks, most similar first.
///
/// `embedder` must be the one the index was built with.
pub async fn retrieve(
    query: &str,
    k: usize,
    location: &IndexLocation,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
) -> Result<Vec<RetrievalResult>> {
    let query_vec = embed_query(embedder, query)
        .await
        .context("Failed to embed query")?;

    let mut results = store
        .search(location, &query_vec, k)
        .await
        .with_context(|| format!("Search failed in {}", location))?;
    // Best first, at most k, whatever the backend returned.
    crate::store::rank_top_k(&mut results, k);

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_text;
    use crate::embedding::DisabledEmbedder;
    use crate::models::IndexEntry;
    use crate::store::InMemoryVectorStore;
    use async_trait::async_trait;

    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.to_lowercase().contains("apple") {
                        vec![1.0, 0.1]
                    } else {
                        vec![0.1, 1.0]
                    }
                })
                .collect())
        }
    }

    async fn seeded_store(location: &IndexLocation) -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store.rebuild(location).await.unwrap();
        let texts = ["Apple reported record profit.", "Oil fell.", "Banks rose.", "Gold flat."];
        let mut entries = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let chunk = chunk_text(&format!("D/{}", i), text, 1000, 0).remove(0);
            let embedding = AxisEmbedder.embed(&[text.to_string()]).await.unwrap().remove(0);
            entries.push(IndexEntry { chunk, embedding });
        }
        store.insert(location, &entries).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_top_result_and_bound() {
        let loc = IndexLocation::new("/tmp/newsrag-retrieve", "stock_news");
        let store = seeded_store(&loc).await;

        let results = retrieve("What did Apple report?", 3, &loc, &AxisEmbedder, &store)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.text, "Apple reported record profit.");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_embedding_failure_is_error() {
        let loc = IndexLocation::new("/tmp/newsrag-retrieve-fail", "stock_news");
        let store = seeded_store(&loc).await;
        let err = retrieve("apple", 3, &loc, &DisabledEmbedder, &store)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("embed query"));
    }
}
