//! Similarity retrieval over the vector index.

use std::sync::Arc;

use crate::EmbedFn;
use crate::vector_store::{VectorStore, VectorStoreError};

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Passages returned per query.
    pub top_k: usize,
    /// Minimum cosine similarity to accept; 0.0 keeps everything.
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            score_threshold: 0.0,
        }
    }
}

/// One retrieved passage with its provenance and similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub content: String,
    pub source: String,
    pub chunk_index: usize,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] sibyl_llm::LlmError),

    #[error("search failed: {0}")]
    Store(#[from] VectorStoreError),
}

pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embed_fn: EmbedFn,
    config: RetrievalConfig,
}

impl Retriever {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, embed_fn: EmbedFn, config: RetrievalConfig) -> Self {
        Self {
            store,
            embed_fn,
            config,
        }
    }

    /// Embed the query with the same function used at indexing time and
    /// return the top-K passages. An empty index yields an empty vector.
    /// Hits with malformed payloads are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the store search fails.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, RetrieveError> {
        let query_vector = (self.embed_fn)(query).await?;

        let hits = self
            .store
            .search(query_vector, self.config.top_k)
            .await?;

        let mut passages = Vec::with_capacity(hits.len());
        for hit in hits {
            if hit.score < self.config.score_threshold {
                continue;
            }
            let (Some(content), Some(source)) = (
                hit.payload.get("content").and_then(|v| v.as_str()),
                hit.payload.get("source").and_then(|v| v.as_str()),
            ) else {
                tracing::warn!(id = hit.id, "skipping hit with malformed payload");
                continue;
            };
            let chunk_index = hit
                .payload
                .get("chunk_index")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            passages.push(RetrievedPassage {
                content: content.to_owned(),
                source: source.to_owned(),
                chunk_index: usize::try_from(chunk_index).unwrap_or(0),
                score: hit.score,
            });
        }

        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::in_memory_store::InMemoryVectorStore;
    use crate::vector_store::VectorPoint;
    use sibyl_llm::mock::{MOCK_EMBED_DIM, hashed_bag_of_words};

    fn passage_point(id: u64, content: &str) -> VectorPoint {
        VectorPoint {
            id,
            vector: hashed_bag_of_words(content, MOCK_EMBED_DIM),
            payload: HashMap::from([
                ("content".into(), serde_json::json!(content)),
                ("source".into(), serde_json::json!("docs/test.txt")),
                ("content_type".into(), serde_json::json!("text/plain")),
                ("chunk_index".into(), serde_json::json!(id)),
            ]),
        }
    }

    fn bag_embed() -> EmbedFn {
        Box::new(|text: &str| {
            let v = hashed_bag_of_words(text, MOCK_EMBED_DIM);
            Box::pin(async move { Ok(v) })
        })
    }

    #[tokio::test]
    async fn retrieve_ranks_by_token_overlap() {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .upsert(vec![
                passage_point(0, "Pricing is tiered by seat count"),
                passage_point(1, "Support is included with every plan"),
            ])
            .await
            .unwrap();

        let retriever = Retriever::new(store, bag_embed(), RetrievalConfig::default());
        let passages = retriever
            .retrieve("What is included with support?")
            .await
            .unwrap();

        assert!(!passages.is_empty());
        assert!(passages[0].content.contains("included"));
        assert_eq!(passages[0].source, "docs/test.txt");
    }

    #[tokio::test]
    async fn empty_index_returns_empty_not_error() {
        let store = Arc::new(InMemoryVectorStore::new());
        let retriever = Retriever::new(store, bag_embed(), RetrievalConfig::default());
        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn top_k_limits_results() {
        let store = Arc::new(InMemoryVectorStore::new());
        let points: Vec<VectorPoint> = (0..10)
            .map(|i| passage_point(i, "same words in every passage"))
            .collect();
        store.upsert(points).await.unwrap();

        let config = RetrievalConfig {
            top_k: 3,
            ..RetrievalConfig::default()
        };
        let retriever = Retriever::new(store, bag_embed(), config);
        let passages = retriever.retrieve("same words").await.unwrap();
        assert_eq!(passages.len(), 3);
    }

    #[tokio::test]
    async fn identical_queries_return_identical_ordering() {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .upsert(vec![
                passage_point(0, "alpha beta gamma"),
                passage_point(1, "alpha beta gamma"),
                passage_point(2, "alpha beta delta"),
            ])
            .await
            .unwrap();

        let retriever = Retriever::new(store, bag_embed(), RetrievalConfig::default());
        let first: Vec<usize> = retriever
            .retrieve("alpha beta gamma")
            .await
            .unwrap()
            .iter()
            .map(|p| p.chunk_index)
            .collect();
        let second: Vec<usize> = retriever
            .retrieve("alpha beta gamma")
            .await
            .unwrap()
            .iter()
            .map(|p| p.chunk_index)
            .collect();
        assert_eq!(first, second);
        // exact ties break by insertion id
        assert_eq!(first[..2], [0, 1]);
    }

    #[tokio::test]
    async fn score_threshold_drops_weak_hits() {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .upsert(vec![
                passage_point(0, "completely unrelated text about gardening"),
            ])
            .await
            .unwrap();

        let config = RetrievalConfig {
            top_k: 4,
            score_threshold: 0.99,
        };
        let retriever = Retriever::new(store, bag_embed(), config);
        let passages = retriever.retrieve("quantum chromodynamics").await.unwrap();
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped() {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .upsert(vec![
                VectorPoint {
                    id: 0,
                    vector: hashed_bag_of_words("alpha", MOCK_EMBED_DIM),
                    payload: HashMap::new(),
                },
                passage_point(1, "alpha"),
            ])
            .await
            .unwrap();

        let retriever = Retriever::new(store, bag_embed(), RetrievalConfig::default());
        let passages = retriever.retrieve("alpha").await.unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].chunk_index, 1);
    }

    #[tokio::test]
    async fn embed_failure_propagates() {
        let store = Arc::new(InMemoryVectorStore::new());
        let failing: EmbedFn = Box::new(|_| {
            Box::pin(async { Err(sibyl_llm::LlmError::Other("embed down".into())) })
        });
        let retriever = Retriever::new(store, failing, RetrievalConfig::default());
        assert!(matches!(
            retriever.retrieve("q").await,
            Err(RetrieveError::Embedding(_))
        ));
    }
}
