//! The hybrid search flow.
//!
//! query text -> embedding -> similarity query -> lexical fallback when the
//! vector query returns fewer than `fallback_floor` hits -> merge.

use std::sync::Arc;

use crate::artifacts::{ArtifactStore, SearchResult, StoreError};
use crate::config::SearchConfig;

use super::embeddings::{validate_embedding, Embedder, EmbeddingError};
use super::hybrid;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Embed `text` and check the vector against the length already stored.
///
/// The first stored vector fixes the dimensionality; any later payload of
/// another length is a provider failure, not something to store or score.
pub fn embed_for_store(
    embedder: &dyn Embedder,
    store: &dyn ArtifactStore,
    text: &str,
) -> Result<Vec<f32>, SearchError> {
    let embedding = embedder.embed(text)?;

    if let Some(stored) = store.dimensions()? {
        validate_embedding(&embedding, Some(stored))?;
    }

    Ok(embedding)
}

/// Stateless search service; safe to share across concurrent requests.
pub struct HybridSearch {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ArtifactStore>,
    config: SearchConfig,
}

impl HybridSearch {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ArtifactStore>,
        config: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Rank stored artifacts against `query`.
    ///
    /// Fails only when the query cannot be embedded or the store errors;
    /// zero matches is an empty, successful answer.
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let SearchConfig {
            similarity_threshold,
            fallback_floor,
            result_limit,
        } = self.config;

        let query_embedding = embed_for_store(self.embedder.as_ref(), self.store.as_ref(), query)?;

        let vector_results =
            self.store
                .similarity_query(&query_embedding, similarity_threshold, result_limit)?;

        let lexical_results = if vector_results.len() < fallback_floor {
            let remaining = result_limit.saturating_sub(vector_results.len());
            log::debug!(
                "vector search returned {} (< {fallback_floor}), fetching {remaining} lexical matches",
                vector_results.len()
            );
            self.store.lexical_query(query, remaining)?
        } else {
            vec![]
        };

        let vector_count = vector_results.len();
        let lexical_count = lexical_results.len();
        let results = hybrid::merge(vector_results, lexical_results);

        log::info!(
            "search complete: {} results ({vector_count} vector, {lexical_count} lexical)",
            results.len()
        );

        Ok(results)
    }
}
