//! Ingestion pipeline and the operations the surrounding system calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    artifacts::{Artifact, ArtifactStore, NewArtifact, SearchResult},
    config::SearchConfig,
    semantic::{embed_for_store, embedding_text, Embedder, HybridSearch},
};

use super::errors::AppError;

/// Caller-supplied fields of an artifact.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct ArtifactInput {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

impl std::fmt::Debug for ArtifactInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ArtifactInput {{ url: {:?}, title: {:?}, content: [{} bytes] }}",
            self.url,
            self.title,
            self.content.len()
        )
    }
}

impl ArtifactInput {
    fn validate(&self) -> Result<(), AppError> {
        if self.url.is_empty() || self.content.is_empty() {
            return Err(AppError::Validation(
                "URL and content are required.".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct AppService {
    store: Arc<dyn ArtifactStore>,
    embedder: Arc<dyn Embedder>,
    search: HybridSearch,
}

impl AppService {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        embedder: Arc<dyn Embedder>,
        search_config: SearchConfig,
    ) -> Self {
        let search = HybridSearch::new(embedder.clone(), store.clone(), search_config);
        Self {
            store,
            embedder,
            search,
        }
    }

    /// Create (`existing_id = None`) or fully replace an artifact.
    ///
    /// Validation happens before the embedding call, and the store only sees
    /// a write once the embedding exists: an embedding failure leaves the
    /// store untouched.
    pub fn ingest(
        &self,
        input: ArtifactInput,
        existing_id: Option<u64>,
    ) -> Result<Artifact, AppError> {
        input.validate()?;

        if let Some(id) = existing_id {
            if self.store.get(id)?.is_none() {
                return Err(AppError::NotFound(id));
            }
        }

        let title = input.title.unwrap_or_default();
        let text = embedding_text(&title, &input.content);

        log::debug!("generating embedding for {} bytes of text", text.len());
        let embedding = embed_for_store(self.embedder.as_ref(), self.store.as_ref(), &text)
            .map_err(|err| {
                log::error!("embedding failed, artifact not saved: {err}");
                err
            })?;

        let new = NewArtifact {
            url: input.url,
            title,
            content: input.content,
            embedding,
        };

        let artifact = match existing_id {
            Some(id) => self.store.replace(id, new)?,
            None => self.store.insert(new)?,
        };

        log::info!(
            "artifact {} {}",
            artifact.id,
            if existing_id.is_some() { "updated" } else { "created" }
        );

        Ok(artifact)
    }

    pub fn create(&self, input: ArtifactInput) -> Result<Artifact, AppError> {
        self.ingest(input, None)
    }

    pub fn update(&self, id: u64, input: ArtifactInput) -> Result<Artifact, AppError> {
        self.ingest(input, Some(id))
    }

    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>, AppError> {
        if query.is_empty() {
            return Err(AppError::Validation(
                "Search query is required.".to_string(),
            ));
        }

        Ok(self.search.search(query)?)
    }

    pub fn get(&self, id: u64) -> Result<Artifact, AppError> {
        self.store.get(id)?.ok_or(AppError::NotFound(id))
    }

    pub fn list(&self) -> Result<Vec<Artifact>, AppError> {
        Ok(self.store.list_all()?)
    }

    pub fn delete(&self, id: u64) -> Result<(), AppError> {
        self.store.delete(id)?;
        log::info!("artifact {id} deleted");
        Ok(())
    }

    pub fn search_config(&self) -> &SearchConfig {
        self.search.config()
    }
}
