//! Test doubles for the embedding provider and the record store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::app::AppService;
use crate::artifacts::{
    Artifact, ArtifactStore, BackendCsv, NewArtifact, ScoredArtifact, StoreError,
};
use crate::config::SearchConfig;
use crate::semantic::{Embedder, EmbeddingError};

/// Embedder answering from a fixed text -> vector table.
///
/// Texts missing from the table embed to `fallback`.
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
    failing: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl TableEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            table: HashMap::new(),
            fallback,
            failing: AtomicBool::new(false),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn with(mut self, text: &str, embedding: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), embedding);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Embedder for TableEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.lock().unwrap().push(text.to_string());

        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Status {
                status: 429,
                body: "rate limited".to_string(),
            });
        }

        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.fallback.len())
    }
}

#[derive(Debug, Default, Clone)]
pub struct StoreCalls {
    pub inserts: Vec<NewArtifact>,
    pub replaces: Vec<(u64, NewArtifact)>,
    pub similarity: Vec<(Vec<f32>, f32, usize)>,
    pub lexical: Vec<(String, usize)>,
}

/// Store wrapper recording every call before delegating to a CSV store.
///
/// Similarity and lexical answers can be scripted instead of computed.
pub struct RecordingStore {
    inner: BackendCsv,
    calls: Mutex<StoreCalls>,
    vector_script: Option<Vec<ScoredArtifact>>,
    lexical_script: Option<Vec<Artifact>>,
    _tmp: tempfile::TempDir,
}

impl RecordingStore {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let inner = BackendCsv::load(tmp.path().to_str().unwrap()).expect("failed to load store");

        Self {
            inner,
            calls: Mutex::new(StoreCalls::default()),
            vector_script: None,
            lexical_script: None,
            _tmp: tmp,
        }
    }

    pub fn scripted(vector: Vec<ScoredArtifact>, lexical: Vec<Artifact>) -> Self {
        Self {
            vector_script: Some(vector),
            lexical_script: Some(lexical),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> StoreCalls {
        self.calls.lock().unwrap().clone()
    }
}

impl ArtifactStore for RecordingStore {
    fn insert(&self, new: NewArtifact) -> Result<Artifact, StoreError> {
        self.calls.lock().unwrap().inserts.push(new.clone());
        self.inner.insert(new)
    }

    fn replace(&self, id: u64, new: NewArtifact) -> Result<Artifact, StoreError> {
        self.calls.lock().unwrap().replaces.push((id, new.clone()));
        self.inner.replace(id, new)
    }

    fn similarity_query(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredArtifact>, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .similarity
            .push((query.to_vec(), threshold, limit));

        match &self.vector_script {
            Some(script) => Ok(script.iter().take(limit).cloned().collect()),
            None => self.inner.similarity_query(query, threshold, limit),
        }
    }

    fn lexical_query(&self, text: &str, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .lexical
            .push((text.to_string(), limit));

        match &self.lexical_script {
            Some(script) => Ok(script.iter().take(limit).cloned().collect()),
            None => self.inner.lexical_query(text, limit),
        }
    }

    fn get(&self, id: u64) -> Result<Option<Artifact>, StoreError> {
        self.inner.get(id)
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    fn list_all(&self) -> Result<Vec<Artifact>, StoreError> {
        self.inner.list_all()
    }

    fn dimensions(&self) -> Result<Option<usize>, StoreError> {
        self.inner.dimensions()
    }
}

pub fn artifact(id: u64, title: &str, content: &str) -> Artifact {
    Artifact {
        id,
        url: format!("https://example.com/{id}"),
        title: title.to_string(),
        content: content.to_string(),
        embedding: vec![1.0, 0.0, 0.0],
        created_at: chrono::Utc::now(),
    }
}

pub fn scored(id: u64, score: f32) -> ScoredArtifact {
    ScoredArtifact {
        artifact: artifact(id, &format!("title {id}"), &format!("content {id}")),
        score,
    }
}

pub fn app_with(
    store: Arc<RecordingStore>,
    embedder: Arc<TableEmbedder>,
) -> AppService {
    AppService::new(store, embedder, SearchConfig::default())
}
