use crate::artifacts::StoreError;
use crate::semantic::{EmbeddingError, SearchError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbeddingError),

    #[error("artifact {0} not found")]
    NotFound(u64),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(id),
            err => AppError::Store(err),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Embedding(err) => err.into(),
            SearchError::Store(err) => err.into(),
        }
    }
}

impl AppError {
    /// Whether the same request may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::EmbeddingUnavailable(_))
    }
}
