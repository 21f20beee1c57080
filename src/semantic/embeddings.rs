//! Embedding client contract and the local fastembed provider.
//!
//! An [`Embedder`] maps one text to one vector and issues exactly one provider
//! request per call. Failures are never papered over with a zero vector or a
//! cached result: every error reaches the caller, which aborts the operation
//! that needed the embedding.

#[cfg(feature = "local-embeddings")]
use std::path::PathBuf;
#[cfg(feature = "local-embeddings")]
use std::sync::Mutex;

/// Error type for embedding operations.
///
/// Callers treat every variant uniformly as "embedding unavailable".
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding payload: {0}")]
    Malformed(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding model initialization failed: {0}")]
    InitFailed(String),

    #[error("invalid embedding model: {0}")]
    InvalidModel(String),
}

/// Maps a text string to a fixed-length vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Expected dimensionality, when the provider knows it up front.
    fn dimensions(&self) -> Option<usize>;
}

/// Reject payloads that cannot be a usable embedding.
///
/// An empty vector, a non-finite component, or a length different from
/// `expected` all count as malformed.
pub fn validate_embedding(
    embedding: &[f32],
    expected: Option<usize>,
) -> Result<(), EmbeddingError> {
    if embedding.is_empty() {
        return Err(EmbeddingError::Malformed("empty vector".to_string()));
    }

    if let Some(expected) = expected {
        if embedding.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                got: embedding.len(),
            });
        }
    }

    if let Some(idx) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(EmbeddingError::Malformed(format!(
            "non-finite value at index {idx}"
        )));
    }

    Ok(())
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
#[cfg(feature = "local-embeddings")]
pub struct LocalEmbedder {
    model: Mutex<fastembed::TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

#[cfg(feature = "local-embeddings")]
impl LocalEmbedder {
    /// Load (downloading on first use) a local model.
    ///
    /// Models are cached in the `models/` subdirectory of `cache_dir`.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(model_name)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        let options = fastembed::InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let dimensions = Self::probe_dimensions(&mut model)?;
        log::info!("loaded local embedding model '{model_name}' ({dimensions} dims)");

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5",
                name
            ))),
        }
    }

    /// Probe the model to determine embedding dimensions.
    fn probe_dimensions(model: &mut fastembed::TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }
}

#[cfg(feature = "local-embeddings")]
impl Embedder for LocalEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::Request(format!("Failed to acquire model lock: {}", e))
        })?;

        let embedding = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Request(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Malformed("No embedding returned".to_string()))?;

        validate_embedding(&embedding, Some(self.dimensions))?;
        Ok(embedding)
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_finite_vector() {
        assert!(validate_embedding(&[0.1, -0.2, 0.3], Some(3)).is_ok());
        assert!(validate_embedding(&[0.1, -0.2, 0.3], None).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let result = validate_embedding(&[], None);
        assert!(matches!(result, Err(EmbeddingError::Malformed(_))));
    }

    #[test]
    fn test_validate_rejects_wrong_dimensions() {
        let result = validate_embedding(&[0.1, 0.2], Some(3));
        assert!(matches!(
            result,
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn test_validate_rejects_nan_and_infinity() {
        assert!(matches!(
            validate_embedding(&[0.1, f32::NAN], None),
            Err(EmbeddingError::Malformed(_))
        ));
        assert!(matches!(
            validate_embedding(&[f32::INFINITY], None),
            Err(EmbeddingError::Malformed(_))
        ));
    }

    #[cfg(feature = "local-embeddings")]
    #[test]
    fn test_invalid_model_name() {
        let temp_dir = std::env::temp_dir().join("semmark-embed-invalid");
        let result = LocalEmbedder::new("nonexistent-model", temp_dir);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
    }

    #[cfg(feature = "local-embeddings")]
    #[test]
    #[ignore = "requires model download"]
    fn test_local_embedding_generation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let model = LocalEmbedder::new("all-MiniLM-L6-v2", temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(model.name(), "all-MiniLM-L6-v2");

        let embedding = model.embed("Hello, world!").unwrap();
        assert_eq!(embedding.len(), 384);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }
}
