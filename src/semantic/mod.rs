//! Hybrid retrieval over stored artifacts.
//!
//! Dense-vector similarity is the primary signal; substring matching
//! backfills when the vector query under-returns, and the two streams are
//! merged into one deduplicated list.
//!
//! # Architecture
//!
//! - `embeddings`: the `Embedder` contract plus a local fastembed provider
//! - `gemini`: HTTP provider for the Gemini embedding API
//! - `preprocess`: text an artifact is embedded from
//! - `index`: dot-product scoring with a strict threshold
//! - `lexical`: substring fallback
//! - `hybrid`: merge and dedupe of both streams
//! - `service`: the search flow tying the above together

pub mod embeddings;
pub mod gemini;
pub mod hybrid;
pub mod index;
pub mod lexical;
mod preprocess;
mod service;

#[cfg(feature = "local-embeddings")]
pub use embeddings::LocalEmbedder;
pub use embeddings::{Embedder, EmbeddingError};
pub use gemini::GeminiEmbedder;
pub use index::rank_by_similarity;
pub use preprocess::embedding_text;
pub use service::{embed_for_store, HybridSearch, SearchError};
