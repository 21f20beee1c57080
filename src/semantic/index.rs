//! Dot-product similarity scoring over stored artifact embeddings.
//!
//! Scores are raw dot products: vectors are not re-normalized, so the score
//! is exactly what the provider's vectors produce.

use std::cmp::Ordering;

use crate::artifacts::{Artifact, ScoredArtifact};

/// Dot product of two equal-length vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Score `candidates` against `query` and keep the best `limit`.
///
/// Only candidates scoring strictly above `threshold` are eligible. Results
/// are ordered by score descending; equal scores fall back to id ascending.
/// Candidates whose embedding length differs from the query are skipped.
pub fn rank_by_similarity<'a, I>(
    query: &[f32],
    candidates: I,
    threshold: f32,
    limit: usize,
) -> Vec<ScoredArtifact>
where
    I: IntoIterator<Item = &'a Artifact>,
{
    let mut skipped = 0usize;

    let mut results: Vec<ScoredArtifact> = candidates
        .into_iter()
        .filter(|artifact| {
            let comparable = artifact.embedding.len() == query.len();
            if !comparable {
                skipped += 1;
            }
            comparable
        })
        .filter_map(|artifact| {
            let score = dot_product(query, &artifact.embedding);
            (score > threshold).then(|| ScoredArtifact {
                artifact: artifact.clone(),
                score,
            })
        })
        .collect();

    if skipped > 0 {
        log::warn!(
            "skipped {skipped} artifacts whose embedding dimensions differ from the query ({})",
            query.len()
        );
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.artifact.id.cmp(&b.artifact.id))
    });
    results.truncate(limit);

    results
}
