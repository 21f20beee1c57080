//! Merging of the vector and lexical result streams.
//!
//! Vector matches always come first, in their score order, followed by
//! lexical matches in store order. An id present in both streams keeps its
//! first (vector) occurrence and score; the lexical duplicate is dropped.

use std::collections::HashSet;

use crate::artifacts::{Artifact, ScoredArtifact, SearchResult};

/// Similarity reported for lexical-only matches.
pub const LEXICAL_SIMILARITY: f32 = 0.0;

/// Concatenate vector then lexical results and drop repeated ids.
///
/// No truncation happens here: both queries already respected the overall limit.
pub fn merge(vector: Vec<ScoredArtifact>, lexical: Vec<Artifact>) -> Vec<SearchResult> {
    let mut seen = HashSet::with_capacity(vector.len() + lexical.len());

    let vector = vector
        .into_iter()
        .map(|scored| SearchResult::from_artifact(scored.artifact, scored.score));
    let lexical = lexical
        .into_iter()
        .map(|artifact| SearchResult::from_artifact(artifact, LEXICAL_SIMILARITY));

    vector
        .chain(lexical)
        .filter(|result| seen.insert(result.id))
        .collect()
}
