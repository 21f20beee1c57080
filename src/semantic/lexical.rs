//! Substring matching used as the lexical fallback.
//!
//! Matching is the plain `str::contains` of the store: case-sensitive, no
//! tokenization, no normalization. Lexical matches carry no ranking signal,
//! so they come back in store order.

use crate::artifacts::Artifact;

/// True when `query` occurs in the artifact's title or content.
pub fn is_match(artifact: &Artifact, query: &str) -> bool {
    artifact.title.contains(query) || artifact.content.contains(query)
}

/// First `limit` artifacts matching `query`, in the order given.
pub fn lexical_matches<'a, I>(query: &str, candidates: I, limit: usize) -> Vec<Artifact>
where
    I: IntoIterator<Item = &'a Artifact>,
{
    candidates
        .into_iter()
        .filter(|artifact| is_match(artifact, query))
        .take(limit)
        .cloned()
        .collect()
}
