//! Relevance ranking of chunks against a query.
//!
//! Two interchangeable scoring strategies:
//!
//! - **Lexical** ([`rank_lexical`]): whitespace-split the query, discard
//!   terms of length ≤ 3, and sum word-boundary occurrence counts of the
//!   remaining terms in each chunk.
//! - **Embedding** ([`rank_embedding`]): cosine similarity between a
//!   pre-computed query vector and each chunk's stored embedding.
//!
//! Both are pure functions of their inputs: sorted by score descending,
//! ties broken by insertion order, zero-score chunks excluded, output
//! truncated to `limit`. An empty query or an empty chunk set yields an
//! empty result, never an error.

use crate::models::{Chunk, ScoredChunk};
use crate::similarity::cosine_similarity;

/// Query terms shorter than this are discarded as stop words.
const MIN_TERM_LEN: usize = 4;

/// Score chunks by lexical term overlap and return the top `limit`.
pub fn rank_lexical(query: &str, chunks: &[Chunk], limit: usize) -> Vec<ScoredChunk> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let scored = chunks.iter().filter_map(|chunk| {
        let score = lexical_score(&terms, &chunk.text);
        (score > 0.0).then(|| ScoredChunk {
            chunk: chunk.clone(),
            score,
        })
    });
    top_k(scored, limit)
}

/// Score chunks by cosine similarity against `query_vec` and return the
/// top `limit`.
///
/// Chunks without a stored embedding are skipped. Non-positive
/// similarities count as no match, keeping scores non-negative.
pub fn rank_embedding(query_vec: &[f32], chunks: &[Chunk], limit: usize) -> Vec<ScoredChunk> {
    if query_vec.is_empty() {
        return Vec::new();
    }

    let scored = chunks.iter().filter_map(|chunk| {
        let vec = chunk.embedding.as_deref()?;
        let score = cosine_similarity(query_vec, vec) as f64;
        (score > 0.0).then(|| ScoredChunk {
            chunk: chunk.clone(),
            score,
        })
    });
    top_k(scored, limit)
}

/// Normalize a query into lowercase search terms, dropping stop words.
///
/// Tokens are trimmed of surrounding punctuation before the length check
/// so `"ratio,"` and `"ratio"` are the same term.
fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| t.len() >= MIN_TERM_LEN)
        .collect()
}

/// Sum of word-boundary occurrence counts of `terms` in `text`.
///
/// Word matching (rather than substring matching) is deliberate: a term
/// like `"cast"` does not count occurrences of `"forecast"`.
fn lexical_score(terms: &[String], text: &str) -> f64 {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let total: usize = terms
        .iter()
        .map(|term| words.iter().filter(|w| *w == term).count())
        .sum();
    total as f64
}

/// Stable sort by score descending and truncate.
///
/// The stable sort preserves insertion order among equal scores.
fn top_k(scored: impl Iterator<Item = ScoredChunk>, limit: usize) -> Vec<ScoredChunk> {
    let mut results: Vec<ScoredChunk> = scored.collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    results
}
