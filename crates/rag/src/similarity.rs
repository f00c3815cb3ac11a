//! Scoring functions shared by semantic and hybrid search.

use std::collections::HashSet;

/// Minimum character length for a query term to count toward keyword overlap.
const MIN_TERM_CHARS: usize = 3;

/// Cosine similarity between two vectors.
///
/// Returns `0.0` for empty or mismatched vectors and for zero-norm inputs,
/// never NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot_product / (norm_a * norm_b);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Whether a stored embedding can be compared against the query embedding.
pub fn is_comparable(query: &[f32], candidate: &[f32]) -> bool {
    !candidate.is_empty() && candidate.len() == query.len()
}

/// Lowercased, de-duplicated query terms of at least three characters.
///
/// Leading and trailing punctuation is stripped so `"auth?"` matches `auth`.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

/// Fraction of `terms` that occur as substrings of `content` (case-insensitive).
///
/// `terms` must already be lowercased (see [`query_terms`]). No terms means `0.0`.
pub fn keyword_score(terms: &[String], content: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }

    let haystack = content.to_lowercase();
    let matched = terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .count();

    matched as f32 / terms.len() as f32
}

/// `weight * semantic + (1 - weight) * keyword`.
pub fn blend(semantic: f32, keyword: f32, semantic_weight: f32) -> f32 {
    semantic_weight * semantic + (1.0 - semantic_weight) * keyword
}
