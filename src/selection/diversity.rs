//! Maximum Marginal Relevance selection.
//!
//! Picks greedily by `relevance - lambda * max_similarity_to_selected`, where
//! similarity is word-set Jaccard. Relevance is scaled by the candidate
//! maximum first, so lambda trades against a value in [0, 1] whether the
//! scores came from the lexical scorer or from cosine similarity.
//!
//! With a positive lambda, a candidate whose similarity to the selected set
//! reaches `duplicate_threshold` is dropped outright.

use std::collections::HashSet;

use crate::selection::ranking::tokenize;
use crate::types::ScoredChunk;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrParams {
    pub token_budget: usize,
    /// `None` means no cap beyond the budget.
    pub max_chunks: Option<usize>,
    pub lambda: f32,
    pub duplicate_threshold: f32,
}

pub fn word_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().map(|(_, word)| word).collect()
}

pub fn jaccard(lhs: &HashSet<String>, rhs: &HashSet<String>) -> f32 {
    if lhs.is_empty() || rhs.is_empty() {
        return 0.0;
    }
    let intersection = lhs.intersection(rhs).count();
    let union = lhs.len() + rhs.len() - intersection;
    intersection as f32 / union as f32
}

pub fn text_similarity(lhs: &str, rhs: &str) -> f32 {
    jaccard(&word_set(lhs), &word_set(rhs))
}

/// Mean Jaccard similarity over all unordered pairs; 0.0 below two texts.
pub fn average_pairwise_similarity<S: AsRef<str>>(texts: &[S]) -> f32 {
    let sets: Vec<HashSet<String>> = texts.iter().map(|t| word_set(t.as_ref())).collect();
    let mut total = 0.0_f32;
    let mut pairs = 0usize;
    for (i, lhs) in sets.iter().enumerate() {
        for rhs in &sets[i + 1..] {
            total += jaccard(lhs, rhs);
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f32
    }
}

/// Greedy MMR over candidates sorted by relevance (descending).
///
/// Only candidates that fit the remaining budget and are not near-duplicates
/// of an earlier pick are eligible. Ties keep the earlier (more relevant)
/// candidate. Each candidate is picked at most once.
pub fn select_mmr(candidates: &[ScoredChunk], params: MmrParams) -> Vec<ScoredChunk> {
    let lambda = if params.lambda.is_finite() {
        params.lambda.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let max_chunks = params.max_chunks.unwrap_or(candidates.len());
    let skip_duplicates = lambda > 0.0 && params.duplicate_threshold.is_finite();

    let max_relevance = candidates
        .iter()
        .map(|c| c.relevance)
        .fold(0.0_f32, f32::max);
    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| {
            if max_relevance > 0.0 {
                c.relevance / max_relevance
            } else {
                0.0
            }
        })
        .collect();
    let sets: Vec<HashSet<String>> = candidates.iter().map(|c| word_set(&c.chunk.text)).collect();

    // Similarity of each candidate to its nearest selected chunk.
    let mut redundancy = vec![0.0_f32; candidates.len()];
    let mut taken = vec![false; candidates.len()];
    let mut remaining = params.token_budget;
    let mut picks: Vec<usize> = Vec::new();

    while picks.len() < max_chunks {
        let mut best: Option<(usize, f32)> = None;
        for (pos, candidate) in candidates.iter().enumerate() {
            if taken[pos] || candidate.token_estimate > remaining {
                continue;
            }
            if skip_duplicates
                && !picks.is_empty()
                && redundancy[pos] >= params.duplicate_threshold
            {
                continue;
            }
            let score = relevance[pos] - lambda * redundancy[pos];
            if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
                best = Some((pos, score));
            }
        }
        let Some((pick, _)) = best else {
            break;
        };

        taken[pick] = true;
        remaining -= candidates[pick].token_estimate;
        picks.push(pick);

        for (pos, set) in sets.iter().enumerate() {
            if !taken[pos] {
                redundancy[pos] = redundancy[pos].max(jaccard(set, &sets[pick]));
            }
        }
    }

    picks.into_iter().map(|pos| candidates[pos].clone()).collect()
}
