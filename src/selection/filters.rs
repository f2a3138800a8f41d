use serde::{Deserialize, Serialize};

use crate::config::PreFilterConfig;
use crate::selection::ranking::{score_all, LexicalScorer};
use crate::selection::TokenCounter;
use crate::types::{sort_by_relevance, Chunk, ScoredChunk};

/// min(max_candidates, multiplier × chunk count)
pub fn default_max_candidates(config: &PreFilterConfig, chunk_count: usize) -> usize {
    config
        .max_candidates
        .min(config.candidate_multiplier.saturating_mul(chunk_count))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreFilterStats {
    pub scored: usize,
    pub below_min_score: usize,
    pub truncated: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct PreFilterOutcome {
    pub candidates: Vec<ScoredChunk>,
    pub stats: PreFilterStats,
}

/// Score all chunks lexically, drop those under `min_score`, keep the best
/// `max_candidates`. An empty outcome is valid and handled by the caller.
pub fn pre_filter(
    scorer: &LexicalScorer,
    counter: &impl TokenCounter,
    question: &str,
    chunks: &[Chunk],
    max_candidates: usize,
    min_score: f32,
) -> PreFilterOutcome {
    let scored = score_all(scorer, question, chunks, counter);
    let total = scored.len();

    let mut candidates: Vec<ScoredChunk> = scored
        .into_iter()
        .filter(|candidate| candidate.relevance >= min_score)
        .collect();
    let below_min_score = total - candidates.len();

    sort_by_relevance(&mut candidates);

    debug_assert!(candidates.windows(2).all(|w| {
        w[0].relevance > w[1].relevance
            || (w[0].relevance == w[1].relevance && w[0].chunk.id <= w[1].chunk.id)
    }));

    let before_truncation = candidates.len();
    candidates.truncate(max_candidates);

    let stats = PreFilterStats {
        scored: total,
        below_min_score,
        truncated: before_truncation - candidates.len(),
        kept: candidates.len(),
    };

    PreFilterOutcome { candidates, stats }
}
