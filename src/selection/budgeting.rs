use std::fmt;

use serde::{Deserialize, Serialize};

use crate::selection::TokenCounter;
use crate::types::{Chunk, ScoredChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStrategy {
    Full,
    Optimized,
    Compressed,
    Summarized,
}

impl BudgetStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStrategy::Full => "full",
            BudgetStrategy::Optimized => "optimized",
            BudgetStrategy::Compressed => "compressed",
            BudgetStrategy::Summarized => "summarized",
        }
    }

    /// Candidates are compressed before diversity selection.
    pub fn compresses(&self) -> bool {
        matches!(self, BudgetStrategy::Compressed | BudgetStrategy::Summarized)
    }

    /// Candidates are cut to their leading sentences before compression.
    pub fn summarizes(&self) -> bool {
        matches!(self, BudgetStrategy::Summarized)
    }
}

impl fmt::Display for BudgetStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the strategy table. Tiers are checked in order; the first whose
/// threshold is at least the candidate total applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTier {
    /// `None` matches any total (the catch-all tier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_tokens: Option<usize>,
    pub strategy: BudgetStrategy,
    /// `None` means every candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunks: Option<usize>,
    /// `None` means the candidate total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub strategy: BudgetStrategy,
    pub max_chunks: usize,
    pub max_tokens: usize,
    pub total_tokens: usize,
}

/// Pure function of the candidate token total and count.
pub fn plan_for_total(tiers: &[StrategyTier], total_tokens: usize, chunk_count: usize) -> StrategyPlan {
    let tier = tiers
        .iter()
        .find(|tier| tier.threshold_tokens.map_or(true, |t| total_tokens <= t))
        .or_else(|| tiers.last());

    match tier {
        Some(tier) => StrategyPlan {
            strategy: tier.strategy,
            max_chunks: tier.max_chunks.map_or(chunk_count, |m| m.min(chunk_count)),
            max_tokens: tier.max_tokens.unwrap_or(total_tokens),
            total_tokens,
        },
        None => StrategyPlan {
            strategy: BudgetStrategy::Full,
            max_chunks: chunk_count,
            max_tokens: total_tokens,
            total_tokens,
        },
    }
}

pub fn choose_strategy(tiers: &[StrategyTier], candidates: &[ScoredChunk]) -> StrategyPlan {
    let total_tokens = candidates.iter().map(|c| c.token_estimate).sum();
    plan_for_total(tiers, total_tokens, candidates.len())
}

pub struct BudgetResult {
    pub selected: Vec<Chunk>,
    pub tokens_used: usize,
    pub chunks_excluded_by_budget: usize,
    /// A lone chunk had to be cut to fit.
    pub truncated: bool,
}

/// Keep chunks, in order, while they fit `budget`. If none fit, the first
/// chunk is hard-truncated to the budget so the result is never empty when
/// the input is not.
pub fn apply_budget(chunks: Vec<Chunk>, budget: usize, counter: &impl TokenCounter) -> BudgetResult {
    let mut selected = Vec::new();
    let mut tokens_used = 0;
    let mut chunks_excluded_by_budget = 0;
    let mut first_excluded: Option<Chunk> = None;

    for chunk in chunks {
        let tokens = counter.count_tokens(&chunk.text);
        if tokens_used + tokens <= budget {
            tokens_used += tokens;
            selected.push(chunk);
        } else {
            chunks_excluded_by_budget += 1;
            first_excluded.get_or_insert(chunk);
        }
    }

    let mut truncated = false;
    if selected.is_empty() {
        if let Some(chunk) = first_excluded.filter(|_| budget > 0) {
            let max_chars = counter.max_chars_for(budget);
            let text: String = chunk.text.chars().take(max_chars).collect();
            tokens_used = counter.count_tokens(&text);
            selected.push(chunk.with_text(text));
            chunks_excluded_by_budget -= 1;
            truncated = true;
        }
    }

    BudgetResult {
        selected,
        tokens_used,
        chunks_excluded_by_budget,
        truncated,
    }
}
