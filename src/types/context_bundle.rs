use std::fmt;

use serde::{Deserialize, Serialize};

use crate::selection::budgeting::BudgetStrategy;
use crate::types::chunk::Chunk;

/// Caller-selected tier controlling how much of `max_tokens` goes to context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDepth {
    Minimal,
    #[default]
    Standard,
    Comprehensive,
}

impl ContextDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextDepth::Minimal => "minimal",
            ContextDepth::Standard => "standard",
            ContextDepth::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for ContextDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options. `None` fields fall back to the selector's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    pub context_depth: ContextDepth,
    pub max_tokens: usize,
    pub use_semantic_search: bool,
    pub diversity_weight: Option<f32>,
    pub min_relevance_score: Option<f32>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            context_depth: ContextDepth::Standard,
            max_tokens: 4000,
            use_semantic_search: true,
            diversity_weight: None,
            min_relevance_score: None,
        }
    }
}

impl SelectionOptions {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_depth(mut self, depth: ContextDepth) -> Self {
        self.context_depth = depth;
        self
    }

    pub fn with_diversity_weight(mut self, lambda: f32) -> Self {
        self.diversity_weight = Some(lambda);
        self
    }

    pub fn with_min_relevance_score(mut self, min_score: f32) -> Self {
        self.min_relevance_score = Some(min_score);
        self
    }

    pub fn lexical_only(mut self) -> Self {
        self.use_semantic_search = false;
        self
    }

    /// Reject contract violations before any work is done.
    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.max_tokens == 0 {
            return Err(SelectionError::InvalidBudget(self.max_tokens));
        }
        if let Some(lambda) = self.diversity_weight {
            if !(0.0..=1.0).contains(&lambda) {
                return Err(SelectionError::InvalidDiversityWeight(lambda));
            }
        }
        if let Some(min_score) = self.min_relevance_score {
            if !min_score.is_finite() || min_score < 0.0 {
                return Err(SelectionError::InvalidMinScore(min_score));
            }
        }
        Ok(())
    }
}

/// How the selected chunks were ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    Semantic,
    Lexical,
    /// Semantic ranking was attempted and failed; lexical scores were used.
    LexicalFallback,
    FallbackFirstChunks,
    None,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::Semantic => "semantic",
            SelectionMethod::Lexical => "lexical",
            SelectionMethod::LexicalFallback => "lexical_fallback",
            SelectionMethod::FallbackFirstChunks => "fallback_first_chunks",
            SelectionMethod::None => "none",
        }
    }

    /// Prefix used in composite strategy labels.
    pub fn label_prefix(&self) -> &'static str {
        match self {
            SelectionMethod::Semantic => "semantic",
            _ => "lexical",
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics describing the outcome of one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStats {
    pub original_count: usize,
    pub filtered_count: usize,
    pub selected_count: usize,
    /// Re-estimated from the returned texts, never carried over.
    pub total_tokens: usize,
    pub target_tokens: usize,
    pub avg_relevance: f32,
    pub method: SelectionMethod,
    pub emergency_compressed: bool,
}

/// The final result of a selection. Order is relevance/diversity order; sort
/// by `Chunk::id` for citation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selected_chunks: Vec<Chunk>,
    pub strategy_used: String,
    pub strategy: Option<BudgetStrategy>,
    pub stats: SelectionStats,
}

impl SelectionResult {
    pub const EMPTY_INPUT_LABEL: &'static str = "empty_input";
    pub const FALLBACK_LABEL: &'static str = "fallback_first_chunks";

    pub fn empty() -> Self {
        Self {
            selected_chunks: Vec::new(),
            strategy_used: Self::EMPTY_INPUT_LABEL.to_string(),
            strategy: None,
            stats: SelectionStats {
                original_count: 0,
                filtered_count: 0,
                selected_count: 0,
                total_tokens: 0,
                target_tokens: 0,
                avg_relevance: 0.0,
                method: SelectionMethod::None,
                emergency_compressed: false,
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.stats.method == SelectionMethod::FallbackFirstChunks
    }

    /// Selected chunks re-sorted into document order.
    pub fn in_document_order(&self) -> Vec<Chunk> {
        let mut chunks = self.selected_chunks.clone();
        chunks.sort_by_key(|chunk| chunk.id);
        chunks
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Invalid budget: {0}")]
    InvalidBudget(usize),

    #[error("Invalid diversity weight: {0} (expected 0.0..=1.0)")]
    InvalidDiversityWeight(f32),

    #[error("Invalid minimum relevance score: {0}")]
    InvalidMinScore(f32),
}
