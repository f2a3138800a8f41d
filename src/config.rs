//! Selector configuration.
//!
//! Every field has an explicit default, so an empty TOML document yields the
//! stock policy. Tuning (stop words, strategy tiers, decay) needs no rebuild.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::selection::budgeting::{BudgetStrategy, StrategyTier};
use crate::types::ContextDepth;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub tokens: TokenConfig,
    pub lexical: LexicalConfig,
    pub cache: CacheConfig,
    pub prefilter: PreFilterConfig,
    pub semantic: SemanticConfig,
    pub diversity: DiversityConfig,
    pub strategies: Vec<StrategyTier>,
    pub compression: CompressionConfig,
    pub depth: DepthConfig,
    pub fallback_chunks: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            tokens: TokenConfig::default(),
            lexical: LexicalConfig::default(),
            cache: CacheConfig::default(),
            prefilter: PreFilterConfig::default(),
            semantic: SemanticConfig::default(),
            diversity: DiversityConfig::default(),
            strategies: default_strategies(),
            compression: CompressionConfig::default(),
            depth: DepthConfig::default(),
            fallback_chunks: 3,
        }
    }
}

impl SelectorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: SelectorConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tokens.chars_per_token.is_finite() && self.tokens.chars_per_token > 0.0) {
            return Err(invalid("tokens.chars_per_token must be positive"));
        }
        if self.cache.capacity == 0 {
            return Err(invalid("cache.capacity must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.diversity.lambda) {
            return Err(invalid("diversity.lambda must be within 0.0..=1.0"));
        }
        if !(0.0..=1.0).contains(&self.diversity.duplicate_threshold) {
            return Err(invalid(
                "diversity.duplicate_threshold must be within 0.0..=1.0",
            ));
        }
        if self.prefilter.max_candidates == 0 {
            return Err(invalid("prefilter.max_candidates must be greater than 0"));
        }
        if self.lexical.position_decay < 0.0 {
            return Err(invalid("lexical.position_decay must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.compression.boundary_ratio) {
            return Err(invalid("compression.boundary_ratio must be within 0.0..=1.0"));
        }
        if !(self.compression.emergency_ratio > 0.0 && self.compression.emergency_ratio <= 1.0) {
            return Err(invalid("compression.emergency_ratio must be within (0.0, 1.0]"));
        }
        if self.compression.budget_slack < 0.0 {
            return Err(invalid("compression.budget_slack must not be negative"));
        }
        for (depth, fraction) in [
            (ContextDepth::Minimal, self.depth.minimal),
            (ContextDepth::Standard, self.depth.standard),
            (ContextDepth::Comprehensive, self.depth.comprehensive),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(invalid(format!("depth.{depth} must be within (0.0, 1.0]")));
            }
        }
        self.validate_strategies()
    }

    // Tiers must ascend and end with an unbounded catch-all.
    fn validate_strategies(&self) -> Result<(), ConfigError> {
        let Some(last) = self.strategies.last() else {
            return Err(invalid("at least one strategy tier is required"));
        };
        if last.threshold_tokens.is_some() {
            return Err(invalid("the last strategy tier must omit threshold_tokens"));
        }
        let bounded: Vec<usize> = self
            .strategies
            .iter()
            .take(self.strategies.len() - 1)
            .map(|tier| {
                tier.threshold_tokens
                    .ok_or_else(|| invalid("only the last strategy tier may omit threshold_tokens"))
            })
            .collect::<Result<_, _>>()?;
        if bounded.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("strategy thresholds must be strictly ascending"));
        }
        if self.strategies.iter().any(|tier| tier.max_chunks == Some(0)) {
            return Err(invalid("strategy max_chunks must be greater than 0"));
        }
        Ok(())
    }

    pub fn depth_fraction(&self, depth: ContextDepth) -> f32 {
        match depth {
            ContextDepth::Minimal => self.depth.minimal,
            ContextDepth::Standard => self.depth.standard,
            ContextDepth::Comprehensive => self.depth.comprehensive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub chars_per_token: f32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { chars_per_token: 4.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    /// Question words must be strictly longer than this many characters.
    pub min_word_chars: usize,
    pub stop_words: Vec<String>,
    pub phrase_bonus: f32,
    pub occurrence_base: f32,
    pub position_weight: f32,
    pub short_chunk_chars: usize,
    pub short_chunk_factor: f32,
    pub long_chunk_chars: usize,
    pub long_chunk_factor: f32,
    pub domain_bonus: f32,
    pub domain_terms: Vec<String>,
    /// Treat any token containing a digit as a domain term.
    pub domain_numeric: bool,
    /// Score multiplier lost per chunk index. 0.0 disables the decay.
    pub position_decay: f32,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            min_word_chars: 2,
            stop_words: to_strings(DEFAULT_STOP_WORDS),
            phrase_bonus: 2.0,
            occurrence_base: 0.5,
            position_weight: 0.3,
            short_chunk_chars: 100,
            short_chunk_factor: 0.5,
            long_chunk_chars: 2000,
            long_chunk_factor: 0.8,
            domain_bonus: 0.5,
            domain_terms: to_strings(DEFAULT_DOMAIN_TERMS),
            domain_numeric: true,
            position_decay: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub question_prefix_chars: usize,
    pub chunk_prefix_chars: usize,
    pub selection_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            question_prefix_chars: 100,
            chunk_prefix_chars: 200,
            selection_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreFilterConfig {
    pub max_candidates: usize,
    pub candidate_multiplier: usize,
    pub min_score: f32,
}

impl Default for PreFilterConfig {
    fn default() -> Self {
        Self {
            max_candidates: 30,
            candidate_multiplier: 2,
            min_score: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub timeout_ms: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    pub lambda: f32,
    /// Jaccard similarity to the selected set at which a candidate counts as a
    /// near-duplicate and is skipped. Ignored when lambda is 0.
    pub duplicate_threshold: f32,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            lambda: 0.3,
            duplicate_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub min_chunk_chars: usize,
    /// A sentence boundary is used only if it falls past this share of the cut.
    pub boundary_ratio: f32,
    pub ellipsis: String,
    pub summary_sentences: usize,
    pub emergency_ratio: f32,
    pub budget_slack: f32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_chunk_chars: 100,
            boundary_ratio: 0.7,
            ellipsis: "...".to_string(),
            summary_sentences: 3,
            emergency_ratio: 0.8,
            budget_slack: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    pub minimal: f32,
    pub standard: f32,
    pub comprehensive: f32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            minimal: 0.5,
            standard: 0.8,
            comprehensive: 1.0,
        }
    }
}

pub fn default_strategies() -> Vec<StrategyTier> {
    vec![
        StrategyTier {
            threshold_tokens: Some(2500),
            strategy: BudgetStrategy::Full,
            max_chunks: None,
            max_tokens: None,
        },
        StrategyTier {
            threshold_tokens: Some(4000),
            strategy: BudgetStrategy::Optimized,
            max_chunks: Some(12),
            max_tokens: Some(3000),
        },
        StrategyTier {
            threshold_tokens: Some(8000),
            strategy: BudgetStrategy::Compressed,
            max_chunks: Some(8),
            max_tokens: Some(2500),
        },
        StrategyTier {
            threshold_tokens: None,
            strategy: BudgetStrategy::Summarized,
            max_chunks: Some(5),
            max_tokens: Some(2000),
        },
    ]
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "may", "who", "why", "what", "when",
    "where", "which", "this", "that", "these", "those", "with", "from", "into", "about", "does",
    "did", "been", "were", "will", "would", "could", "should", "there", "their", "them", "they",
    "than", "then", "also", "some", "such", "only", "very", "just", "more", "most", "other",
    "please", "tell", "give", "describe",
];

const DEFAULT_DOMAIN_TERMS: &[&str] = &[
    "formula", "equation", "theorem", "proof", "definition", "algorithm", "function", "variable",
    "percent", "percentage", "ratio", "rate", "probability", "average", "mean", "median",
    "derivative", "integral", "matrix", "vector", "coefficient", "parameter", "value", "unit",
    "calculate", "calculation", "measure", "measurement", "table", "figure", "chart", "graph",
];
