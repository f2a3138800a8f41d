use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{BoundedCache, Cache, CacheKey};
use crate::config::{LexicalConfig, SelectorConfig};
use crate::selection::semantic::EmbeddingError;
use crate::selection::TokenCounter;
use crate::types::{sort_by_relevance, Chunk, ScoredChunk, SelectionMethod};

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Embedding provider failed: {0}")]
    Provider(#[from] EmbeddingError),

    #[error("Embedding request timed out after {0} ms")]
    Timeout(u64),

    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// A ranking capability over pre-filtered candidates.
///
/// Implementations return the candidates re-scored and sorted by
/// (relevance desc, id asc).
#[async_trait]
pub trait Scorer: Send + Sync {
    fn method(&self) -> SelectionMethod;

    async fn rank(
        &self,
        question: &str,
        candidates: Vec<ScoredChunk>,
    ) -> Result<Vec<ScoredChunk>, ScoringError>;
}

/// Lowercased alphanumeric words with their character offsets.
pub(crate) fn tokenize(text: &str) -> Vec<(usize, String)> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    for (pos, c) in text.chars().enumerate() {
        if c.is_alphanumeric() {
            if current.is_empty() {
                start = pos;
            }
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            words.push((start, std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        words.push((start, current));
    }
    words
}

/// Significant words and phrases extracted once per question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionTerms {
    /// Unique significant words, in question order.
    pub words: Vec<String>,
    /// Unique 2- and 3-word question windows that start and end on a
    /// significant word.
    pub phrases: Vec<String>,
    pub has_domain_term: bool,
}

impl QuestionTerms {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Heuristic textual-overlap scorer. Never fails; the worst case is 0.0.
pub struct LexicalScorer {
    config: LexicalConfig,
    stop_words: HashSet<String>,
    domain_terms: HashSet<String>,
    cache: Arc<dyn Cache<f32>>,
    /// Scopes score keys so scorers with different configs can share a cache.
    config_fingerprint: String,
    question_prefix_chars: usize,
    chunk_prefix_chars: usize,
}

impl LexicalScorer {
    pub fn from_config(config: &SelectorConfig) -> Self {
        let cache: Arc<dyn Cache<f32>> = Arc::new(BoundedCache::new(config.cache.capacity));
        Self::new(config.lexical.clone(), cache)
            .with_prefix_bounds(config.cache.question_prefix_chars, config.cache.chunk_prefix_chars)
    }

    pub fn new(config: LexicalConfig, cache: Arc<dyn Cache<f32>>) -> Self {
        let stop_words = config.stop_words.iter().map(|w| w.to_lowercase()).collect();
        let domain_terms = config.domain_terms.iter().map(|w| w.to_lowercase()).collect();
        let config_fingerprint = CacheKey::fingerprint(&config)
            .map(|key| key.as_str().to_owned())
            .unwrap_or_default();
        Self {
            config,
            stop_words,
            domain_terms,
            cache,
            config_fingerprint,
            question_prefix_chars: 100,
            chunk_prefix_chars: 200,
        }
    }

    pub fn with_prefix_bounds(mut self, question_chars: usize, chunk_chars: usize) -> Self {
        self.question_prefix_chars = question_chars;
        self.chunk_prefix_chars = chunk_chars;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache<f32>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<dyn Cache<f32>> {
        &self.cache
    }

    pub fn question_terms(&self, question: &str) -> QuestionTerms {
        let tokens = tokenize(question);
        let has_domain_term = tokens.iter().any(|(_, w)| self.is_domain_term(w));

        let words_in_order: Vec<String> = tokens.into_iter().map(|(_, w)| w).collect();
        let significant: Vec<bool> = words_in_order
            .iter()
            .map(|w| self.is_significant(w))
            .collect();

        let mut words = Vec::new();
        for (word, keep) in words_in_order.iter().zip(&significant) {
            if *keep && !words.contains(word) {
                words.push(word.clone());
            }
        }

        // Windows over the question as written, so "rate of mitosis" stays
        // literal. Both edge words must be significant.
        let mut phrases = Vec::new();
        for size in [2, 3] {
            for start in 0..words_in_order.len().saturating_sub(size - 1) {
                let end = start + size - 1;
                if !(significant[start] && significant[end]) {
                    continue;
                }
                let phrase = words_in_order[start..=end].join(" ");
                if !phrases.contains(&phrase) {
                    phrases.push(phrase);
                }
            }
        }

        QuestionTerms {
            words,
            phrases,
            has_domain_term,
        }
    }

    /// Full score of one chunk, including the positional decay.
    pub fn score(&self, question: &str, chunk: &str, chunk_index: usize) -> f32 {
        let terms = self.question_terms(question);
        self.score_with_terms(&terms, question, chunk, chunk_index)
    }

    pub fn score_with_terms(
        &self,
        terms: &QuestionTerms,
        question: &str,
        chunk: &str,
        chunk_index: usize,
    ) -> f32 {
        if terms.is_empty() {
            return 0.0;
        }
        let key = CacheKey::for_score(
            &self.config_fingerprint,
            question,
            chunk,
            self.question_prefix_chars,
            self.chunk_prefix_chars,
        );
        let content_score = match self.cache.get(&key) {
            Some(score) => score,
            None => {
                let score = self.content_score(terms, chunk);
                self.cache.insert(key, score);
                score
            }
        };
        let score = content_score * self.position_factor(chunk_index);
        if score.is_finite() {
            score.max(0.0)
        } else {
            0.0
        }
    }

    /// Multiplier favouring earlier chunks. A decay of 0.0 disables it.
    pub fn position_factor(&self, chunk_index: usize) -> f32 {
        (1.0 - chunk_index as f32 * self.config.position_decay).max(0.0)
    }

    fn content_score(&self, terms: &QuestionTerms, chunk: &str) -> f32 {
        let cfg = &self.config;
        let chunk_words = tokenize(chunk);
        let chunk_chars = chunk.chars().count();
        if chunk_words.is_empty() || chunk_chars == 0 {
            return 0.0;
        }

        let normalized = format!(
            " {} ",
            chunk_words.iter().map(|(_, w)| w.as_str()).collect::<Vec<_>>().join(" ")
        );
        let phrase_hits = terms
            .phrases
            .iter()
            .filter(|phrase| normalized.contains(&format!(" {phrase} ")))
            .count();
        let mut score = phrase_hits as f32 * cfg.phrase_bonus;

        let mut words_matched = 0usize;
        for word in &terms.words {
            let mut occurrences = 0usize;
            let mut first_offset = None;
            for (offset, token) in &chunk_words {
                if token.starts_with(word.as_str()) {
                    occurrences += 1;
                    first_offset.get_or_insert(*offset);
                }
            }
            if let Some(first) = first_offset {
                words_matched += 1;
                let position_bonus = 1.0 - first as f32 / chunk_chars as f32;
                score += occurrences as f32 * (cfg.occurrence_base + position_bonus * cfg.position_weight);
            }
        }

        if words_matched > 0 || phrase_hits > 0 {
            score += (words_matched as f32 / terms.words.len() as f32).min(1.0);

            if chunk_chars < cfg.short_chunk_chars {
                score *= cfg.short_chunk_factor;
            } else if chunk_chars > cfg.long_chunk_chars {
                score *= cfg.long_chunk_factor;
            }
        }

        // Independent of any word match.
        if terms.has_domain_term && chunk_words.iter().any(|(_, w)| self.is_domain_term(w)) {
            score += cfg.domain_bonus;
        }

        score
    }

    fn is_significant(&self, word: &str) -> bool {
        word.chars().count() > self.config.min_word_chars && !self.stop_words.contains(word)
    }

    fn is_domain_term(&self, word: &str) -> bool {
        self.domain_terms.contains(word)
            || (self.config.domain_numeric && word.chars().any(|c| c.is_ascii_digit()))
    }

    /// Re-score scored chunks in place against `question`, sorted.
    pub fn rescore(&self, question: &str, candidates: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let terms = self.question_terms(question);
        let mut rescored: Vec<ScoredChunk> = candidates
            .into_iter()
            .map(|mut candidate| {
                candidate.relevance = self.score_with_terms(
                    &terms,
                    question,
                    &candidate.chunk.text,
                    candidate.chunk.id.index(),
                );
                candidate
            })
            .collect();
        sort_by_relevance(&mut rescored);
        rescored
    }
}

#[async_trait]
impl Scorer for LexicalScorer {
    fn method(&self) -> SelectionMethod {
        SelectionMethod::Lexical
    }

    async fn rank(
        &self,
        question: &str,
        candidates: Vec<ScoredChunk>,
    ) -> Result<Vec<ScoredChunk>, ScoringError> {
        Ok(self.rescore(question, candidates))
    }
}

/// Score every chunk against one question, parsing the question once.
pub fn score_all(
    scorer: &LexicalScorer,
    question: &str,
    chunks: &[Chunk],
    counter: &impl TokenCounter,
) -> Vec<ScoredChunk> {
    let terms = scorer.question_terms(question);
    chunks
        .iter()
        .map(|chunk| {
            let relevance =
                scorer.score_with_terms(&terms, question, &chunk.text, chunk.id.index());
            ScoredChunk::new(chunk.clone(), relevance, counter)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_tracks_char_offsets() {
        let words = tokenize("Größe, cell-division!");
        assert_eq!(
            words,
            vec![
                (0, "größe".to_string()),
                (7, "cell".to_string()),
                (12, "division".to_string()),
            ]
        );
    }
}
