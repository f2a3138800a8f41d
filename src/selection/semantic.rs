use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SemanticConfig;
use crate::selection::ranking::{Scorer, ScoringError};
use crate::types::{sort_by_relevance, ScoredChunk, SelectionMethod};

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding provider unavailable: {message}")]
    Unavailable { message: String },
    #[error("Embedding provider rate limited: {message}")]
    RateLimited { message: String },
    #[error("Embedding request failed: {message}")]
    Request { message: String },
    #[error("Invalid embedding response: {message}")]
    InvalidResponse { message: String },
}

/// External embedding capability. One batched call per text set.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifies the provider and model; vectors with different ids are
    /// never compared.
    fn model_id(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// A vector tagged with the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub model: String,
    pub values: Vec<f32>,
}

impl EmbeddingVector {
    pub fn new(model: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            values,
        }
    }
}

/// Raw cosine. `None` for empty, mismatched or zero-magnitude inputs.
pub fn cosine(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
    if lhs.is_empty() || lhs.len() != rhs.len() {
        return None;
    }

    let mut dot = 0.0_f32;
    let mut lhs_norm = 0.0_f32;
    let mut rhs_norm = 0.0_f32;

    for (l, r) in lhs.iter().zip(rhs.iter()) {
        dot += l * r;
        lhs_norm += l * l;
        rhs_norm += r * r;
    }

    if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
        return None;
    }

    let similarity = dot / (lhs_norm.sqrt() * rhs_norm.sqrt());
    similarity.is_finite().then(|| similarity.clamp(-1.0, 1.0))
}

/// Cosine similarity, 0.0 whenever the pair is not comparable.
pub fn cosine_similarity(lhs: &EmbeddingVector, rhs: &EmbeddingVector) -> f32 {
    if lhs.model != rhs.model {
        return 0.0;
    }
    cosine(&lhs.values, &rhs.values).unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedSimilarity {
    pub index: usize,
    pub similarity: f32,
}

/// Rank chunk embeddings against the question, most similar first.
pub fn rank(
    question: &EmbeddingVector,
    chunk_embeddings: &[EmbeddingVector],
) -> Vec<RankedSimilarity> {
    let mut ranked: Vec<RankedSimilarity> = chunk_embeddings
        .iter()
        .enumerate()
        .map(|(index, embedding)| RankedSimilarity {
            index,
            similarity: cosine_similarity(question, embedding),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.index.cmp(&b.index))
    });
    ranked
}

/// Re-ranks candidates by embedding similarity, bounded by a timeout.
pub struct SemanticScorer {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl SemanticScorer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &SemanticConfig) -> Self {
        Self::new(provider, Duration::from_millis(config.timeout_ms))
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    async fn embed_all(
        &self,
        question: &str,
        texts: &[String],
    ) -> Result<(EmbeddingVector, Vec<EmbeddingVector>), ScoringError> {
        let model = self.provider.model_id().to_string();

        let question_vectors = self.provider.embed(&[question.to_string()]).await?;
        if question_vectors.len() != 1 {
            return Err(ScoringError::CountMismatch {
                expected: 1,
                actual: question_vectors.len(),
            });
        }

        let chunk_vectors = self.provider.embed(texts).await?;
        if chunk_vectors.len() != texts.len() {
            return Err(ScoringError::CountMismatch {
                expected: texts.len(),
                actual: chunk_vectors.len(),
            });
        }

        let question_vector = question_vectors
            .into_iter()
            .next()
            .map(|values| EmbeddingVector::new(model.clone(), values))
            .ok_or(ScoringError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;
        let chunk_vectors = chunk_vectors
            .into_iter()
            .map(|values| EmbeddingVector::new(model.clone(), values))
            .collect();

        Ok((question_vector, chunk_vectors))
    }
}

#[async_trait]
impl Scorer for SemanticScorer {
    fn method(&self) -> SelectionMethod {
        SelectionMethod::Semantic
    }

    async fn rank(
        &self,
        question: &str,
        candidates: Vec<ScoredChunk>,
    ) -> Result<Vec<ScoredChunk>, ScoringError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let texts: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();

        let (question_vector, chunk_vectors) =
            tokio::time::timeout(self.timeout, self.embed_all(question, &texts))
                .await
                .map_err(|_| ScoringError::Timeout(self.timeout.as_millis() as u64))??;

        let mut candidates = candidates;
        for ranked in rank(&question_vector, &chunk_vectors) {
            candidates[ranked.index].relevance = ranked.similarity.max(0.0);
        }
        sort_by_relevance(&mut candidates);
        Ok(candidates)
    }
}
