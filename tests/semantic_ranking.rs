use std::sync::Arc;
use std::time::Duration;

use adaptive_context::selection::semantic::{cosine, cosine_similarity, rank};
use adaptive_context::selection::{
    ApproxTokenCounter, EmbeddingVector, Scorer, ScoringError, SemanticScorer,
};
use adaptive_context::types::{Chunk, ScoredChunk, SelectionMethod};

mod common;

use common::{biology_embedder, FailingEmbedder, ShortEmbedder, StalledEmbedder, BIOLOGY_DOC};

fn candidates(indices: &[usize]) -> Vec<ScoredChunk> {
    let counter = ApproxTokenCounter::default();
    indices
        .iter()
        .map(|&i| ScoredChunk::new(Chunk::new(i, BIOLOGY_DOC[i], &counter), 1.0, &counter))
        .collect()
}

#[test]
fn cosine_of_parallel_and_orthogonal_vectors() {
    assert!((cosine(&[1.0, 2.0], &[2.0, 4.0]).unwrap() - 1.0).abs() < 1e-6);
    assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
    assert!((cosine(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
}

#[test]
fn cosine_rejects_incomparable_inputs() {
    assert_eq!(cosine(&[], &[]), None);
    assert_eq!(cosine(&[1.0, 2.0], &[1.0]), None);
    assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), None);
}

#[test]
fn similarity_across_models_is_zero() {
    let a = EmbeddingVector::new("model-a", vec![1.0, 1.0]);
    let b = EmbeddingVector::new("model-b", vec![1.0, 1.0]);
    let c = EmbeddingVector::new("model-a", vec![1.0, 1.0]);
    assert_eq!(cosine_similarity(&a, &b), 0.0);
    assert!((cosine_similarity(&a, &c) - 1.0).abs() < 1e-6);
}

#[test]
fn rank_orders_by_similarity_then_index() {
    let question = EmbeddingVector::new("m", vec![1.0, 0.0]);
    let chunks = vec![
        EmbeddingVector::new("m", vec![0.0, 1.0]),
        EmbeddingVector::new("m", vec![1.0, 1.0]),
        EmbeddingVector::new("m", vec![1.0, 0.0]),
        EmbeddingVector::new("m", vec![1.0, 1.0]),
        EmbeddingVector::new("m", vec![3.0, 1.0]),
    ];
    let order: Vec<usize> = rank(&question, &chunks).iter().map(|r| r.index).collect();
    assert_eq!(order, vec![2, 4, 1, 3, 0]);
}

#[tokio::test]
async fn semantic_scorer_reorders_candidates() {
    let provider = Arc::new(biology_embedder());
    let scorer = SemanticScorer::new(provider.clone(), Duration::from_secs(5));
    assert_eq!(scorer.method(), SelectionMethod::Semantic);
    assert_eq!(scorer.model_id(), "keyword-test-v1");

    let ranked = scorer
        .rank("Explain the phases of mitosis", candidates(&[0, 2, 4]))
        .await
        .unwrap();

    let ids: Vec<usize> = ranked.iter().map(|c| c.id().index()).collect();
    assert_eq!(ids, vec![2, 0, 4]);
    assert!((ranked[0].relevance - 0.8165).abs() < 1e-3);
    assert!((ranked[1].relevance - 0.7538).abs() < 1e-3);
    assert!((ranked[2].relevance - 0.5).abs() < 1e-3);

    // question, then one batch for all candidates
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn unrelated_candidates_score_zero() {
    let scorer = SemanticScorer::new(Arc::new(biology_embedder()), Duration::from_secs(5));
    let ranked = scorer
        .rank("What is the capital of Mongolia?", candidates(&[3, 1]))
        .await
        .unwrap();

    assert!(ranked.iter().all(|c| c.relevance == 0.0));
    let ids: Vec<usize> = ranked.iter().map(|c| c.id().index()).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn empty_candidates_skip_the_provider() {
    let provider = Arc::new(biology_embedder());
    let scorer = SemanticScorer::new(provider.clone(), Duration::from_secs(5));
    let ranked = scorer.rank("mitosis", Vec::new()).await.unwrap();
    assert!(ranked.is_empty());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn provider_errors_are_reported() {
    let provider = Arc::new(FailingEmbedder::default());
    let scorer = SemanticScorer::new(provider.clone(), Duration::from_secs(5));
    let err = scorer
        .rank("mitosis", candidates(&[0, 2]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::Provider(_)), "{err}");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn short_responses_are_rejected() {
    let scorer = SemanticScorer::new(Arc::new(ShortEmbedder), Duration::from_secs(5));
    let err = scorer
        .rank("mitosis", candidates(&[0, 2, 4]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::CountMismatch { .. }), "{err}");
}

#[tokio::test(start_paused = true)]
async fn stalled_provider_times_out() {
    let scorer = SemanticScorer::new(
        Arc::new(StalledEmbedder {
            delay: Duration::from_secs(60),
        }),
        Duration::from_millis(5000),
    );
    let err = scorer
        .rank("mitosis", candidates(&[0, 2]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::Timeout(5000)), "{err}");
}
