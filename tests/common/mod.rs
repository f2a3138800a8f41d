#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use adaptive_context::selection::semantic::{EmbeddingError, EmbeddingProvider};
use async_trait::async_trait;

/// Embeds text as keyword counts over a fixed vocabulary.
pub struct KeywordEmbedder {
    pub model: String,
    pub vocabulary: Vec<&'static str>,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: Vec<&'static str>) -> Self {
        Self {
            model: "keyword-test-v1".to_string(),
            vocabulary,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocabulary
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

/// Fails every call, as an exhausted quota would.
#[derive(Default)]
pub struct FailingEmbedder {
    pub calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_id(&self) -> &str {
        "failing-test-v1"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EmbeddingError::RateLimited {
            message: "quota exceeded".to_string(),
        })
    }
}

/// Never answers within any reasonable deadline.
pub struct StalledEmbedder {
    pub delay: Duration,
}

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    fn model_id(&self) -> &str {
        "stalled-test-v1"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tokio::time::sleep(self.delay).await;
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Returns one vector fewer than requested.
pub struct ShortEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortEmbedder {
    fn model_id(&self) -> &str {
        "short-test-v1"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 1.0]).collect())
    }
}

pub const BIOLOGY_DOC: [&str; 6] = [
    "Mitosis is the process by which a single cell divides its nucleus into two genetically identical daughter nuclei. It proceeds through prophase, metaphase, anaphase and telophase.",
    "Photosynthesis takes place in the chloroplasts of plant cells, where light energy is converted into chemical energy stored as glucose.",
    "During prophase of mitosis the chromatin condenses into visible chromosomes and the mitotic spindle begins to form between the centrosomes.",
    "The French Revolution began in 1789 and fundamentally reshaped the political institutions of Europe over the following decade.",
    "Meiosis differs from mitosis because it produces four genetically distinct haploid cells through two rounds of division.",
    "Cellular respiration releases energy from glucose in the mitochondria, producing ATP that powers most cellular activity.",
];

pub fn biology_embedder() -> KeywordEmbedder {
    KeywordEmbedder::new(vec![
        "mitosis", "phase", "cell", "nucle", "chromosom", "energy", "glucose", "revolution",
    ])
}
