use serde::{Deserialize, Serialize};

use crate::selection::TokenCounter;

/// Ordinal position of a chunk inside its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(usize);

impl ChunkId {
    pub fn new(index: usize) -> Self {
        ChunkId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// A bounded excerpt of a document, produced once upstream.
///
/// `text` may be a compressed rendition of the original excerpt once it has
/// passed through selection; `source_token_estimate` always describes the
/// text as it was extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source_token_estimate: usize,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>, counter: &impl TokenCounter) -> Self {
        let text = text.into();
        let source_token_estimate = counter.count_tokens(&text);
        Self {
            id: ChunkId::new(index),
            text,
            source_token_estimate,
        }
    }

    /// Build chunks for a whole document, numbering them in order.
    pub fn from_texts<S: AsRef<str>>(texts: &[S], counter: &impl TokenCounter) -> Vec<Self> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| Chunk::new(index, text.as_ref(), counter))
            .collect()
    }

    /// Same chunk identity, different text.
    pub fn with_text(&self, text: String) -> Self {
        Self {
            id: self.id,
            text,
            source_token_estimate: self.source_token_estimate,
        }
    }
}

/// Internal: a chunk scored for one question. Discarded after selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub relevance: f32,
    pub token_estimate: usize,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, relevance: f32, counter: &impl TokenCounter) -> Self {
        let token_estimate = counter.count_tokens(&chunk.text);
        Self {
            chunk,
            relevance: sanitize_relevance(relevance),
            token_estimate,
        }
    }

    pub fn id(&self) -> ChunkId {
        self.chunk.id
    }
}

fn sanitize_relevance(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Sort by (relevance desc, id asc). Identical inputs always order identically.
pub fn sort_by_relevance(chunks: &mut [ScoredChunk]) {
    chunks.sort_by(|a, b| {
        b.relevance
            .total_cmp(&a.relevance)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
}
