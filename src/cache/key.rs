use serde::Serialize;
use sha2::{Digest, Sha256};

/// Fixed-size digest identifying a cached computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a lexical score. Only bounded prefixes of the inputs are hashed,
    /// plus the full chunk length so same-prefix chunks of different size
    /// rarely collide. `scope` separates scorers sharing one cache, usually
    /// a [`CacheKey::fingerprint`] of the scoring config.
    pub fn for_score(
        scope: &str,
        question: &str,
        chunk: &str,
        question_prefix_chars: usize,
        chunk_prefix_chars: usize,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"score\0");
        hasher.update(scope.as_bytes());
        hasher.update(b"\0");
        hasher.update(prefix(question, question_prefix_chars).as_bytes());
        hasher.update(b"\0");
        hasher.update(chunk.len().to_le_bytes());
        hasher.update(prefix(chunk, chunk_prefix_chars).as_bytes());
        Self::finish(hasher)
    }

    /// Key for a whole selection: every input byte plus the options.
    pub fn for_selection<S, O>(
        question: &str,
        chunks: &[S],
        options: &O,
        semantic_model: Option<&str>,
    ) -> Result<Self, serde_json::Error>
    where
        S: AsRef<str>,
        O: Serialize,
    {
        let mut hasher = Sha256::new();
        hasher.update(b"selection\0");
        hasher.update(question.as_bytes());
        hasher.update(b"\0");
        hasher.update(chunks.len().to_le_bytes());
        for chunk in chunks {
            let chunk = chunk.as_ref();
            hasher.update(chunk.len().to_le_bytes());
            hasher.update(chunk.as_bytes());
        }
        hasher.update(serde_json::to_vec(options)?);
        hasher.update(semantic_model.unwrap_or("").as_bytes());
        Ok(Self::finish(hasher))
    }

    /// Digest of any serializable value, used to scope keys by configuration.
    pub fn fingerprint<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let mut hasher = Sha256::new();
        hasher.update(b"fingerprint\0");
        hasher.update(serde_json::to_vec(value)?);
        Ok(Self::finish(hasher))
    }

    fn finish(hasher: Sha256) -> Self {
        CacheKey(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
