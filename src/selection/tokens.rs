pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, content: &str) -> usize;

    /// Largest character count whose estimate stays within `tokens`.
    fn max_chars_for(&self, tokens: usize) -> usize;
}

/// Approximate tokenization by a fixed characters-per-token ratio.
/// tokens(content) := ceil(chars(content) / chars_per_token)
///
/// Counts characters rather than bytes so non-ASCII text is not inflated.
#[derive(Debug, Clone, Copy)]
pub struct ApproxTokenCounter {
    chars_per_token: f32,
}

impl ApproxTokenCounter {
    pub const DEFAULT_CHARS_PER_TOKEN: f32 = 4.0;

    /// Non-positive or non-finite ratios fall back to the default.
    pub fn new(chars_per_token: f32) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            Self::DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }

    pub fn chars_per_token(&self) -> f32 {
        self.chars_per_token
    }
}

impl Default for ApproxTokenCounter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenCounter for ApproxTokenCounter {
    fn count_tokens(&self, content: &str) -> usize {
        if content.is_empty() {
            return 0;
        }
        let chars = content.chars().count() as f64;
        (chars / self.chars_per_token as f64).ceil() as usize
    }

    fn max_chars_for(&self, tokens: usize) -> usize {
        (tokens as f64 * self.chars_per_token as f64).floor() as usize
    }
}

/// Sum of estimates over a set of texts.
pub fn total_tokens<'a, I>(counter: &impl TokenCounter, texts: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().map(|text| counter.count_tokens(text)).sum()
}
