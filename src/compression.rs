//! Token-budget compression of chunk text.
//!
//! Compression is best-effort: the summed estimate lands near the target but
//! the ellipsis marker and the minimum kept length may overshoot slightly.
//! Callers that need a hard bound follow up with `apply_budget`.

use crate::config::CompressionConfig;
use crate::selection::TokenCounter;
use crate::types::Chunk;

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Shrink `chunks` so their summed estimate approaches `target_tokens`.
///
/// Every chunk is cut by the same ratio. Chunks already within target are
/// returned unchanged.
pub fn compress(
    chunks: &[Chunk],
    target_tokens: usize,
    config: &CompressionConfig,
    counter: &impl TokenCounter,
) -> Vec<Chunk> {
    let total: usize = chunks.iter().map(|c| counter.count_tokens(&c.text)).sum();
    if total == 0 || total <= target_tokens {
        return chunks.to_vec();
    }

    let ratio = target_tokens as f64 / total as f64;
    chunks
        .iter()
        .map(|chunk| {
            let chars = chunk.text.chars().count();
            let target_len = (chars as f64 * ratio).floor() as usize;
            let text = if target_len < config.min_chunk_chars {
                take_chars(&chunk.text, config.min_chunk_chars).to_string()
            } else {
                truncate_at_boundary(&chunk.text, target_len, config)
            };
            chunk.with_text(text)
        })
        .collect()
}

/// Cut to `target_len` chars, preferring a sentence end past
/// `boundary_ratio × target_len`; otherwise hard-cut and mark with the ellipsis.
pub fn truncate_at_boundary(text: &str, target_len: usize, config: &CompressionConfig) -> String {
    let truncated = take_chars(text, target_len);
    if truncated.len() == text.len() {
        return text.to_string();
    }

    let min_boundary = target_len as f32 * config.boundary_ratio;
    let boundary = truncated
        .char_indices()
        .enumerate()
        .filter(|(_, (_, c))| TERMINATORS.contains(c))
        .last();

    match boundary {
        Some((char_pos, (byte_idx, c))) if char_pos as f32 >= min_boundary => {
            truncated[..byte_idx + c.len_utf8()].to_string()
        }
        _ => format!("{}{}", truncated.trim_end(), config.ellipsis),
    }
}

/// Sentences ending in `.`, `!` or `?` followed by whitespace or end of text.
/// Trailing text without a terminator counts as a final sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !TERMINATORS.contains(&c) {
            continue;
        }
        let at_break = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if at_break {
            let end = idx + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

pub fn leading_sentences(text: &str, count: usize) -> String {
    split_sentences(text)
        .into_iter()
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce every chunk to its leading sentences.
pub fn summarize(chunks: &[Chunk], config: &CompressionConfig) -> Vec<Chunk> {
    chunks
        .iter()
        .map(|chunk| chunk.with_text(leading_sentences(&chunk.text, config.summary_sentences)))
        .collect()
}

fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
