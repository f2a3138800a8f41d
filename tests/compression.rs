use adaptive_context::compression::{compress, summarize, truncate_at_boundary};
use adaptive_context::config::CompressionConfig;
use adaptive_context::selection::{ApproxTokenCounter, TokenCounter};
use adaptive_context::types::Chunk;

const SENTENCE: &str = "Cells divide through ordered phases of growth. ";

fn config() -> CompressionConfig {
    CompressionConfig::default()
}

fn chunks(texts: &[&str]) -> Vec<Chunk> {
    Chunk::from_texts(texts, &ApproxTokenCounter::default())
}

fn prose() -> String {
    // 798 chars, 200 tokens
    SENTENCE.repeat(17).trim_end().to_string()
}

#[test]
fn within_target_is_unchanged() {
    let input = chunks(&["A short chunk.", "Another short chunk."]);
    let output = compress(&input, 100, &config(), &ApproxTokenCounter::default());
    assert_eq!(output, input);
}

#[test]
fn empty_text_is_unchanged() {
    let input = chunks(&["", ""]);
    let output = compress(&input, 0, &config(), &ApproxTokenCounter::default());
    assert_eq!(output, input);
}

#[test]
fn cuts_at_sentence_boundaries() {
    let counter = ApproxTokenCounter::default();
    let text = prose();
    let input = chunks(&[text.as_str(), text.as_str()]);

    let output = compress(&input, 200, &config(), &counter);

    assert_eq!(output.len(), 2);
    for chunk in &output {
        let len = chunk.text.chars().count();
        assert_eq!(len, 375);
        assert!(chunk.text.ends_with("growth."));
        assert!(text.starts_with(&chunk.text));
    }
    let tokens: usize = output.iter().map(|c| counter.count_tokens(&c.text)).sum();
    assert_eq!(tokens, 188);
}

#[test]
fn hard_cut_is_marked_with_ellipsis() {
    let counter = ApproxTokenCounter::default();
    let text = "word ".repeat(160).trim_end().to_string();
    let output = compress(&chunks(&[text.as_str()]), 100, &config(), &counter);

    assert_eq!(output[0].text.chars().count(), 402);
    assert!(output[0].text.ends_with("word..."));
    assert_eq!(counter.count_tokens(&output[0].text), 101);
}

#[test]
fn keeps_a_minimum_of_text() {
    let text = "word ".repeat(160).trim_end().to_string();
    let output = compress(
        &chunks(&[text.as_str()]),
        5,
        &config(),
        &ApproxTokenCounter::default(),
    );
    assert_eq!(output[0].text.chars().count(), 100);
}

#[test]
fn compression_preserves_identity() {
    let text = prose();
    let input = chunks(&["intro", text.as_str()]);
    let output = compress(&input, 50, &config(), &ApproxTokenCounter::default());

    assert_eq!(output[0].text, "intro");
    assert_eq!(output[1].id, input[1].id);
    assert_eq!(output[1].source_token_estimate, 200);
    assert!(output[1].text.len() < input[1].text.len());
}

#[test]
fn boundary_too_early_falls_back_to_ellipsis() {
    let text = format!("Short. {}", "x".repeat(200));
    let cut = truncate_at_boundary(&text, 100, &config());
    assert!(cut.ends_with("..."));
    assert_eq!(cut.chars().count(), 103);
}

#[test]
fn boundary_is_char_safe() {
    let text = "Zellteilung läuft in Phasen ab. ".repeat(10);
    let cut = truncate_at_boundary(&text, 50, &config());
    assert_eq!(cut, "Zellteilung läuft in Phasen ab. Zellteilung läuft...");
}

#[test]
fn short_text_is_not_truncated() {
    assert_eq!(truncate_at_boundary("Tiny.", 100, &config()), "Tiny.");
}

#[test]
fn summarize_keeps_leading_sentences() {
    let input = chunks(&[
        "Prophase comes first. Metaphase aligns chromosomes. Anaphase separates them. Telophase closes.",
        "Only one sentence here",
    ]);
    let output = summarize(&input, &config());

    assert_eq!(
        output[0].text,
        "Prophase comes first. Metaphase aligns chromosomes. Anaphase separates them."
    );
    assert_eq!(output[1].text, "Only one sentence here");
    assert_eq!(output[0].id, input[0].id);
}
