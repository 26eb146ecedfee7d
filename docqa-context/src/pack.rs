//! Formatting of retrieved passages into a single prompt context block.

/// Default per-passage character budget when packing context.
pub const MAX_CHARS_PER_PASSAGE: usize = 400;

/// A retrieved passage ready to be packed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Passage<'a> {
    pub source: &'a str,
    pub text: &'a str,
    pub score: f32,
}

/// Cuts `text` to at most `max_chars` characters, backing up to the last space
/// and appending `...`. Text already within budget is returned unchanged.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let cut = match text.char_indices().nth(max_chars) {
        Some((offset, _)) => offset,
        None => return text.to_string(),
    };

    let prefix = &text[..cut];
    let kept = match prefix.rfind(' ') {
        Some(space) => &prefix[..space],
        None => prefix,
    };
    format!("{kept}...")
}

/// Renders passages as numbered `SOURCE` sections, highest score first.
///
/// ```
/// use docqa_context::pack::{Passage, pack_context};
///
/// let passages = [
///     Passage { source: "a.txt", text: "low", score: 0.1 },
///     Passage { source: "b.txt", text: "high", score: 0.9 },
/// ];
/// let packed = pack_context(&passages, 400);
/// assert!(packed.starts_with("--- SOURCE 1 ---\nSource: b.txt\nSimilarity: 0.900"));
/// ```
pub fn pack_context(passages: &[Passage<'_>], max_chars_per_passage: usize) -> String {
    let mut sorted: Vec<&Passage<'_>> = passages.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    sorted
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            format!(
                "--- SOURCE {} ---\nSource: {}\nSimilarity: {:.3}\n\n{}",
                i + 1,
                passage.source,
                passage.score,
                truncate_text(passage.text, max_chars_per_passage)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
