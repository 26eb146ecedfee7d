//! This module splits raw document text into overlapping passages for a
//! retrieval index.
//!
//! The goal is to cut a document into windows small enough for an embedding
//! model while never cutting a word in half. Windows overlap so that a sentence
//! straddling a boundary is still retrievable from either side.
//!
//! The module defines two main structs:
//! - [`TextChunker`]: Holds the target window size and overlap and performs
//!   the split.
//! - [`TextChunk`]: A single trimmed passage together with its ordinal and the
//!   byte span it was cut from.
//!
//! # Splitting Rules
//!
//! *   **Word boundaries**: A window starts at `start` and ends at
//!     `start + chunk_size`, then the end is pushed forward until it reaches
//!     whitespace or the end of the text.
//! *   **Overlap**: The next window starts `overlap` characters before the end
//!     of the previous one, walked backwards so it also begins on a word.
//! *   **Forward progress**: If walking back would not move past the previous
//!     start, the next window starts at the previous end. This keeps the loop
//!     finite for any `overlap`, including `overlap >= chunk_size`.
//! *   **Trimming**: Each emitted passage is trimmed; windows that are empty
//!     after trimming are dropped and do not consume an ordinal.
//!
//! Sizes are measured in characters, not bytes, and are advisory: a passage can
//! run past `chunk_size` to finish the last word.
//!
//! "Whitespace" is Unicode `White_Space` plus the ASCII information separators
//! U+001C..=U+001F, which some extractors emit between records.
//!
//! # Usage
//!
//! ```
//! use docqa_context::text::TextChunker;
//!
//! let chunker = TextChunker::new(20, 5);
//! let chunks = chunker.get_chunks("The sky is blue. The grass is green.");
//!
//! assert!(chunks.len() >= 2);
//! assert_eq!(chunks[0].sequence, 0);
//! assert!(chunks[0].chunk_text.contains("sky"));
//! ```
use serde::Serialize;
use std::ops::Range;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Splits text into overlapping, word-aligned passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

/// A trimmed passage cut from a larger document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk<'a> {
    /// Position of this passage among the non-empty passages of the document (0-indexed).
    pub sequence: usize,
    /// Byte range of the untrimmed window in the source text.
    pub span: Range<usize>,
    /// The trimmed passage text.
    pub chunk_text: &'a str,
}

impl TextChunker {
    /// Creates a chunker. A `chunk_size` of zero is raised to one so every
    /// window consumes at least one character.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Returns the untrimmed byte ranges of every window, in order.
    ///
    /// The ranges cover the whole text: each window starts at or before the
    /// end of the previous one. Windows may consist only of whitespace; those
    /// are filtered out by [`get_chunks`](Self::get_chunks).
    ///
    /// # Examples
    ///
    /// ```
    /// use docqa_context::text::TextChunker;
    ///
    /// let text = "alpha beta gamma";
    /// let spans = TextChunker::new(6, 0).spans(text);
    ///
    /// assert_eq!(&text[spans[0].clone()], "alpha ");
    /// assert_eq!(spans.last().map(|s| s.end), Some(text.len()));
    /// ```
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        // Byte offset of every character plus a trailing sentinel at text.len().
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();

        let total = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < total {
            let mut end = (start + self.chunk_size).min(total);
            while end < total && !is_separator(chars[end]) {
                end += 1;
            }

            spans.push(offsets[start]..offsets[end]);

            let mut next_start = end.saturating_sub(self.overlap);
            while next_start > start && next_start > 0 && !is_separator(chars[next_start - 1]) {
                next_start -= 1;
            }
            if next_start <= start {
                next_start = end;
            }
            start = next_start;
        }

        spans
    }

    /// Splits `text` into trimmed, non-empty passages.
    pub fn get_chunks<'a>(&self, text: &'a str) -> Vec<TextChunk<'a>> {
        let mut chunks: Vec<TextChunk<'a>> = Vec::new();
        for span in self.spans(text) {
            let chunk_text = text[span.clone()].trim_matches(is_separator);
            if chunk_text.is_empty() {
                continue;
            }
            chunks.push(TextChunk {
                sequence: chunks.len(),
                span,
                chunk_text,
            });
        }
        chunks
    }
}

/// Characters a window may end on.
pub fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&ch)
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

/// Convenience wrapper returning owned passages.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    TextChunker::new(chunk_size, overlap)
        .get_chunks(text)
        .into_iter()
        .map(|chunk| chunk.chunk_text.to_string())
        .collect()
}
