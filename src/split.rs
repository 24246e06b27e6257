//! Sentence-aware chunk splitter with fixed word-count windows and
//! overlap.
//!
//! `chunk_size` and `chunk_overlap` are both measured in words
//! (whitespace-delimited tokens). A chunk ends at the last sentence
//! boundary that fits inside the window; when no boundary fits (prose
//! normalization strips terminal punctuation, and single sentences can
//! exceed the window) the cut falls exactly at `chunk_size` words. The
//! next chunk starts `chunk_overlap` words before the end of the
//! previous one, so local context survives the boundary.
//!
//! Chunk text is the byte span of the input from its first to its last
//! word, which keeps interior whitespace intact for structured sources.

use crate::models::{Chunk, Document};

/// A word of the input: byte span plus whether it terminates a sentence.
struct Word {
    start: usize,
    end: usize,
    ends_sentence: bool,
}

/// Split a document's (already normalized) text into overlapping chunks.
///
/// Requires `chunk_overlap < chunk_size`; the pipeline validates this at
/// construction. Empty or whitespace-only text degrades to an empty
/// chunk list rather than failing.
pub fn split_document(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    debug_assert!(chunk_overlap < chunk_size);

    let text = &document.raw_text;
    let words = scan_words(text);
    let n = words.len();
    if n == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let hard_end = (start + chunk_size).min(n);
        let mut end = hard_end;
        if hard_end < n {
            // Prefer ending at a sentence boundary, as long as it leaves
            // enough room past the overlap for the window to advance.
            if let Some(b) = last_boundary(&words, start + chunk_overlap + 1, hard_end) {
                end = b;
            }
        }

        let span = &text[words[start].start..words[end - 1].end];
        chunks.push(make_chunk(document, index, span));
        index += 1;

        if end == n {
            break;
        }
        start = end - chunk_overlap;
    }

    chunks
}

/// Largest `b` in `[lo, hi]` such that word `b - 1` ends a sentence.
fn last_boundary(words: &[Word], lo: usize, hi: usize) -> Option<usize> {
    (lo..=hi).rev().find(|&b| words[b - 1].ends_sentence)
}

fn make_chunk(document: &Document, index: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("{}:{}", document.id, index),
        document_id: document.id.clone(),
        chunk_index: index,
        text: text.to_string(),
        embedding: None,
        metadata: document.metadata.clone(),
    }
}

fn scan_words(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                words.push(word_at(text, s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push(word_at(text, s, text.len()));
    }
    words
}

fn word_at(text: &str, start: usize, end: usize) -> Word {
    let token = &text[start..end];
    // Trailing closers ( " ' ) ] } ) may follow the terminal punctuation.
    let trimmed = token.trim_end_matches(['"', '\'', ')', ']', '}']);
    let ends_sentence = trimmed.ends_with(['.', '!', '?']);
    Word {
        start,
        end,
        ends_sentence,
    }
}
