//! Deterministic text chunking strategies.
//!
//! Both strategies are pure functions of their input, so re-running an
//! ingestion over the same normalized text yields the same chunk sequence.
//!
//! - [`split_paragraphs`] is the primary strategy: split on blank lines and
//!   drop fragments below a noise threshold.
//! - [`sliding_window`] is the fallback for texts with few paragraph breaks:
//!   fixed-size character windows with a constant overlap so concepts are not
//!   severed at a boundary.

/// Fragments shorter than this many characters are treated as noise.
pub const MIN_PARAGRAPH_CHARS: usize = 50;
/// Window size, in characters, of the sliding-window strategy.
pub const WINDOW_CHARS: usize = 1000;
/// Overlap, in characters, shared by consecutive sliding windows.
pub const WINDOW_OVERLAP_CHARS: usize = 100;

/// Split normalized text on paragraph boundaries (blank lines), dropping
/// trimmed fragments shorter than `min_chars`.
pub fn split_paragraphs(text: &str, min_chars: usize) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .filter(|fragment| fragment.chars().count() >= min_chars)
        .map(str::to_string)
        .collect()
}

/// Cut text into fixed-size character windows where consecutive windows share
/// an `overlap`-character suffix/prefix.
///
/// A text shorter than `window` yields exactly one chunk. Every chunk is at
/// most `window` characters long.
pub fn sliding_window(text: &str, window: usize, overlap: usize) -> Vec<String> {
    if window == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = window.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Chunk a normalized document for ingestion.
///
/// Uses the paragraph strategy first; when the text has too little paragraph
/// structure to produce any chunk, falls back to the sliding window so the
/// document still becomes retrievable. Oversized paragraphs are re-cut with
/// the sliding window to keep every persisted chunk within the window bound.
pub fn chunk_document(text: &str) -> Vec<String> {
    let paragraphs = split_paragraphs(text, MIN_PARAGRAPH_CHARS);
    if paragraphs.is_empty() {
        if text.trim().is_empty() {
            return Vec::new();
        }
        tracing::debug!(
            chars = text.chars().count(),
            "Low paragraph density; using sliding-window chunking"
        );
        return sliding_window(text, WINDOW_CHARS, WINDOW_OVERLAP_CHARS);
    }

    paragraphs
        .into_iter()
        .flat_map(|paragraph| {
            if paragraph.chars().count() > WINDOW_CHARS {
                sliding_window(&paragraph, WINDOW_CHARS, WINDOW_OVERLAP_CHARS)
            } else {
                vec![paragraph]
            }
        })
        .collect()
}
