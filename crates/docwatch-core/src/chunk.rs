//! Overlapping fixed-window text chunker.
//!
//! Splits document text into windows of `size` characters where each
//! window repeats the last `overlap` characters of the previous one.
//! Sizes are counted in Unicode scalar values so a window never cuts a
//! multi-byte character in half.
//!
//! # Algorithm
//!
//! 1. Windows start at position 0 and advance by `step = size - overlap`.
//! 2. Each window ends at `min(start + size, len)`.
//! 3. The window whose end reaches `len` is the last one; it may be
//!    shorter than `size`.
//! 4. Empty text produces no chunks at all.
//!
//! # Example
//!
//! ```rust
//! use docwatch_core::chunk::chunkify;
//!
//! assert_eq!(chunkify("abcdefg", 3, 1), vec!["abc", "cde", "efg"]);
//! assert!(chunkify("", 9, 5).is_empty());
//! ```

use anyhow::{bail, Result};

/// Chunking parameters validated once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. Fails unless `size > 0` and `size > overlap`.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            bail!("chunk size must be > 0");
        }
        if overlap >= size {
            bail!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap,
                size
            );
        }
        Ok(Self { size, overlap })
    }

    /// Split `text` into ordered, overlapping chunks.
    pub fn chunkify(&self, text: &str) -> Vec<String> {
        chunkify(text, self.size, self.overlap)
    }
}

/// Split `text` into windows of `size` chars overlapping by `overlap` chars.
///
/// [`Chunker::new`] rejects `size == 0` and `overlap >= size`. Called
/// directly with such values, a zero `size` yields no chunks and the step
/// never drops below one char, so the call always terminates.
///
/// # Guarantees
///
/// - Empty text yields an empty vector.
/// - Every chunk but the last is exactly `size` chars long.
/// - The last chunk is non-empty and at most `size` chars long.
/// - `size >= len(text)` yields the whole text as a single chunk.
pub fn chunkify(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || size == 0 {
        return Vec::new();
    }

    // Byte offset of every char start, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::with_capacity(len / step + 1);
    let mut pos = 0;
    loop {
        let end = (pos + size).min(len);
        chunks.push(text[bounds[pos]..bounds[end]].to_string());
        if end >= len {
            break;
        }
        pos += step;
    }

    chunks
}
