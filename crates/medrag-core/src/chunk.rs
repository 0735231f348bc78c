//! Word-safe character chunker.
//!
//! Splits corpus text into segments of at most `max_chunk_size` characters
//! in a single left-to-right pass, never cutting inside a word.
//!
//! # Algorithm
//!
//! 1. Tentatively take the next `max_chunk_size` characters.
//! 2. If the character right after the cut is not whitespace, the cut lands
//!    inside a word: move it back to just after the nearest preceding
//!    whitespace character.
//! 3. If there is no such whitespace before the chunk's own start, the
//!    chunk is a single oversized token: extend the cut forward to the next
//!    whitespace and emit the token whole.
//! 4. Trim the slice; skip it if nothing but whitespace remains.
//!
//! The final, shorter remainder is always emitted. Empty input yields no
//! chunks.
//!
//! # Example
//!
//! ```rust
//! use medrag_core::chunk::segments;
//!
//! let parts: Vec<&str> = segments("Fever in infants is common.", 12)
//!     .map(|s| s.text)
//!     .collect();
//! assert_eq!(parts, vec!["Fever in", "infants is", "common."]);
//! ```

use std::iter::FusedIterator;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Default maximum chunk length, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// Namespace for deterministic chunk ids.
const CHUNK_NAMESPACE: Uuid = Uuid::from_u128(0x6d65_6472_6167_4000_8000_6368_756e_6b73);

/// A trimmed slice of the source text and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// Lazy iterator over word-safe segments. Cloning it restarts from the
/// clone point; calling [`segments`] again restarts from the beginning.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    max_chars: usize,
    pos: usize,
}

/// Iterate word-safe segments of `text`. A `max_chunk_size` of zero is
/// treated as one.
pub fn segments(text: &str, max_chunk_size: usize) -> Segments<'_> {
    Segments {
        text,
        max_chars: max_chunk_size.max(1),
        pos: 0,
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let mut end = rest
                .char_indices()
                .nth(self.max_chars)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());

            if end < rest.len() && !starts_with_whitespace(&rest[end..]) {
                end = match rest[..end].char_indices().rev().find(|(_, c)| c.is_whitespace()) {
                    Some((ws, c)) => ws + c.len_utf8(),
                    None => rest[end..]
                        .find(char::is_whitespace)
                        .map(|i| end + i)
                        .unwrap_or(rest.len()),
                };
            }

            let start = self.pos;
            self.pos += end;

            let piece = &rest[..end];
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lead = piece.len() - piece.trim_start().len();
            return Some(Segment {
                text: trimmed,
                offset: start + lead,
            });
        }
        None
    }
}

impl FusedIterator for Segments<'_> {}

fn starts_with_whitespace(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_whitespace)
}

/// Lazily turn `text` into [`Chunk`]s with contiguous sequence indices
/// starting at 0.
pub fn chunks<'a>(
    source: &'a str,
    text: &'a str,
    max_chunk_size: usize,
) -> impl Iterator<Item = Chunk> + Clone + 'a {
    segments(text, max_chunk_size)
        .enumerate()
        .map(move |(i, seg)| make_chunk(source, i as i64, seg))
}

/// Eager form of [`chunks`].
pub fn chunk_text(source: &str, text: &str, max_chunk_size: usize) -> Vec<Chunk> {
    chunks(source, text, max_chunk_size).collect()
}

/// Build a [`Chunk`] with a SHA-256 content hash and a UUIDv5 id derived
/// from source, index, and hash. Identical input always yields the same id.
fn make_chunk(source: &str, index: i64, seg: Segment<'_>) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(seg.text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let name = format!("{}:{}:{}", source, index, hash);
    Chunk {
        id: Uuid::new_v5(&CHUNK_NAMESPACE, name.as_bytes()).to_string(),
        text: seg.text.to_string(),
        sequence_index: index,
        source_offset: seg.offset as i64,
        source: source.to_string(),
        hash,
    }
}
