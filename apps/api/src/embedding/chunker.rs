//! Chunking and sanitization ahead of embedding.
//!
//! Free text is stripped of markup and split into overlapping bounded chunks;
//! pull requests and commits pass through as a single chunk.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::embedding::EmbeddableItem;

/// Target chunk size in characters.
pub const CHUNK_SIZE: usize = 1000;
/// Characters shared between consecutive chunks so sentences cut at a
/// boundary survive in at least one chunk.
pub const CHUNK_OVERLAP: usize = 200;

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("markup tag pattern is valid"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strips markup tags and collapses whitespace runs.
pub fn sanitize(text: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(text, " ");
    WHITESPACE_RUN.replace_all(&without_tags, " ").trim().to_string()
}

/// Splits text into overlapping chunks on char boundaries. The final chunk
/// may be shorter; empty input yields no chunks.
pub fn split_overlapping(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Produces the chunk texts for an item: atomic sources stay whole and
/// unsanitized (structure preserved), everything else is sanitized and split.
pub fn chunk_item(item: &EmbeddableItem) -> Vec<String> {
    if item.source_type.is_atomic() {
        if item.content.is_empty() {
            return Vec::new();
        }
        return vec![item.content.clone()];
    }

    let cleaned = sanitize(&item.content);
    split_overlapping(&cleaned, CHUNK_SIZE, CHUNK_OVERLAP)
}
