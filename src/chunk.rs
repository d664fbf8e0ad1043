//! Paragraph-boundary text chunker.
//!
//! Splits document text into [`DocumentChunk`]s no longer than
//! `max_tokens` (approximated as four characters per token). Paragraphs
//! (`\n\n`) are packed together while they fit; a single oversized
//! paragraph is hard-split at the last newline or space before the limit.

use crate::models::DocumentChunk;

const CHARS_PER_TOKEN: usize = 4;

/// Split text into chunks. Always returns at least one chunk.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<DocumentChunk> {
    let max_chars = (max_tokens * CHARS_PER_TOKEN).max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let joined_len = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };
        if joined_len > max_chars && !buf.is_empty() {
            chunks.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            chunks.extend(hard_split(para, max_chars));
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    if chunks.is_empty() {
        chunks.push(text.trim().to_string());
    }

    chunks
        .into_iter()
        .map(|text| DocumentChunk { text })
        .collect()
}

fn hard_split(para: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut remaining = para;

    while !remaining.is_empty() {
        if remaining.len() <= max_chars {
            pieces.push(remaining.trim().to_string());
            break;
        }

        let mut limit = max_chars;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        if limit == 0 {
            // A single char wider than the limit.
            limit = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }

        let split_at = remaining[..limit]
            .rfind(|c: char| c == '\n' || c == ' ')
            .map(|pos| pos + 1)
            .unwrap_or(limit);
        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        remaining = &remaining[split_at..];
    }

    pieces
}
