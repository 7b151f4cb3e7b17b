//! Recursive boundary-aware text chunker.
//!
//! Splits document text into overlapping windows of at most `max_chars`
//! characters. The text is first cut into pieces at the coarsest boundary
//! that makes them fit (paragraph, then line, then sentence, then word),
//! falling back to a hard character cut only for runs with no boundary at
//! all. Pieces are then packed greedily into windows; each new window
//! starts with trailing pieces of the previous one, up to `overlap_chars`.
//!
//! Windows are exact substrings of the input: whitespace is neither trimmed
//! nor collapsed, so the text after the previous window's end, taken from
//! every window in turn, reassembles the document byte for byte.
//!
//! # Example
//!
//! ```rust
//! use newsrag::chunk::chunk_text;
//!
//! let chunks = chunk_text("doc-1", "Hello world.\n\nSecond paragraph.", 1000, 200);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "Hello world.\n\nSecond paragraph.");
//! ```

use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::ops::Range;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, ChunkMetadata, NewsItem};

/// Boundaries tried in order. The empty separator means a hard cut.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
struct Piece {
    range: Range<usize>,
    chars: usize,
}

/// Chunk a corpus record, attaching its ticker and link when configured to.
pub fn chunk_news_item(item: &NewsItem, config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = chunk_text(
        &item.id,
        &item.full_text,
        config.max_chars,
        config.overlap_chars,
    );
    if config.attach_metadata {
        let metadata = ChunkMetadata {
            ticker: item.ticker.clone(),
            link: item.link.clone(),
        };
        for chunk in &mut chunks {
            chunk.metadata = metadata.clone();
        }
    }
    chunks
}

/// Split text into chunks with contiguous indices starting at 0.
///
/// Empty text yields no chunks. Text of at most `max_chars` characters
/// yields exactly one chunk equal to the input.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    max_chars: usize,
    overlap_chars: usize,
) -> Vec<Chunk> {
    chunk_spans(text, max_chars, overlap_chars)
        .into_iter()
        .enumerate()
        .map(|(index, span)| make_chunk(document_id, index as i64, text, span))
        .collect()
}

/// Byte ranges of the chunks [`chunk_text`] would produce.
///
/// `overlap_chars` is clamped below `max_chars`, and `max_chars` to at least 1.
pub fn chunk_spans(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<Range<usize>> {
    let max_chars = max_chars.max(1);
    let overlap_chars = overlap_chars.min(max_chars - 1);

    if text.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    split_pieces(text, 0..text.len(), SEPARATORS, max_chars, &mut pieces);
    merge_pieces(&pieces, max_chars, overlap_chars)
}

fn split_pieces(
    text: &str,
    range: Range<usize>,
    separators: &[&str],
    max_chars: usize,
    out: &mut Vec<Piece>,
) {
    let slice = &text[range.clone()];
    let chars = slice.chars().count();
    if chars <= max_chars {
        out.push(Piece { range, chars });
        return;
    }

    let Some(pos) = separators
        .iter()
        .position(|sep| sep.is_empty() || slice.contains(sep))
    else {
        hard_split(text, range, max_chars, out);
        return;
    };

    let separator = separators[pos];
    if separator.is_empty() {
        hard_split(text, range, max_chars, out);
        return;
    }

    // The separator stays attached to the end of the piece it terminates.
    let finer = &separators[pos + 1..];
    let mut piece_start = range.start;
    for (offset, _) in slice.match_indices(separator) {
        let piece_end = range.start + offset + separator.len();
        split_pieces(text, piece_start..piece_end, finer, max_chars, out);
        piece_start = piece_end;
    }
    if piece_start < range.end {
        split_pieces(text, piece_start..range.end, finer, max_chars, out);
    }
}

fn hard_split(text: &str, range: Range<usize>, max_chars: usize, out: &mut Vec<Piece>) {
    let mut start = range.start;
    let mut count = 0;
    for (offset, _) in text[range.clone()].char_indices() {
        if count == max_chars {
            let end = range.start + offset;
            out.push(Piece {
                range: start..end,
                chars: count,
            });
            start = end;
            count = 0;
        }
        count += 1;
    }
    if count > 0 {
        out.push(Piece {
            range: start..range.end,
            chars: count,
        });
    }
}

fn merge_pieces(pieces: &[Piece], max_chars: usize, overlap_chars: usize) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut window: VecDeque<&Piece> = VecDeque::new();
    let mut window_chars = 0;

    for piece in pieces {
        if !window.is_empty() && window_chars + piece.chars > max_chars {
            spans.extend(window_span(&window));

            // Keep a tail of the emitted window as overlap, as long as it
            // stays within the overlap budget and leaves room for `piece`.
            while let Some(front) = window.front() {
                if window_chars > overlap_chars || window_chars + piece.chars > max_chars {
                    window_chars -= front.chars;
                    window.pop_front();
                } else {
                    break;
                }
            }
        }
        window.push_back(piece);
        window_chars += piece.chars;
    }

    spans.extend(window_span(&window));
    spans
}

fn window_span(window: &VecDeque<&Piece>) -> Option<Range<usize>> {
    match (window.front(), window.back()) {
        (Some(first), Some(last)) => Some(first.range.start..last.range.end),
        _ => None,
    }
}

fn make_chunk(document_id: &str, index: i64, text: &str, span: Range<usize>) -> Chunk {
    let chunk_text = &text[span.clone()];
    let mut hasher = Sha256::new();
    hasher.update(chunk_text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}#{}", document_id, index),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: chunk_text.to_string(),
        hash,
        start: span.start,
        end: span.end,
        metadata: ChunkMetadata::default(),
    }
}
