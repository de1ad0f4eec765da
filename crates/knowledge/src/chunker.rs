//! Text chunking with configurable size and overlap.
//!
//! Sizes are counted in characters. A window is cut at the last paragraph
//! break, line break or space in its second half when one exists, and at
//! the hard size limit otherwise.

use crate::types::ChunkCandidate;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Chunk text into overlapping segments.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    let chunk_size = chunk_size.max(1);
    let overlap = if overlap < chunk_size { overlap } else { 0 };

    // Byte offset of every char, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0usize;

    while start < total {
        let hard_end = (start + chunk_size).min(total);
        let end = if hard_end == total {
            total
        } else {
            find_break(text, &bounds, start + chunk_size / 2, hard_end).unwrap_or(hard_end)
        };

        let piece = text[bounds[start]..bounds[end]].trim();
        if !piece.is_empty() {
            chunks.push(ChunkCandidate {
                source_id: source_id.to_string(),
                position,
                text: piece.to_string(),
                metadata: serde_json::json!({
                    "start": start,
                    "end": end,
                }),
            });
            position += 1;
        }

        if end == total {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Char index just past the last separator within `[from, to)`, if any.
fn find_break(text: &str, bounds: &[usize], from: usize, to: usize) -> Option<usize> {
    let window = &text[bounds[from]..bounds[to]];

    SEPARATORS.iter().find_map(|sep| {
        window.rfind(sep).and_then(|offset| {
            let byte = bounds[from] + offset + sep.len();
            let idx = bounds.binary_search(&byte).unwrap_or_else(|i| i);
            (idx > from).then_some(idx)
        })
    })
}
