//! Retrieval Context Builder
//!
//! Renders ranked hits into a single bounded-length text block for prompt
//! injection. This is a pure renderer: ordering and scoring policy live in
//! the caller, and accumulation stops at the first block that would exceed
//! the budget rather than truncating mid-block.

use crate::constants::retrieval::NO_RESULTS_FALLBACK;
use crate::types::RetrievalHit;

/// Render `hits` in the order given into source-labeled blocks, greedily
/// accumulating until `max_length` bytes would be exceeded.
///
/// Returns a fixed fallback string when no hits are supplied, never an empty
/// string.
pub fn build_context(hits: &[RetrievalHit], max_length: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current_length = 0usize;

    for (i, hit) in hits.iter().enumerate() {
        let origin = hit.origin().unwrap_or("Unknown");
        let ordinal = hit
            .ordinal()
            .map(|o| o.to_string())
            .unwrap_or_default();

        let part = format!(
            "[Source {}: {}, Chunk {}]\n{}\n",
            i + 1,
            origin,
            ordinal,
            hit.text
        );

        if current_length + part.len() > max_length {
            break;
        }
        current_length += part.len();
        parts.push(part);
    }

    if parts.is_empty() {
        return NO_RESULTS_FALLBACK.to_string();
    }
    parts.join("\n")
}
