//! Reconstructor: one witness's text back out of the unified spans.

use collate_core::{Rank, Span};

/// Concatenate what `witness` reads: the default text of every span in its
/// provenance, or its alternative where it has one. Expects coalesced spans.
pub fn reconstruct(spans: &[Span], witness: Rank) -> String {
    let mut out = String::new();
    for span in spans {
        if let Some(text) = span.reading_for(witness) {
            out.push_str(text);
        }
    }
    out.trim().to_string()
}
