//! Coalescer and normalizer: the last pass over a unit's spans.
//!
//! - drops spans with no text;
//! - joins neighbours of the same shape (kind, category, provenance and
//!   alternative wordings);
//! - removes whitespace before clause punctuation;
//! - gives every span after the first a leading space unless it starts with
//!   punctuation, so concatenating the spans a witness reads yields its
//!   normalized text;
//! - recomputes the character edits of every alternative.
//!
//! Running the pass on its own output changes nothing.

use collate_compare::diff::char_edits;
use collate_compare::tokenize::{starts_with_punctuation, strip_space_before_punctuation};
use collate_core::{DiffAlgorithm, Span};

pub fn coalesce(spans: Vec<Span>, algorithm: DiffAlgorithm) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for mut span in spans.into_iter().filter(|s| !s.text.trim().is_empty()) {
        span.text = tidy(&span.text, false);
        for alt in &mut span.alternatives {
            alt.text = tidy(&alt.text, false);
        }
        if let Some(last) = merged.last_mut() {
            if last.same_shape(&span) {
                // Identical wordings on both sides: each copy is still read.
                last.text = tidy(&join(&last.text, &span.text), false);
                for (into, from) in last.alternatives.iter_mut().zip(&span.alternatives) {
                    into.text = tidy(&join(&into.text, &from.text), false);
                }
                continue;
            }
        }
        merged.push(span);
    }

    for (index, span) in merged.iter_mut().enumerate() {
        let leading = index > 0;
        span.text = tidy(&span.text, leading);
        let default = span.text.trim().to_string();
        for alt in &mut span.alternatives {
            alt.text = tidy(&alt.text, leading);
            alt.char_edits = char_edits(&default, alt.text.trim(), algorithm);
        }
    }

    merged
}

fn join(a: &str, b: &str) -> String {
    let (a, b) = (a.trim_end(), b.trim_start());
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a} {b}"),
    }
}

fn tidy(text: &str, leading: bool) -> String {
    let text = strip_space_before_punctuation(text.trim());
    if leading && !text.is_empty() && !starts_with_punctuation(&text) {
        format!(" {text}")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collate_core::{Alternative, Provenance, Rank, SpanKind};

    fn span(text: &str, ranks: &[u32], kind: SpanKind) -> Span {
        let provenance: Provenance = ranks.iter().map(|r| Rank(*r)).collect();
        Span::new(text, provenance, kind, Rank(ranks[0]))
    }

    #[test]
    fn neighbours_of_same_shape_are_joined() {
        let spans = vec![
            span("the", &[1, 2], SpanKind::Original),
            span("quick", &[1, 2], SpanKind::Original),
            span("brown", &[2], SpanKind::AddedIn(Rank(2))),
            span("fox", &[1, 2], SpanKind::Original),
        ];
        let out = coalesce(spans, DiffAlgorithm::Myers);
        let texts: Vec<&str> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["the quick", " brown", " fox"]);
    }

    #[test]
    fn punctuation_attaches_to_previous_word() {
        let spans = vec![
            span("he said", &[1], SpanKind::Original),
            span(", then", &[1, 2], SpanKind::Original),
            span("left .", &[1], SpanKind::Original),
        ];
        let out = coalesce(spans, DiffAlgorithm::Myers);
        assert_eq!(out[0].text, "he said");
        assert_eq!(out[1].text, ", then");
        assert_eq!(out[2].text, " left.");
    }

    #[test]
    fn empty_spans_are_dropped() {
        let spans = vec![
            span("a", &[1], SpanKind::Original),
            span("  ", &[2], SpanKind::AddedIn(Rank(2))),
            span("b", &[1], SpanKind::Original),
        ];
        let out = coalesce(spans, DiffAlgorithm::Myers);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "a b");
    }

    fn replaced(text: &str, alt: &str) -> Span {
        let mut span = span(text, &[1, 2], SpanKind::Replaced);
        span.upsert_alternative(Alternative { witness: Rank(2), text: alt.into(), char_edits: vec![] });
        span
    }

    #[test]
    fn different_wordings_are_not_joined() {
        let out = coalesce(vec![replaced("is", "was"), replaced("king", "queen")], DiffAlgorithm::Myers);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].alternatives[0].text, "was");
        assert_eq!(out[1].text, " king");
        assert_eq!(out[1].alternatives[0].text, " queen");
        assert!(!out[1].alternatives[0].char_edits.is_empty());
    }

    #[test]
    fn identical_wordings_are_joined_and_rediffed() {
        let out = coalesce(vec![replaced("old", "new"), replaced("old", "new")], DiffAlgorithm::Myers);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "old old");
        assert_eq!(out[0].alternatives[0].text, "new new");
        assert!(!out[0].alternatives[0].char_edits.is_empty());
    }

    #[test]
    fn coalescing_twice_changes_nothing() {
        let spans = vec![
            span("the", &[1, 2], SpanKind::Original),
            span("quick ,", &[1, 2], SpanKind::Original),
            span("brown", &[2], SpanKind::AddedIn(Rank(2))),
            span(".", &[1], SpanKind::DeletedIn(Rank(2))),
        ];
        let once = coalesce(spans, DiffAlgorithm::Myers);
        let twice = coalesce(once.clone(), DiffAlgorithm::Myers);
        assert_eq!(once, twice);
    }
}
