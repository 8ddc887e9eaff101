//! Span construction for units whose divergences are already marked up.
//!
//! A unit is a list of [`Segment`]s. Literal segments are read by every
//! witness of the unit; a reading group becomes one span per distinct shape:
//! a shared span when the readers agree, otherwise a `replaced` span whose
//! default is the base witness's reading and whose alternatives hold the
//! other wordings.

use std::collections::{BTreeMap, BTreeSet};

use collate_compare::diff::char_edits;
use collate_compare::tokenize::words;
use collate_core::{Alternative, DiffAlgorithm, Provenance, Rank, Span, SpanKind};

use crate::scope::UnitScope;

/// One segment with witness ids already resolved to ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Readings(BTreeMap<Rank, String>),
}

/// Raw text of every witness in `all`: its segment texts joined by spaces.
/// Witnesses that read nothing map to an empty string.
pub fn witness_texts(segments: &[Segment], all: &Provenance) -> BTreeMap<Rank, String> {
    all.iter()
        .map(|rank| {
            let pieces: Vec<String> = segments
                .iter()
                .filter_map(|segment| match segment {
                    Segment::Literal(text) => Some(words(text).join(" ")),
                    Segment::Readings(readings) => {
                        readings.get(&rank).map(|text| words(text).join(" "))
                    }
                })
                .filter(|piece| !piece.is_empty())
                .collect();
            (rank, pieces.join(" "))
        })
        .collect()
}

/// Build the unit's spans. `base` supplies the default wording of
/// replacements whenever it reads the group.
pub fn build_spans(
    segments: &[Segment],
    scope: &UnitScope,
    base: Rank,
    algorithm: DiffAlgorithm,
) -> Vec<Span> {
    let Some(first_present) = scope.present.earliest() else {
        return Vec::new();
    };
    let literal_source = if scope.present.contains(base) {
        base
    } else {
        first_present
    };

    let mut spans = Vec::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                let tokens = words(text);
                if tokens.is_empty() {
                    continue;
                }
                let provenance = scope.present.clone();
                let kind = scope.kind_for(&provenance);
                spans.push(Span::new(tokens.join(" "), provenance, kind, literal_source));
            }
            Segment::Readings(readings) => {
                if let Some(span) = reading_group(readings, scope, base, algorithm) {
                    spans.push(span);
                }
            }
        }
    }
    spans
}

fn reading_group(
    readings: &BTreeMap<Rank, String>,
    scope: &UnitScope,
    base: Rank,
    algorithm: DiffAlgorithm,
) -> Option<Span> {
    let readers: BTreeMap<Rank, String> = readings
        .iter()
        .map(|(rank, text)| (*rank, words(text).join(" ")))
        .filter(|(_, text)| !text.is_empty())
        .collect();
    let provenance: Provenance = readers.keys().copied().collect();
    let first = provenance.earliest()?;

    let distinct: BTreeSet<&str> = readers.values().map(String::as_str).collect();
    if distinct.len() == 1 {
        let kind = scope.kind_for(&provenance);
        return Some(Span::new(readers[&first].clone(), provenance, kind, first));
    }

    let source = if readers.contains_key(&base) { base } else { first };
    let default = readers[&source].clone();
    let mut span = Span::new(default.clone(), provenance, SpanKind::Replaced, source);
    for (rank, text) in &readers {
        if *text != default {
            span.upsert_alternative(Alternative {
                witness: *rank,
                text: text.clone(),
                char_edits: char_edits(&default, text, algorithm),
            });
        }
    }
    Some(span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collate_core::VariantCategory;

    fn prov(ranks: &[u32]) -> Provenance {
        ranks.iter().map(|r| Rank(*r)).collect()
    }

    fn readings(pairs: &[(u32, &str)]) -> Segment {
        Segment::Readings(pairs.iter().map(|(r, t)| (Rank(*r), t.to_string())).collect())
    }

    fn build(segments: &[Segment], base: u32) -> Vec<Span> {
        let all = prov(&[1, 2, 3]);
        let present: Provenance = witness_texts(segments, &all)
            .into_iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(r, _)| r)
            .collect();
        let scope = UnitScope::new(present, Rank(1));
        build_spans(segments, &scope, Rank(base), DiffAlgorithm::Myers)
    }

    #[test]
    fn witness_texts_join_segments() {
        let segments = vec![
            Segment::Literal("he  said".into()),
            readings(&[(1, "yes"), (3, "no")]),
            Segment::Literal("then".into()),
        ];
        let texts = witness_texts(&segments, &prov(&[1, 2, 3]));
        assert_eq!(texts[&Rank(1)], "he said yes then");
        assert_eq!(texts[&Rank(2)], "he said then");
        assert_eq!(texts[&Rank(3)], "he said no then");
    }

    #[test]
    fn literal_is_original() {
        let spans = build(&[Segment::Literal("the text".into())], 1);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, SpanKind::Original);
        assert_eq!(spans[0].provenance, prov(&[1, 2, 3]));
    }

    #[test]
    fn single_reader_is_an_addition() {
        let spans = build(&[Segment::Literal("x".into()), readings(&[(2, "a new line")])], 1);
        assert_eq!(spans[1].kind, SpanKind::AddedIn(Rank(2)));
        assert_eq!(spans[1].category, VariantCategory::Addition);
        assert_eq!(spans[1].provenance, prov(&[2]));
    }

    #[test]
    fn agreeing_subset_without_later_witness_is_deletion() {
        let spans = build(&[Segment::Literal("x".into()), readings(&[(1, "old"), (2, "old")])], 1);
        assert_eq!(spans[1].kind, SpanKind::DeletedIn(Rank(3)));
        assert_eq!(spans[1].provenance, prov(&[1, 2]));
    }

    #[test]
    fn distinct_readings_become_replaced_with_base_default() {
        let segs = [readings(&[(1, "is"), (2, "was"), (3, "was")])];
        let spans = build(&segs, 1);
        let span = &spans[0];
        assert_eq!(span.kind, SpanKind::Replaced);
        assert_eq!(span.text, "is");
        assert_eq!(span.source, Rank(1));
        assert_eq!(span.alternatives.len(), 2);

        let spans = build(&segs, 3);
        assert_eq!(spans[0].text, "was");
        assert_eq!(spans[0].alternatives.len(), 1);
        assert_eq!(spans[0].alternatives[0].witness, Rank(1));
    }

    #[test]
    fn empty_group_emits_nothing() {
        let spans = build(&[Segment::Literal("x".into()), readings(&[(1, " "), (2, "")])], 1);
        assert_eq!(spans.len(), 1);
    }
}
