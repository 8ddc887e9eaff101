//! Span Unifier for free-text units.
//!
//! The earliest reading seeds the span list; every later reading is diffed
//! at word level against the reconstruction of the witness processed just
//! before it, and the differences are folded into the existing spans:
//!
//! - unchanged text gains the new witness in its provenance;
//! - text the new witness drops becomes `deleted_in_<w>`;
//! - reworded text becomes `replaced`, with the new wording kept as the
//!   witness's alternative;
//! - text only the new witness has becomes an `added_in_<w>` span.
//!
//! Spans are kept at single-token granularity while unifying (spans carrying
//! alternatives stay whole), so every change lines up with span boundaries.
//! Texts are space-separated tokens throughout; the coalescer produces the
//! final spacing.

use std::collections::BTreeMap;
use std::ops::Range;

use tracing::warn;

use collate_compare::diff::{char_edits, opcodes, OpTag};
use collate_compare::tokenize::words;
use collate_core::{text_fingerprint, Alternative, Anomaly, DiffAlgorithm, Provenance, Rank, Span, SpanKind};

use crate::scope::UnitScope;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Spans of one unit plus whatever went wrong while building them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unified {
    pub spans: Vec<Span>,
    pub anomalies: Vec<Anomaly>,
}

pub struct Unifier<'a> {
    scope: &'a UnitScope,
    algorithm: DiffAlgorithm,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl<'a> Unifier<'a> {
    pub fn new(scope: &'a UnitScope, algorithm: DiffAlgorithm) -> Self {
        Self { scope, algorithm }
    }

    /// Unify the raw readings of one unit. Order of `readings` does not
    /// matter; readings without any token are ignored.
    pub fn unify(&self, readings: &[(Rank, &str)]) -> Unified {
        let mut ordered: Vec<Reading<'_>> = readings
            .iter()
            .map(|&(rank, raw)| Reading {
                rank,
                raw,
                tokens: words(raw),
            })
            .filter(|r| !r.tokens.is_empty())
            .collect();
        ordered.sort_by_key(|r| r.rank);

        let Some(first) = ordered.first() else {
            return Unified::default();
        };
        let kind = self.scope.origin_kind(first.rank);

        let fingerprint = text_fingerprint(first.raw);
        if ordered[1..].iter().all(|r| text_fingerprint(r.raw) == fingerprint) {
            let provenance: Provenance = ordered.iter().map(|r| r.rank).collect();
            return Unified {
                spans: vec![Span::new(first.tokens.join(" "), provenance, kind, first.rank)],
                anomalies: Vec::new(),
            };
        }

        let mut cells: Vec<Span> = first
            .tokens
            .iter()
            .map(|t| Span::new(*t, Provenance::single(first.rank), kind, first.rank))
            .collect();
        let mut anomalies = Vec::new();
        for pair in ordered.windows(2) {
            cells = self.extend(cells, &pair[0], &pair[1], &mut anomalies);
        }

        Unified {
            spans: cells,
            anomalies,
        }
    }

    /// Fold `reading` into `cells`, comparing it with `partner`'s reading.
    fn extend<'t>(
        &self,
        cells: Vec<Span>,
        partner: &Reading<'t>,
        reading: &Reading<'t>,
        anomalies: &mut Vec<Anomaly>,
    ) -> Vec<Span> {
        let (p, w) = (partner.rank, reading.rank);
        let mut cells = explode(cells);

        // Owning cell of every token the partner reads, in reading order.
        let mut owner: Vec<usize> = Vec::new();
        let mut found: Vec<&str> = Vec::new();
        for (index, cell) in cells.iter().enumerate() {
            if let Some(text) = cell.reading_for(p) {
                for token in text.split_whitespace() {
                    owner.push(index);
                    found.push(token);
                }
            }
        }
        if found != partner.tokens {
            self.misaligned(w, p, partner.tokens.len(), found.len(), anomalies);
            cells.push(self.added(w, &reading.tokens));
            return cells;
        }
        let untouched = cells.clone();

        let changes = Changes::compute(&partner.tokens, &reading.tokens, self.algorithm);
        let segments = partner_cells(&owner);

        let mut before: Vec<Vec<Span>> = vec![Vec::new(); cells.len()];
        let mut after: Vec<Vec<Span>> = vec![Vec::new(); cells.len()];
        let mut removed = vec![false; cells.len()];

        for block in changes.blocks(&segments) {
            let (head, _) = &segments[block[0]];
            let start = segments[block[0]].1.start;
            let end = segments[block[block.len() - 1]].1.end;

            for range in changes.inserts_at(start) {
                before[*head].push(self.added(w, &reading.tokens[range.clone()]));
            }

            let text = changes.reading_within(start..end, &partner.tokens, &reading.tokens);
            let ids: Vec<usize> = block.iter().map(|&k| segments[k].0).collect();
            match merge_target(&mut cells, &ids, &mut removed) {
                Some(target) => self.apply(&mut cells[target], w, &text),
                None => {
                    for &id in &ids {
                        cells[id].set_kind(SpanKind::DeletedIn(w));
                    }
                    if !text.is_empty() {
                        after[ids[ids.len() - 1]].push(self.added(w, &text));
                    }
                }
            }
        }

        let tail: Vec<Span> = changes
            .inserts_at(partner.tokens.len())
            .map(|range| self.added(w, &reading.tokens[range.clone()]))
            .collect();

        let mut out = Vec::with_capacity(cells.len() + tail.len());
        for (index, cell) in cells.into_iter().enumerate() {
            out.append(&mut before[index]);
            if !removed[index] {
                out.push(cell);
            }
            out.append(&mut after[index]);
        }
        out.extend(tail);

        let rebuilt: Vec<&str> = out
            .iter()
            .filter_map(|cell| cell.reading_for(w))
            .flat_map(str::split_whitespace)
            .collect();
        if rebuilt != reading.tokens {
            let found = rebuilt.len();
            self.misaligned(w, p, reading.tokens.len(), found, anomalies);
            let mut cells = untouched;
            cells.push(self.added(w, &reading.tokens));
            return cells;
        }
        out
    }

    fn misaligned(&self, w: Rank, p: Rank, expected: usize, found: usize, anomalies: &mut Vec<Anomaly>) {
        warn!(
            witness = %w,
            partner = %p,
            expected,
            found,
            "reconstruction out of step; appending witness whole"
        );
        anomalies.push(Anomaly::MisalignedSegmentIndex {
            witness: w,
            partner: p,
            expected,
            found,
        });
    }

    /// Record that `w` reads `tokens` where the partner reads `cell`.
    fn apply(&self, cell: &mut Span, w: Rank, tokens: &[&str]) {
        if tokens.is_empty() {
            cell.set_kind(SpanKind::DeletedIn(w));
            return;
        }
        let text = tokens.join(" ");
        cell.provenance.insert(w);
        if text != cell.text {
            let edits = char_edits(&cell.text, &text, self.algorithm);
            cell.upsert_alternative(Alternative {
                witness: w,
                text,
                char_edits: edits,
            });
            if cell.kind != SpanKind::Replaced {
                cell.set_kind(SpanKind::Replaced);
            }
        }
    }

    fn added(&self, w: Rank, tokens: &[&str]) -> Span {
        Span::new(tokens.join(" "), Provenance::single(w), SpanKind::AddedIn(w), w)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct Reading<'t> {
    rank: Rank,
    raw: &'t str,
    tokens: Vec<&'t str>,
}

/// What became of one partner token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Equal,
    Deleted,
    /// Part of the replace group with this index.
    Replaced(usize),
}

/// Word diff of partner vs reading, indexed by partner token.
struct Changes {
    fate: Vec<Fate>,
    /// Per replace group: first partner token, reading token range.
    groups: Vec<(usize, Range<usize>)>,
    /// Partner position to the reading ranges inserted before it.
    inserts: BTreeMap<usize, Vec<Range<usize>>>,
}

impl Changes {
    fn compute(partner: &[&str], reading: &[&str], algorithm: DiffAlgorithm) -> Self {
        let mut fate = vec![Fate::Equal; partner.len()];
        let mut groups = Vec::new();
        let mut inserts: BTreeMap<usize, Vec<Range<usize>>> = BTreeMap::new();

        for op in opcodes(partner, reading, algorithm) {
            match op.tag {
                OpTag::Equal => {}
                OpTag::Delete => {
                    for pos in op.old {
                        fate[pos] = Fate::Deleted;
                    }
                }
                OpTag::Insert => inserts.entry(op.old.start).or_default().push(op.new),
                OpTag::Replace if op.old.is_empty() => {
                    inserts.entry(op.old.start).or_default().push(op.new)
                }
                OpTag::Replace => {
                    let group = groups.len();
                    for pos in op.old.clone() {
                        fate[pos] = Fate::Replaced(group);
                    }
                    groups.push((op.old.start, op.new));
                }
            }
        }

        Self {
            fate,
            groups,
            inserts,
        }
    }

    fn inserts_at(&self, pos: usize) -> impl Iterator<Item = &Range<usize>> {
        self.inserts.get(&pos).into_iter().flatten()
    }

    /// Group partner cells so that no replace group crosses a group border.
    fn blocks(&self, segments: &[(usize, Range<usize>)]) -> Vec<Vec<usize>> {
        let mut blocks: Vec<Vec<usize>> = Vec::new();
        for (k, (_, range)) in segments.iter().enumerate() {
            let straddles = range.start > 0
                && matches!(
                    (self.fate[range.start - 1], self.fate[range.start]),
                    (Fate::Replaced(a), Fate::Replaced(b)) if a == b
                );
            match blocks.last_mut() {
                Some(block) if straddles => block.push(k),
                _ => blocks.push(vec![k]),
            }
        }
        blocks
    }

    /// The reading's tokens standing in for partner tokens `span`, including
    /// insertions strictly inside it.
    fn reading_within<'t>(
        &self,
        span: Range<usize>,
        partner: &[&'t str],
        reading: &[&'t str],
    ) -> Vec<&'t str> {
        let mut out = Vec::new();
        for pos in span.clone() {
            if pos > span.start {
                for range in self.inserts_at(pos) {
                    out.extend_from_slice(&reading[range.clone()]);
                }
            }
            match self.fate[pos] {
                Fate::Equal => out.push(partner[pos]),
                Fate::Deleted => {}
                Fate::Replaced(group) => {
                    let (first, ref new) = self.groups[group];
                    if first == pos {
                        out.extend_from_slice(&reading[new.clone()]);
                    }
                }
            }
        }
        out
    }
}

/// Contiguous runs of partner tokens owned by the same cell.
fn partner_cells(owner: &[usize]) -> Vec<(usize, Range<usize>)> {
    let mut segments: Vec<(usize, Range<usize>)> = Vec::new();
    for (pos, &cell) in owner.iter().enumerate() {
        match segments.last_mut() {
            Some((last, range)) if *last == cell => range.end = pos + 1,
            _ => segments.push((cell, pos..pos + 1)),
        }
    }
    segments
}

/// Split alternative-free cells into one cell per token.
fn explode(cells: Vec<Span>) -> Vec<Span> {
    let mut out = Vec::with_capacity(cells.len());
    for cell in cells {
        if cell.has_alternatives() || !cell.text.contains(char::is_whitespace) {
            out.push(cell);
            continue;
        }
        for token in cell.text.split_whitespace() {
            let mut piece = cell.clone();
            piece.text = token.to_string();
            out.push(piece);
        }
    }
    out
}

/// Pick the cell a block's change is recorded on. Several cells are first
/// merged, which is only possible for adjacent alternative-free cells of the
/// same kind and provenance. `None` means the block cannot be merged.
fn merge_target(cells: &mut [Span], ids: &[usize], removed: &mut [bool]) -> Option<usize> {
    let (&head, rest) = ids.split_first()?;
    if rest.is_empty() {
        return Some(head);
    }

    let adjacent = ids.windows(2).all(|pair| pair[1] == pair[0] + 1);
    let uniform = ids.iter().all(|&id| {
        !cells[id].has_alternatives()
            && cells[id].provenance == cells[head].provenance
            && cells[id].kind == cells[head].kind
    });
    if !adjacent || !uniform {
        return None;
    }

    let joined = ids
        .iter()
        .map(|&id| cells[id].text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    cells[head].text = joined;
    for &id in rest {
        removed[id] = true;
    }
    Some(head)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use collate_core::VariantCategory;

    fn scope(ranks: &[u32]) -> UnitScope {
        UnitScope::new(ranks.iter().map(|r| Rank(*r)).collect(), Rank(1))
    }

    fn prov(ranks: &[u32]) -> Provenance {
        ranks.iter().map(|r| Rank(*r)).collect()
    }

    fn read(spans: &[Span], rank: u32) -> String {
        spans
            .iter()
            .filter_map(|s| s.reading_for(Rank(rank)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn unify(readings: &[(u32, &str)]) -> Unified {
        let ranks: Vec<u32> = readings.iter().map(|(r, _)| *r).collect();
        let scope = scope(&ranks);
        let input: Vec<(Rank, &str)> = readings.iter().map(|(r, t)| (Rank(*r), *t)).collect();
        Unifier::new(&scope, DiffAlgorithm::Myers).unify(&input)
    }

    #[test]
    fn added_word_gets_its_own_span() {
        let out = unify(&[(1, "the quick fox"), (2, "the quick brown fox")]);
        let texts: Vec<&str> = out.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["the", "quick", "brown", "fox"]);
        assert_eq!(out.spans[2].kind, SpanKind::AddedIn(Rank(2)));
        assert_eq!(out.spans[2].provenance, prov(&[2]));
        assert_eq!(out.spans[3].provenance, prov(&[1, 2]));
        assert_eq!(read(&out.spans, 2), "the quick brown fox");
        assert!(out.anomalies.is_empty());
    }

    #[test]
    fn reworded_word_becomes_replaced() {
        let out = unify(&[(1, "he is a king"), (2, "he was a king")]);
        let span = &out.spans[1];
        assert_eq!(span.text, "is");
        assert_eq!(span.kind, SpanKind::Replaced);
        assert_eq!(span.provenance, prov(&[1, 2]));
        assert_eq!(span.alternative_for(Rank(2)).unwrap().text, "was");
        assert!(!span.alternatives[0].char_edits.is_empty());
    }

    #[test]
    fn dropped_word_is_deleted_in_witness() {
        let out = unify(&[(1, "a b c"), (2, "a c")]);
        assert_eq!(out.spans[1].kind, SpanKind::DeletedIn(Rank(2)));
        assert_eq!(out.spans[1].category, VariantCategory::Deletion);
        assert_eq!(out.spans[1].provenance, prov(&[1]));
        assert_eq!(read(&out.spans, 2), "a c");
    }

    #[test]
    fn three_witnesses_compare_with_previous() {
        let out = unify(&[(1, "the old man"), (2, "the old grey man"), (3, "the grey man")]);
        assert_eq!(read(&out.spans, 1), "the old man");
        assert_eq!(read(&out.spans, 2), "the old grey man");
        assert_eq!(read(&out.spans, 3), "the grey man");
        let old = out.spans.iter().find(|s| s.text == "old").unwrap();
        assert_eq!(old.kind, SpanKind::DeletedIn(Rank(3)));
        let grey = out.spans.iter().find(|s| s.text == "grey").unwrap();
        assert_eq!(grey.provenance, prov(&[2, 3]));
    }

    #[test]
    fn identical_readings_take_the_fast_path() {
        let out = unify(&[(1, "same  text"), (2, "same text"), (3, " same text ")]);
        assert_eq!(out.spans.len(), 1);
        assert_eq!(out.spans[0].text, "same text");
        assert_eq!(out.spans[0].kind, SpanKind::Original);
        assert_eq!(out.spans[0].provenance, prov(&[1, 2, 3]));
    }

    #[test]
    fn unit_introduced_late_is_added_in_first_reader() {
        let out = unify(&[(2, "alpha beta"), (3, "alpha beta gamma")]);
        assert_eq!(out.spans[0].kind, SpanKind::AddedIn(Rank(2)));
        assert_eq!(out.spans.last().unwrap().kind, SpanKind::AddedIn(Rank(3)));
    }

    #[test]
    fn multi_word_replacement_merges_plain_cells() {
        let out = unify(&[(1, "one two three"), (2, "one 2 3")]);
        assert_eq!(out.spans.len(), 2);
        assert_eq!(out.spans[1].text, "two three");
        assert_eq!(out.spans[1].alternative_for(Rank(2)).unwrap().text, "2 3");
    }

    #[test]
    fn unmergeable_replacement_falls_back_to_delete_and_add() {
        let out = unify(&[(1, "one two three"), (2, "one TWO three"), (3, "one 2 3")]);
        assert_eq!(read(&out.spans, 1), "one two three");
        assert_eq!(read(&out.spans, 2), "one TWO three");
        assert_eq!(read(&out.spans, 3), "one 2 3");
        let added = out.spans.last().unwrap();
        assert_eq!(added.kind, SpanKind::AddedIn(Rank(3)));
        assert_eq!(added.text, "2 3");
    }

    #[test]
    fn empty_readings_are_ignored() {
        let out = unify(&[(1, "  "), (2, "")]);
        assert!(out.spans.is_empty());
        let out = unify(&[(1, "kept"), (2, " ")]);
        assert_eq!(out.spans[0].provenance, prov(&[1]));
    }

    #[test]
    fn inconsistent_partner_is_reported_and_recovered() {
        let scope = scope(&[1, 2]);
        let unifier = Unifier::new(&scope, DiffAlgorithm::Myers);
        let cells = vec![Span::new("a", prov(&[1]), SpanKind::Original, Rank(1))];
        let partner = Reading {
            rank: Rank(1),
            raw: "a b",
            tokens: vec!["a", "b"],
        };
        let reading = Reading {
            rank: Rank(2),
            raw: "a b c",
            tokens: vec!["a", "b", "c"],
        };
        let mut anomalies = Vec::new();
        let cells = unifier.extend(cells, &partner, &reading, &mut anomalies);
        assert_eq!(
            anomalies,
            vec![Anomaly::MisalignedSegmentIndex {
                witness: Rank(2),
                partner: Rank(1),
                expected: 2,
                found: 1,
            }]
        );
        assert_eq!(read(&cells, 2), "a b c");
    }
}
