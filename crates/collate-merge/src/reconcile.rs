//! Conflict Reconciler and replacement splitter.
//!
//! Both passes re-diff span text at word level and redistribute it over
//! smaller spans so that shared words end up in shared spans.

use collate_compare::diff::{char_edits, opcodes, OpTag};
use collate_compare::tokenize::words;
use collate_core::{Alternative, DiffAlgorithm, Provenance, Span, SpanKind, VariantCategory};

use crate::scope::UnitScope;

/// Merge adjacent additions made by disjoint sets of witnesses.
///
/// Two neighbouring addition spans are diffed word by word. Spans carrying
/// alternatives are always `replaced`, so they never qualify. Equal runs become one span read by both sides, attributed to the
/// earliest contributor; differing runs stay with their own side.
pub fn reconcile_additions(spans: Vec<Span>, scope: &UnitScope, algorithm: DiffAlgorithm) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len());
    let mut i = 0;
    while i < spans.len() {
        if i + 1 < spans.len() && conflicting(&spans[i], &spans[i + 1]) {
            out.extend(merge_pair(&spans[i], &spans[i + 1], scope, algorithm));
            i += 2;
        } else {
            out.push(spans[i].clone());
            i += 1;
        }
    }
    out
}

/// Split `replaced` spans with a single alternative at word granularity.
///
/// Words shared by the default and the alternative move into spans read by
/// the whole provenance; only the differing runs stay replaced. Spans whose
/// two wordings share no word are left as they are.
pub fn split_replacements(spans: Vec<Span>, scope: &UnitScope, algorithm: DiffAlgorithm) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        if span.kind != SpanKind::Replaced || span.alternatives.len() != 1 {
            out.push(span);
            continue;
        }
        let alt = &span.alternatives[0];
        let defaults = span.provenance.difference(&Provenance::single(alt.witness));
        let old = words(&span.text);
        let new = words(&alt.text);
        let ops = opcodes(&old, &new, algorithm);
        if defaults.is_empty() || !ops.iter().any(|op| op.tag == OpTag::Equal) {
            out.push(span);
            continue;
        }

        for op in ops {
            let old_text = old[op.old].join(" ");
            let new_text = new[op.new].join(" ");
            match op.tag {
                OpTag::Equal => {
                    let kind = scope.kind_for(&span.provenance);
                    out.push(Span::new(old_text, span.provenance.clone(), kind, span.source));
                }
                OpTag::Replace => {
                    let mut piece = Span::new(old_text.clone(), span.provenance.clone(), SpanKind::Replaced, span.source);
                    piece.upsert_alternative(Alternative {
                        witness: alt.witness,
                        char_edits: char_edits(&old_text, &new_text, algorithm),
                        text: new_text,
                    });
                    out.push(piece);
                }
                OpTag::Delete => {
                    let kind = scope.kind_for(&defaults);
                    out.push(Span::new(old_text, defaults.clone(), kind, span.source));
                }
                OpTag::Insert => {
                    let readers = Provenance::single(alt.witness);
                    let kind = scope.kind_for(&readers);
                    out.push(Span::new(new_text, readers, kind, alt.witness));
                }
            }
        }
    }
    out
}

fn conflicting(a: &Span, b: &Span) -> bool {
    a.category == VariantCategory::Addition
        && b.category == VariantCategory::Addition
        && a.provenance.is_disjoint(&b.provenance)
}

fn merge_pair(a: &Span, b: &Span, scope: &UnitScope, algorithm: DiffAlgorithm) -> Vec<Span> {
    let left = words(&a.text);
    let right = words(&b.text);
    let ops = opcodes(&left, &right, algorithm);
    if !ops.iter().any(|op| op.tag == OpTag::Equal) {
        return vec![a.clone(), b.clone()];
    }

    let shared = a.provenance.union(&b.provenance);
    let shared_kind = scope.kind_for(&shared);
    let shared_source = shared.earliest().unwrap_or(a.source);

    let mut out = Vec::new();
    for op in ops {
        let left_part = &left[op.old];
        let right_part = &right[op.new];
        match op.tag {
            OpTag::Equal => out.push(Span::new(
                left_part.join(" "),
                shared.clone(),
                shared_kind,
                shared_source,
            )),
            OpTag::Replace => {
                out.push(piece(a, left_part));
                out.push(piece(b, right_part));
            }
            OpTag::Delete => out.push(piece(a, left_part)),
            OpTag::Insert => out.push(piece(b, right_part)),
        }
    }
    out
}

fn piece(template: &Span, tokens: &[&str]) -> Span {
    let mut span = template.clone();
    span.text = tokens.join(" ");
    span
}
