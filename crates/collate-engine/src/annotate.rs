//! Annotation branch of a unit: align each witness's notes on the unit,
//! collate every group, and map note anchors to token indices.

use std::collections::BTreeMap;

use collate_compare::align::align;
use collate_compare::similarity::jaccard;
use collate_compare::tokenize::anchor_token_index;
use collate_core::{Annotation, Rank, WitnessSet};
use collate_merge::UnitPipeline;
use tracing::debug;

use crate::result::{AnnotationRecord, SpanRecord};

/// One witness's side of a unit: its raw unit text and its notes on it.
#[derive(Debug, Clone, Copy)]
pub struct NoteSource<'a> {
    pub text: &'a str,
    pub annotations: &'a [Annotation],
}

/// Annotation records and anchor map of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitNotes {
    pub records: Vec<AnnotationRecord>,
    pub anchors: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Collate the notes of one unit. `sources` holds an entry for every
/// witness carrying the unit.
pub fn collate_notes(
    sources: &BTreeMap<Rank, NoteSource<'_>>,
    witnesses: &WitnessSet,
    pipeline: &UnitPipeline,
    threshold: f64,
) -> UnitNotes {
    let items: BTreeMap<Rank, Vec<&Annotation>> = sources
        .iter()
        .filter(|(_, source)| !source.annotations.is_empty())
        .map(|(rank, source)| (*rank, source.annotations.iter().collect()))
        .collect();
    if items.is_empty() {
        return UnitNotes::default();
    }

    let order: Vec<Rank> = witnesses.ranks().collect();
    let alignments = align(&items, &order, witnesses.base(), threshold, jaccard);
    debug!(groups = alignments.len(), "annotations aligned");

    let id = |rank: Rank| witnesses.id_of(rank).unwrap_or_default().to_string();
    let records = alignments
        .iter()
        .enumerate()
        .map(|(index, alignment)| {
            let members: BTreeMap<Rank, &Annotation> = alignment
                .members
                .iter()
                .filter_map(|(rank, i)| items.get(rank).and_then(|list| list.get(*i)).map(|a| (*rank, *a)))
                .collect();
            let readings: Vec<(Rank, &str)> = members
                .iter()
                .map(|(rank, note)| (*rank, note.text.as_str()))
                .collect();
            let collated = pipeline.collate_readings(&readings);

            AnnotationRecord {
                index,
                ids: members.iter().map(|(rank, note)| (id(*rank), note.id.clone())).collect(),
                spans: SpanRecord::from_spans(&collated.spans, witnesses),
                originals: witnesses
                    .iter()
                    .map(|w| (w.id.clone(), members.get(&w.rank).map(|note| note.text.clone())))
                    .collect(),
                scores: alignment.scores.iter().map(|(rank, s)| (id(*rank), *s)).collect(),
                new_material: alignment.new_material,
            }
        })
        .collect();

    let anchors = sources
        .iter()
        .filter(|(_, source)| !source.annotations.is_empty())
        .map(|(rank, source)| {
            let positions = source
                .annotations
                .iter()
                .map(|note| (note.id.clone(), anchor_token_index(source.text, note.anchor)))
                .collect();
            (id(*rank), positions)
        })
        .collect();

    UnitNotes { records, anchors }
}
