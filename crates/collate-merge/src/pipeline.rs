//! Per-unit pipeline: build spans, reconcile, split, classify, coalesce and
//! measure.

use std::collections::BTreeMap;

use collate_core::{Anomaly, CollateConfig, DiffAlgorithm, Provenance, Rank, Span, WitnessSet};

use crate::apparatus::{build_spans, witness_texts, Segment};
use crate::classify::Classifier;
use crate::coalesce::coalesce;
use crate::reconcile::{reconcile_additions, split_replacements};
use crate::scope::UnitScope;
use crate::stats::{UnitStats, VariantCounts};
use crate::unify::Unifier;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The finished collation of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CollatedUnit {
    pub spans: Vec<Span>,
    /// Witnesses with any text in the unit.
    pub present: Provenance,
    /// Witness the similarity figure is measured from.
    pub reference: Option<Rank>,
    pub stats: UnitStats,
    pub anomalies: Vec<Anomaly>,
}

/// Settings shared by every unit of a run. Cheap to share across threads.
#[derive(Debug, Clone)]
pub struct UnitPipeline {
    algorithm: DiffAlgorithm,
    split: bool,
    classifier: Classifier,
    earliest: Rank,
    base: Rank,
    all: Provenance,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl UnitPipeline {
    pub fn new(config: &CollateConfig, witnesses: &WitnessSet) -> Self {
        Self {
            algorithm: config.diff_algorithm,
            split: config.split_replacements,
            classifier: Classifier::from_config(config),
            earliest: witnesses.earliest(),
            base: witnesses.base(),
            all: witnesses.ranks().collect(),
        }
    }

    /// Collate raw per-witness readings of one unit.
    pub fn collate_readings(&self, readings: &[(Rank, &str)]) -> CollatedUnit {
        let present: Provenance = readings
            .iter()
            .filter(|(_, text)| text.split_whitespace().next().is_some())
            .map(|(rank, _)| *rank)
            .collect();
        let scope = UnitScope::new(present, self.earliest);
        let unified = Unifier::new(&scope, self.algorithm).unify(readings);
        self.finish(unified.spans, scope, unified.anomalies)
    }

    /// Collate a pre-aligned unit. Also returns each witness's raw text.
    pub fn collate_apparatus(&self, segments: &[Segment]) -> (CollatedUnit, BTreeMap<Rank, String>) {
        let texts = witness_texts(segments, &self.all);
        let present: Provenance = texts
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(rank, _)| *rank)
            .collect();
        let scope = UnitScope::new(present, self.earliest);
        let spans = build_spans(segments, &scope, self.base, self.algorithm);
        (self.finish(spans, scope, Vec::new()), texts)
    }

    fn finish(&self, spans: Vec<Span>, scope: UnitScope, anomalies: Vec<Anomaly>) -> CollatedUnit {
        let spans = reconcile_additions(spans, &scope, self.algorithm);
        let mut spans = if self.split {
            split_replacements(spans, &scope, self.algorithm)
        } else {
            spans
        };
        self.classifier.classify_spans(&mut spans);
        let spans = coalesce(spans, self.algorithm);

        let reference = if scope.present.contains(self.base) {
            Some(self.base)
        } else {
            scope.present.earliest()
        };
        let stats = match reference {
            Some(rank) => UnitStats::compute(&spans, &scope, rank),
            None => UnitStats {
                variants: VariantCounts::default(),
                similarity: 1.0,
            },
        };

        CollatedUnit {
            spans,
            present: scope.present,
            reference,
            stats,
            anomalies,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::reconstruct;
    use collate_compare::similarity::edit_distance;
    use collate_compare::tokenize::normalize_text;
    use collate_core::{SpanKind, VariantCategory, Witness};
    use proptest::prelude::*;

    fn witnesses() -> WitnessSet {
        WitnessSet::new(vec![Witness::new("A", 1), Witness::new("B", 2), Witness::new("C", 3)]).unwrap()
    }

    fn pipeline() -> UnitPipeline {
        UnitPipeline::new(&CollateConfig::default(), &witnesses())
    }

    fn collate(readings: &[(u32, &str)]) -> CollatedUnit {
        let input: Vec<(Rank, &str)> = readings.iter().map(|(r, t)| (Rank(*r), *t)).collect();
        pipeline().collate_readings(&input)
    }

    fn assert_round_trip(unit: &CollatedUnit, readings: &[(u32, &str)]) {
        for (rank, raw) in readings {
            assert_eq!(reconstruct(&unit.spans, Rank(*rank)), normalize_text(raw), "witness {rank}");
        }
    }

    #[test]
    fn single_addition_is_counted_once() {
        let readings = [(1, "the quick fox"), (2, "the quick brown fox")];
        let unit = collate(&readings);
        assert_eq!(unit.stats.variants, VariantCounts { addition: 1, ..Default::default() });
        let texts: Vec<&str> = unit.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["the quick", " brown", " fox"]);
        assert_eq!(unit.spans[1].kind, SpanKind::AddedIn(Rank(2)));
        assert_round_trip(&unit, &readings);
    }

    #[test]
    fn one_letter_change_is_orthographic() {
        let readings = [(1, "he is a king"), (2, "he was a king")];
        let unit = collate(&readings);
        let variants: Vec<&Span> = unit.spans.iter().filter(|s| s.category.is_variant()).collect();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].category, VariantCategory::Orthographic);
        assert_eq!(variants[0].text.trim(), "is");
        assert_eq!(edit_distance("is", "was"), 2);
        assert!(!variants[0].alternatives[0].char_edits.is_empty());
        assert_round_trip(&unit, &readings);
    }

    #[test]
    fn identical_witnesses_give_one_original_span() {
        let readings = [(1, "same words here"), (2, "same words here"), (3, "same words here")];
        let unit = collate(&readings);
        assert_eq!(unit.spans.len(), 1);
        assert_eq!(unit.spans[0].kind, SpanKind::Original);
        assert_eq!(unit.stats.variants.total(), 0);
        assert_eq!(unit.stats.similarity, 1.0);
    }

    #[test]
    fn unit_only_in_latest_witness_is_added_there() {
        let unit = collate(&[(3, "brand new paragraph")]);
        assert_eq!(unit.spans.len(), 1);
        assert_eq!(unit.spans[0].kind, SpanKind::AddedIn(Rank(3)));
        assert_eq!(unit.spans[0].provenance, Provenance::single(Rank(3)));
        assert_eq!(unit.reference, Some(Rank(3)));
    }

    #[test]
    fn punctuation_round_trips() {
        let readings = [
            (1, "Er kam , sah und siegte ."),
            (2, "Er kam, sah, und siegte!"),
            (3, "Er kam und siegte ;  dann ging er."),
        ];
        let unit = collate(&readings);
        assert_round_trip(&unit, &readings);
    }

    #[test]
    fn repeated_words_round_trip() {
        let four = WitnessSet::new((1..=4).map(|r| Witness::new(format!("W{r}"), r)).collect()).unwrap();
        let pipeline = UnitPipeline::new(&CollateConfig::default(), &four);
        let cases: [&[(u32, &str)]; 3] = [
            &[(1, "a a"), (2, "a, a"), (3, "a a a a a,"), (4, "a, b. a,")],
            &[(2, "fox, fox"), (3, "fox fox fox,")],
            &[(1, "the the king"), (2, "king the the"), (3, "the king king the"), (4, "the")],
        ];
        for readings in cases {
            let input: Vec<(Rank, &str)> = readings.iter().map(|(r, t)| (Rank(*r), *t)).collect();
            let unit = pipeline.collate_readings(&input);
            assert_round_trip(&unit, readings);
            assert!(unit.anomalies.is_empty(), "{readings:?}: {:?}", unit.anomalies);
        }
    }

    #[test]
    fn neighbouring_rewordings_stay_apart() {
        let segments = vec![
            Segment::Literal("he".into()),
            Segment::Readings([(Rank(1), "is".to_string()), (Rank(2), "was".to_string())].into_iter().collect()),
            Segment::Readings([(Rank(1), "king".to_string()), (Rank(2), "kong".to_string())].into_iter().collect()),
            Segment::Literal("here".into()),
        ];
        let (unit, _) = pipeline().collate_apparatus(&segments);
        let variants: Vec<&Span> = unit.spans.iter().filter(|s| s.kind == SpanKind::Replaced).collect();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].alternatives[0].text.trim(), "was");
        assert_eq!(variants[1].alternatives[0].text.trim(), "kong");
        assert_eq!(unit.stats.variants.orthographic, 2);
        assert_eq!(reconstruct(&unit.spans, Rank(2)), "he was kong here");
    }

    #[test]
    fn apparatus_additions_are_reconciled() {
        let segments = vec![
            Segment::Literal("x".into()),
            Segment::Readings([(Rank(2), "a new line".to_string())].into_iter().collect()),
            Segment::Readings([(Rank(3), "a newer line".to_string())].into_iter().collect()),
        ];
        let (unit, texts) = pipeline().collate_apparatus(&segments);
        let texts_out: Vec<&str> = unit.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts_out, vec!["x", " a", " new", " newer", " line"]);
        let both: Provenance = [Rank(2), Rank(3)].into_iter().collect();
        assert_eq!(unit.spans[1].provenance, both);
        assert_eq!(unit.spans[1].source, Rank(2));
        assert_eq!(unit.spans[4].provenance, both);
        for (rank, raw) in &texts {
            assert_eq!(reconstruct(&unit.spans, *rank), normalize_text(raw));
        }
        assert_eq!(reconstruct(&unit.spans, Rank(1)), "x");
    }

    #[test]
    fn apparatus_replacement_is_split_and_classified() {
        let segments = vec![Segment::Readings(
            [
                (Rank(1), "the old grey house".to_string()),
                (Rank(2), "the olde grey house".to_string()),
            ]
            .into_iter()
            .collect(),
        )];
        let (unit, _) = pipeline().collate_apparatus(&segments);
        let variant = unit.spans.iter().find(|s| s.kind == SpanKind::Replaced).unwrap();
        assert_eq!(variant.text.trim(), "old");
        assert_eq!(variant.category, VariantCategory::Orthographic);
        assert_eq!(reconstruct(&unit.spans, Rank(2)), "the olde grey house");
    }

    #[test]
    fn splitting_can_be_disabled() {
        let config = CollateConfig {
            split_replacements: false,
            ..CollateConfig::default()
        };
        let pipeline = UnitPipeline::new(&config, &witnesses());
        let segments = vec![Segment::Readings(
            [
                (Rank(1), "the old grey house".to_string()),
                (Rank(2), "the olde grey house".to_string()),
            ]
            .into_iter()
            .collect(),
        )];
        let (unit, _) = pipeline.collate_apparatus(&segments);
        assert_eq!(unit.spans.len(), 1);
        assert_eq!(unit.spans[0].category, VariantCategory::Substitution);
    }

    fn reading_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            proptest::sample::select(vec![
                "the", "a", "fox", "fox,", "king", ",", ".", "is", "was", "Tübingen", "und",
            ]),
            0..8,
        )
        .prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn every_witness_round_trips(a in reading_strategy(), b in reading_strategy(), c in reading_strategy()) {
            let readings = [(1, a.as_str()), (2, b.as_str()), (3, c.as_str())];
            let unit = collate(&readings);
            for (rank, raw) in &readings {
                prop_assert_eq!(reconstruct(&unit.spans, Rank(*rank)), normalize_text(raw));
            }
            prop_assert!(unit.anomalies.is_empty());
        }

        #[test]
        fn coalesce_is_idempotent(a in reading_strategy(), b in reading_strategy(), c in reading_strategy()) {
            let unit = collate(&[(1, a.as_str()), (2, b.as_str()), (3, c.as_str())]);
            let again = coalesce(unit.spans.clone(), DiffAlgorithm::Myers);
            prop_assert_eq!(again, unit.spans);
        }

        #[test]
        fn no_adjacent_spans_share_a_shape(a in reading_strategy(), b in reading_strategy()) {
            let unit = collate(&[(1, a.as_str()), (2, b.as_str())]);
            for pair in unit.spans.windows(2) {
                prop_assert!(!pair[0].same_shape(&pair[1]));
            }
        }
    }
}
