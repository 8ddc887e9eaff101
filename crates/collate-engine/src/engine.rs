//! Batch collation engine.
//!
//! [`CollationEngine`] is the primary entry point. It validates the witness
//! list, aligns content units (free mode) or resolves pre-aligned units
//! (apparatus mode), runs every unit through the
//! [`UnitPipeline`](collate_merge::UnitPipeline), optionally in parallel
//! with rayon, and assembles a [`CollationResult`].

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use collate_compare::align::{align, Alignment};
use collate_compare::similarity::jaccard;
use collate_core::{
    Annotation, ApparatusSegment, ApparatusUnit, CollateConfig, CollateError, CollationInput,
    ContentUnit, InputSource, Rank, Result, WitnessSet,
};
use collate_merge::{CollatedUnit, Segment, UnitPipeline, VariantCounts};

use crate::annotate::{collate_notes, NoteSource};
use crate::result::{
    CollationMetadata, CollationMode, CollationResult, SpanRecord, UnitRecord, WitnessDescriptor,
};

// ---------------------------------------------------------------------------
// Unit jobs
// ---------------------------------------------------------------------------

/// One unit of work, with witness ids already resolved.
enum UnitJob<'a> {
    Free {
        alignment: Alignment,
        units: BTreeMap<Rank, &'a ContentUnit>,
    },
    Apparatus {
        label: Option<String>,
        segments: Vec<Segment>,
        annotations: BTreeMap<Rank, &'a [Annotation]>,
    },
}

// ---------------------------------------------------------------------------
// CollationEngine
// ---------------------------------------------------------------------------

/// Deterministic collation engine. Parallel runs produce the same output as
/// sequential ones.
pub struct CollationEngine {
    config: CollateConfig,
}

impl CollationEngine {
    /// Create an engine, rejecting an invalid configuration.
    pub fn new(config: CollateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CollateConfig {
        &self.config
    }

    /// Collate every unit of `input` and produce a [`CollationResult`].
    pub fn collate(&self, input: &CollationInput) -> Result<CollationResult> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let mut witnesses = WitnessSet::new(input.witnesses.clone())?;
        if let Some(id) = &self.config.base_witness {
            witnesses = witnesses.with_base(id)?;
        }
        let pipeline = UnitPipeline::new(&self.config, &witnesses);
        info!(%run_id, witnesses = witnesses.len(), "collation started");

        let (mode, jobs) = match &input.source {
            InputSource::Free { units } => (CollationMode::Free, self.free_jobs(units, &witnesses)?),
            InputSource::Apparatus { units } => {
                (CollationMode::Apparatus, apparatus_jobs(units, &witnesses)?)
            }
        };

        let content = self.process(&jobs, |index, job| {
            self.build_record(index, job, &witnesses, &pipeline)
        })?;

        let mut variant_statistics = VariantCounts::default();
        for record in &content {
            variant_statistics.absorb(&record.stats.variants);
        }
        let new_material_units = content.iter().filter(|r| r.new_material).count();
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            %run_id,
            units = content.len(),
            variants = variant_statistics.total(),
            elapsed_ms,
            "collation finished"
        );

        Ok(CollationResult {
            metadata: CollationMetadata {
                run_id,
                generated_at: Utc::now(),
                elapsed_ms,
                mode,
                base_witness: witnesses.id_of(witnesses.base()).unwrap_or_default().to_string(),
                config_digest: self.config.digest()?,
                witnesses: witnesses.iter().map(WitnessDescriptor::from).collect(),
                total_units: content.len(),
                new_material_units,
                variant_statistics,
            },
            content,
        })
    }

    /// Align the free-mode unit lists into one job per alignment.
    fn free_jobs<'a>(
        &self,
        units: &'a BTreeMap<String, Vec<ContentUnit>>,
        witnesses: &WitnessSet,
    ) -> Result<Vec<UnitJob<'a>>> {
        let mut items: BTreeMap<Rank, Vec<&'a ContentUnit>> = BTreeMap::new();
        for (id, list) in units {
            items.insert(witnesses.resolve(id)?, list.iter().collect());
        }

        let order: Vec<Rank> = witnesses.ranks().collect();
        let alignments = align(
            &items,
            &order,
            witnesses.base(),
            self.config.unit_threshold,
            jaccard,
        );
        debug!(units = alignments.len(), "content units aligned");

        Ok(alignments
            .into_iter()
            .map(|alignment| {
                let units = alignment
                    .members
                    .iter()
                    .filter_map(|(rank, i)| {
                        items.get(rank).and_then(|list| list.get(*i)).map(|u| (*rank, *u))
                    })
                    .collect();
                UnitJob::Free { alignment, units }
            })
            .collect())
    }

    /// Run `build` over every job, on the rayon pool when `parallel` is set.
    fn process<J, F>(&self, jobs: &[J], build: F) -> Result<Vec<UnitRecord>>
    where
        J: Sync,
        F: Fn(usize, &J) -> UnitRecord + Sync + Send,
    {
        if !self.config.parallel {
            return Ok(jobs.iter().enumerate().map(|(i, job)| build(i, job)).collect());
        }

        let run = || -> Vec<UnitRecord> {
            let mut indexed: Vec<(usize, UnitRecord)> = jobs
                .par_iter()
                .enumerate()
                .map(|(i, job)| (i, build(i, job)))
                .collect();
            // Sort by index to restore unit order.
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, record)| record).collect()
        };

        match self.config.worker_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| CollateError::InvalidConfig(e.to_string()))?;
                Ok(pool.install(run))
            }
            None => Ok(run()),
        }
    }

    fn build_record(
        &self,
        index: usize,
        job: &UnitJob<'_>,
        witnesses: &WitnessSet,
        pipeline: &UnitPipeline,
    ) -> UnitRecord {
        let id = |rank: Rank| witnesses.id_of(rank).unwrap_or_default().to_string();

        match job {
            UnitJob::Free { alignment, units } => {
                let readings: Vec<(Rank, &str)> = units
                    .iter()
                    .map(|(rank, unit)| (*rank, unit.text.as_str()))
                    .collect();
                let collated = pipeline.collate_readings(&readings);

                let sources: BTreeMap<Rank, NoteSource<'_>> = units
                    .iter()
                    .map(|(rank, unit)| {
                        let source = NoteSource {
                            text: unit.text.as_str(),
                            annotations: unit.annotations.as_slice(),
                        };
                        (*rank, source)
                    })
                    .collect();
                let notes = collate_notes(&sources, witnesses, pipeline, self.config.annotation_threshold);

                let mut scores: BTreeMap<String, f64> =
                    alignment.scores.iter().map(|(rank, s)| (id(*rank), *s)).collect();
                scores.insert(id(alignment.reference), 1.0);

                let record = UnitRecord {
                    index,
                    label: None,
                    source_refs: units
                        .iter()
                        .filter_map(|(rank, unit)| unit.source_ref.clone().map(|r| (id(*rank), r)))
                        .collect(),
                    spans: Vec::new(),
                    originals: witnesses
                        .iter()
                        .map(|w| (w.id.clone(), units.get(&w.rank).map(|u| u.text.clone())))
                        .collect(),
                    annotations: notes.records,
                    annotation_anchors: notes.anchors,
                    scores,
                    new_material: alignment.new_material,
                    stats: collated.stats,
                    anomalies: Vec::new(),
                };
                finish_record(record, &collated, witnesses)
            }

            UnitJob::Apparatus {
                label,
                segments,
                annotations,
            } => {
                let (collated, texts) = pipeline.collate_apparatus(segments);

                let sources: BTreeMap<Rank, NoteSource<'_>> = annotations
                    .iter()
                    .map(|(rank, notes)| {
                        let text = texts.get(rank).map(String::as_str).unwrap_or_default();
                        (*rank, NoteSource { text, annotations: *notes })
                    })
                    .collect();
                let notes = collate_notes(&sources, witnesses, pipeline, self.config.annotation_threshold);

                let reference_text = collated
                    .reference
                    .and_then(|rank| texts.get(&rank))
                    .map(String::as_str)
                    .unwrap_or_default();
                let scores: BTreeMap<String, f64> = collated
                    .present
                    .iter()
                    .filter_map(|rank| {
                        texts
                            .get(&rank)
                            .map(|text| (id(rank), jaccard(reference_text, text)))
                    })
                    .collect();

                let record = UnitRecord {
                    index,
                    label: label.clone(),
                    source_refs: BTreeMap::new(),
                    spans: Vec::new(),
                    originals: witnesses
                        .iter()
                        .map(|w| {
                            let text = texts.get(&w.rank).filter(|t| !t.is_empty()).cloned();
                            (w.id.clone(), text)
                        })
                        .collect(),
                    annotations: notes.records,
                    annotation_anchors: notes.anchors,
                    scores,
                    new_material: !collated.present.contains(witnesses.base()),
                    stats: collated.stats,
                    anomalies: Vec::new(),
                };
                finish_record(record, &collated, witnesses)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Resolve witness ids of pre-aligned units.
fn apparatus_jobs<'a>(units: &'a [ApparatusUnit], witnesses: &WitnessSet) -> Result<Vec<UnitJob<'a>>> {
    units
        .iter()
        .map(|unit| -> Result<UnitJob<'a>> {
            let segments = unit
                .segments
                .iter()
                .map(|segment| match segment {
                    ApparatusSegment::Literal { text } => Ok(Segment::Literal(text.clone())),
                    ApparatusSegment::Readings { readings } => readings
                        .iter()
                        .map(|(id, text)| witnesses.resolve(id).map(|rank| (rank, text.clone())))
                        .collect::<Result<BTreeMap<_, _>>>()
                        .map(Segment::Readings),
                })
                .collect::<Result<Vec<_>>>()?;
            let annotations = unit
                .annotations
                .iter()
                .map(|(id, notes)| witnesses.resolve(id).map(|rank| (rank, notes.as_slice())))
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok(UnitJob::Apparatus {
                label: unit.label.clone(),
                segments,
                annotations,
            })
        })
        .collect()
}

/// Fill in spans and anomalies, logging each anomaly.
fn finish_record(mut record: UnitRecord, collated: &CollatedUnit, witnesses: &WitnessSet) -> UnitRecord {
    record.spans = SpanRecord::from_spans(&collated.spans, witnesses);
    record.anomalies = collated
        .anomalies
        .iter()
        .map(|anomaly| {
            let description = anomaly.describe(witnesses);
            warn!(unit = record.index, "{description}");
            description
        })
        .collect();
    debug!(
        unit = record.index,
        spans = record.spans.len(),
        variants = record.stats.variants.total(),
        "unit collated"
    );
    record
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
