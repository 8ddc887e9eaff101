//! Collation result types: the output document of a run.
//!
//! Spans are rendered with witness ids instead of ranks, and span kinds as
//! their string tags (`original`, `added_in_<id>`, ...).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use collate_core::{CharEdit, Rank, Span, VariantCategory, Witness, WitnessSet};
use collate_merge::{UnitStats, VariantCounts};

// ---------------------------------------------------------------------------
// CollationMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollationMode {
    Free,
    Apparatus,
}

// ---------------------------------------------------------------------------
// Span records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeRecord {
    pub witness: String,
    pub text: String,
    pub char_edits: Vec<CharEdit>,
}

/// A [`Span`] with witness ids in place of ranks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    pub text: String,
    /// Ids of the witnesses reading the span, chronologically.
    pub provenance: Vec<String>,
    pub kind: String,
    pub category: VariantCategory,
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<AlternativeRecord>,
}

impl SpanRecord {
    pub fn from_span(span: &Span, witnesses: &WitnessSet) -> Self {
        let id = |rank: Rank| witnesses.id_of(rank).unwrap_or_default().to_string();
        Self {
            text: span.text.clone(),
            provenance: span.provenance.iter().map(id).collect(),
            kind: span.kind.tag(witnesses),
            category: span.category,
            source: id(span.source),
            alternatives: span
                .alternatives
                .iter()
                .map(|alt| AlternativeRecord {
                    witness: id(alt.witness),
                    text: alt.text.clone(),
                    char_edits: alt.char_edits.clone(),
                })
                .collect(),
        }
    }

    pub fn from_spans(spans: &[Span], witnesses: &WitnessSet) -> Vec<Self> {
        spans.iter().map(|s| Self::from_span(s, witnesses)).collect()
    }
}

// ---------------------------------------------------------------------------
// Unit records
// ---------------------------------------------------------------------------

/// One group of corresponding annotations, collated like a unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationRecord {
    pub index: usize,
    /// Witness id to that witness's annotation id.
    pub ids: BTreeMap<String, String>,
    pub spans: Vec<SpanRecord>,
    /// Witness id to raw annotation text; `None` where the witness has none.
    pub originals: BTreeMap<String, Option<String>>,
    pub scores: BTreeMap<String, f64>,
    pub new_material: bool,
}

/// The collated form of one content unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitRecord {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Witness id to the source reference of its unit, where given.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_refs: BTreeMap<String, String>,
    pub spans: Vec<SpanRecord>,
    /// Witness id to raw unit text; `None` where the witness lacks the unit.
    pub originals: BTreeMap<String, Option<String>>,
    pub annotations: Vec<AnnotationRecord>,
    /// Witness id to annotation id to the token index the note is anchored at.
    pub annotation_anchors: BTreeMap<String, BTreeMap<String, usize>>,
    /// Witness id to similarity with the unit's reference witness.
    pub scores: BTreeMap<String, f64>,
    /// `true` when the base witness does not carry the unit.
    pub new_material: bool,
    pub stats: UnitStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<String>,
}

// ---------------------------------------------------------------------------
// Metadata / CollationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WitnessDescriptor {
    pub id: String,
    pub rank: Rank,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&Witness> for WitnessDescriptor {
    fn from(w: &Witness) -> Self {
        Self {
            id: w.id.clone(),
            rank: w.rank,
            label: w.display_label().to_string(),
            color: w.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollationMetadata {
    /// Stable unique identifier for this run (UUIDv4).
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
    pub mode: CollationMode,
    pub base_witness: String,
    /// SHA256 of the effective configuration.
    pub config_digest: String,
    /// Witnesses in chronological order.
    pub witnesses: Vec<WitnessDescriptor>,
    pub total_units: usize,
    pub new_material_units: usize,
    /// Variant counts summed over all units.
    pub variant_statistics: VariantCounts,
}

/// The top-level output of a collation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollationResult {
    pub metadata: CollationMetadata,
    pub content: Vec<UnitRecord>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
