//! Span model: the unit of the unified text.
//!
//! A unit's collated text is an ordered list of [`Span`]s. Each span records
//! which witnesses read it ([`Provenance`]), how it came about ([`SpanKind`]),
//! its [`VariantCategory`], and per-witness [`Alternative`] wordings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::witness::{Rank, WitnessSet};

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// The set of witnesses that read a span, iterated chronologically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provenance(BTreeSet<Rank>);

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(rank: Rank) -> Self {
        let mut set = BTreeSet::new();
        set.insert(rank);
        Self(set)
    }

    pub fn insert(&mut self, rank: Rank) -> bool {
        self.0.insert(rank)
    }

    pub fn remove(&mut self, rank: Rank) -> bool {
        self.0.remove(&rank)
    }

    pub fn contains(&self, rank: Rank) -> bool {
        self.0.contains(&rank)
    }

    /// The oldest witness in the set.
    pub fn earliest(&self) -> Option<Rank> {
        self.0.iter().next().copied()
    }

    pub fn is_disjoint(&self, other: &Provenance) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn union(&self, other: &Provenance) -> Provenance {
        Provenance(self.0.union(&other.0).copied().collect())
    }

    pub fn difference(&self, other: &Provenance) -> Provenance {
        Provenance(self.0.difference(&other.0).copied().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = Rank> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Rank> for Provenance {
    fn from_iter<I: IntoIterator<Item = Rank>>(iter: I) -> Self {
        Provenance(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// SpanKind / VariantCategory
// ---------------------------------------------------------------------------

/// How a span came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "witness", rename_all = "snake_case")]
pub enum SpanKind {
    /// Present from the earliest witness on.
    Original,
    /// First introduced by the given witness.
    AddedIn(Rank),
    /// Reworded by later witnesses; the wordings live in `alternatives`.
    Replaced,
    /// Dropped by the given witness.
    DeletedIn(Rank),
}

impl SpanKind {
    /// Output tag: `original`, `replaced`, `added_in_<id>` or `deleted_in_<id>`.
    pub fn tag(&self, witnesses: &WitnessSet) -> String {
        match self {
            SpanKind::Original => "original".to_string(),
            SpanKind::Replaced => "replaced".to_string(),
            SpanKind::AddedIn(rank) => {
                format!("added_in_{}", witnesses.id_of(*rank).unwrap_or("unknown"))
            }
            SpanKind::DeletedIn(rank) => {
                format!("deleted_in_{}", witnesses.id_of(*rank).unwrap_or("unknown"))
            }
        }
    }
}

/// Nature of the difference a span represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantCategory {
    None,
    Addition,
    Deletion,
    Substitution,
    Orthographic,
    Lexical,
}

impl VariantCategory {
    /// The category implied by `kind` alone. Replacements start out as
    /// substitutions until the classifier looks at their wording.
    pub fn for_kind(kind: SpanKind) -> Self {
        match kind {
            SpanKind::Original => VariantCategory::None,
            SpanKind::AddedIn(_) => VariantCategory::Addition,
            SpanKind::DeletedIn(_) => VariantCategory::Deletion,
            SpanKind::Replaced => VariantCategory::Substitution,
        }
    }

    pub fn is_variant(&self) -> bool {
        *self != VariantCategory::None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantCategory::None => "none",
            VariantCategory::Addition => "addition",
            VariantCategory::Deletion => "deletion",
            VariantCategory::Substitution => "substitution",
            VariantCategory::Orthographic => "orthographic",
            VariantCategory::Lexical => "lexical",
        }
    }
}

// ---------------------------------------------------------------------------
// Alternatives
// ---------------------------------------------------------------------------

/// Character-level edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOp {
    Replace,
    Delete,
    Insert,
}

/// One character-level edit turning the span's default text into an
/// alternative. `char_index` counts characters of the default text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharEdit {
    pub char_index: usize,
    pub op: EditOp,
    /// Characters introduced by the edit (empty for deletions).
    pub text: String,
    /// Characters removed by the edit (empty for insertions).
    pub from: String,
}

/// A witness-specific wording of a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub witness: Rank,
    pub text: String,
    #[serde(default)]
    pub char_edits: Vec<CharEdit>,
}

impl Alternative {
    /// `true` when both give the same witness the same wording. Character
    /// edits and surrounding whitespace are ignored.
    pub fn same_reading(&self, other: &Alternative) -> bool {
        self.witness == other.witness && self.text.trim() == other.text.trim()
    }
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// A contiguous piece of unified text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Default wording.
    pub text: String,
    pub provenance: Provenance,
    pub kind: SpanKind,
    pub category: VariantCategory,
    /// Witness the default wording was taken from.
    pub source: Rank,
    /// Alternative wordings, sorted by witness rank, at most one per witness.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Alternative>,
}

impl Span {
    /// A span with no alternatives whose category follows from `kind`.
    pub fn new(text: impl Into<String>, provenance: Provenance, kind: SpanKind, source: Rank) -> Self {
        Self {
            text: text.into(),
            provenance,
            kind,
            category: VariantCategory::for_kind(kind),
            source,
            alternatives: Vec::new(),
        }
    }

    /// Change the kind and reset the category to the kind's default.
    pub fn set_kind(&mut self, kind: SpanKind) {
        self.kind = kind;
        self.category = VariantCategory::for_kind(kind);
    }

    pub fn has_alternatives(&self) -> bool {
        !self.alternatives.is_empty()
    }

    pub fn alternative_for(&self, rank: Rank) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.witness == rank)
    }

    /// The wording `rank` reads here, or `None` if it does not read the span.
    pub fn reading_for(&self, rank: Rank) -> Option<&str> {
        if !self.provenance.contains(rank) {
            return None;
        }
        Some(
            self.alternative_for(rank)
                .map(|a| a.text.as_str())
                .unwrap_or(self.text.as_str()),
        )
    }

    /// Insert or replace the alternative for `alt.witness`, keeping rank order.
    pub fn upsert_alternative(&mut self, alt: Alternative) {
        match self
            .alternatives
            .binary_search_by_key(&alt.witness, |a| a.witness)
        {
            Ok(i) => self.alternatives[i] = alt,
            Err(i) => self.alternatives.insert(i, alt),
        }
    }

    /// `true` when both spans agree on kind, category, provenance and
    /// alternative wordings, i.e. they may be joined into one span.
    pub fn same_shape(&self, other: &Span) -> bool {
        self.kind == other.kind
            && self.category == other.category
            && self.provenance == other.provenance
            && self.alternatives.len() == other.alternatives.len()
            && self
                .alternatives
                .iter()
                .zip(&other.alternatives)
                .all(|(a, b)| a.same_reading(b))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
