//! Witnesses and their chronological ordering.
//!
//! Every witness carries a unique [`Rank`]; lower ranks are older. A
//! [`WitnessSet`] keeps witnesses sorted by rank and knows which one is the
//! base (the reference against which later witnesses are aligned).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CollateError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Chronological rank of a witness. Ordering is the natural integer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub u32);

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One version of the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// Stable identifier, used in provenance output and kind tags.
    pub id: String,
    pub rank: Rank,
    /// Display label; falls back to the id when empty.
    #[serde(default)]
    pub label: String,
    /// Display color (any CSS-style string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Witness {
    pub fn new(id: impl Into<String>, rank: u32) -> Self {
        Self {
            id: id.into(),
            rank: Rank(rank),
            label: String::new(),
            color: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// The label to display: `label` if set, otherwise the id.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// A validated, rank-sorted collection of witnesses with a designated base.
#[derive(Debug, Clone)]
pub struct WitnessSet {
    witnesses: Vec<Witness>,
    base: Rank,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl WitnessSet {
    /// Validate and sort `witnesses`. The base defaults to the earliest one.
    ///
    /// Fails on an empty list, a repeated id, or a repeated rank.
    pub fn new(mut witnesses: Vec<Witness>) -> Result<Self> {
        if witnesses.is_empty() {
            return Err(CollateError::NoWitnesses);
        }

        let mut ids = BTreeSet::new();
        for w in &witnesses {
            if !ids.insert(w.id.as_str()) {
                return Err(CollateError::DuplicateWitness(w.id.clone()));
            }
        }

        witnesses.sort_by_key(|w| w.rank);
        for pair in witnesses.windows(2) {
            if pair[0].rank == pair[1].rank {
                return Err(CollateError::DuplicateRank {
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                    rank: pair[0].rank.0,
                });
            }
        }

        let base = witnesses[0].rank;
        Ok(Self { witnesses, base })
    }

    /// Designate the witness with `id` as the base.
    pub fn with_base(mut self, id: &str) -> Result<Self> {
        self.base = self.resolve(id)?;
        Ok(self)
    }

    pub fn base(&self) -> Rank {
        self.base
    }

    /// Rank of the oldest witness.
    pub fn earliest(&self) -> Rank {
        self.witnesses[0].rank
    }

    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }

    /// Witnesses in chronological order.
    pub fn iter(&self) -> std::slice::Iter<'_, Witness> {
        self.witnesses.iter()
    }

    /// Ranks in chronological order.
    pub fn ranks(&self) -> impl Iterator<Item = Rank> + '_ {
        self.witnesses.iter().map(|w| w.rank)
    }

    pub fn get(&self, rank: Rank) -> Option<&Witness> {
        self.witnesses
            .binary_search_by_key(&rank, |w| w.rank)
            .ok()
            .map(|i| &self.witnesses[i])
    }

    pub fn id_of(&self, rank: Rank) -> Option<&str> {
        self.get(rank).map(|w| w.id.as_str())
    }

    pub fn rank_of(&self, id: &str) -> Option<Rank> {
        self.witnesses.iter().find(|w| w.id == id).map(|w| w.rank)
    }

    /// Like [`rank_of`](Self::rank_of) but fails with
    /// [`CollateError::UnknownWitness`].
    pub fn resolve(&self, id: &str) -> Result<Rank> {
        self.rank_of(id)
            .ok_or_else(|| CollateError::UnknownWitness(id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> WitnessSet {
        WitnessSet::new(vec![
            Witness::new("1849", 3),
            Witness::new("1808", 1),
            Witness::new("1826", 2),
        ])
        .unwrap()
    }

    #[test]
    fn witnesses_are_sorted_by_rank() {
        let s = set();
        let ids: Vec<&str> = s.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["1808", "1826", "1849"]);
    }

    #[test]
    fn base_defaults_to_earliest() {
        let s = set();
        assert_eq!(s.base(), Rank(1));
        assert_eq!(s.earliest(), Rank(1));
    }

    #[test]
    fn with_base_resolves_id() {
        let s = set().with_base("1849").unwrap();
        assert_eq!(s.base(), Rank(3));
        assert_eq!(s.earliest(), Rank(1));
    }

    #[test]
    fn unknown_base_is_rejected() {
        let err = set().with_base("1900").unwrap_err();
        assert!(matches!(err, CollateError::UnknownWitness(id) if id == "1900"));
    }

    #[test]
    fn empty_set_is_rejected() {
        assert!(matches!(WitnessSet::new(vec![]), Err(CollateError::NoWitnesses)));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let err = WitnessSet::new(vec![Witness::new("A", 1), Witness::new("A", 2)]).unwrap_err();
        assert!(matches!(err, CollateError::DuplicateWitness(id) if id == "A"));
    }

    #[test]
    fn duplicate_rank_is_rejected() {
        let err = WitnessSet::new(vec![Witness::new("A", 1), Witness::new("B", 1)]).unwrap_err();
        assert!(matches!(err, CollateError::DuplicateRank { rank: 1, .. }));
    }

    #[test]
    fn lookup_by_rank_and_id() {
        let s = set();
        assert_eq!(s.id_of(Rank(2)), Some("1826"));
        assert_eq!(s.rank_of("1849"), Some(Rank(3)));
        assert_eq!(s.id_of(Rank(9)), None);
    }

    #[test]
    fn display_label_falls_back_to_id() {
        let plain = Witness::new("A", 1);
        assert_eq!(plain.display_label(), "A");
        let labelled = Witness::new("A", 1).with_label("First edition").with_color("#fff");
        assert_eq!(labelled.display_label(), "First edition");
        assert_eq!(labelled.color.as_deref(), Some("#fff"));
    }
}
