//! Which witnesses carry a unit, and the span kinds that follows from it.

use collate_core::{Provenance, Rank, SpanKind};

/// The witnesses present in one unit, plus the run's earliest witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitScope {
    pub present: Provenance,
    pub earliest: Rank,
}

impl UnitScope {
    pub fn new(present: Provenance, earliest: Rank) -> Self {
        Self { present, earliest }
    }

    /// Kind of text first introduced by `introducer`.
    pub fn origin_kind(&self, introducer: Rank) -> SpanKind {
        if introducer == self.earliest {
            SpanKind::Original
        } else {
            SpanKind::AddedIn(introducer)
        }
    }

    /// Kind of text read by exactly the witnesses in `provenance`.
    ///
    /// Text read by the unit's first witness is original to the unit; if some
    /// present witness skips it, it is deleted in the first such witness.
    /// Text the first witness lacks was added by the oldest reader.
    pub fn kind_for(&self, provenance: &Provenance) -> SpanKind {
        let Some(first) = self.present.earliest() else {
            return self.origin_kind(provenance.earliest().unwrap_or(self.earliest));
        };
        if provenance.contains(first) {
            match self.present.iter().find(|r| !provenance.contains(*r)) {
                Some(missing) => SpanKind::DeletedIn(missing),
                None => self.origin_kind(first),
            }
        } else {
            SpanKind::AddedIn(provenance.earliest().unwrap_or(first))
        }
    }
}
