//! Statistics Aggregator.

use serde::{Deserialize, Serialize};

use collate_compare::similarity::jaccard;
use collate_core::{Rank, Span, VariantCategory};

use crate::reconstruct::reconstruct;
use crate::scope::UnitScope;

/// Number of spans per variant category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCounts {
    pub addition: usize,
    pub deletion: usize,
    pub substitution: usize,
    pub orthographic: usize,
    pub lexical: usize,
}

impl VariantCounts {
    pub fn tally(spans: &[Span]) -> Self {
        let mut counts = Self::default();
        for span in spans {
            counts.record(span.category);
        }
        counts
    }

    pub fn record(&mut self, category: VariantCategory) {
        match category {
            VariantCategory::None => {}
            VariantCategory::Addition => self.addition += 1,
            VariantCategory::Deletion => self.deletion += 1,
            VariantCategory::Substitution => self.substitution += 1,
            VariantCategory::Orthographic => self.orthographic += 1,
            VariantCategory::Lexical => self.lexical += 1,
        }
    }

    pub fn absorb(&mut self, other: &VariantCounts) {
        self.addition += other.addition;
        self.deletion += other.deletion;
        self.substitution += other.substitution;
        self.orthographic += other.orthographic;
        self.lexical += other.lexical;
    }

    pub fn total(&self) -> usize {
        self.addition + self.deletion + self.substitution + self.orthographic + self.lexical
    }
}

/// Per-unit figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub variants: VariantCounts,
    /// Mean Jaccard similarity of the reference witness's text to every
    /// other present witness; 1.0 when there is no other.
    pub similarity: f64,
}

impl UnitStats {
    pub fn compute(spans: &[Span], scope: &UnitScope, reference: Rank) -> Self {
        let reference_text = reconstruct(spans, reference);
        let scores: Vec<f64> = scope
            .present
            .iter()
            .filter(|rank| *rank != reference)
            .map(|rank| jaccard(&reference_text, &reconstruct(spans, rank)))
            .collect();
        let similarity = if scores.is_empty() {
            1.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        Self {
            variants: VariantCounts::tally(spans),
            similarity,
        }
    }
}
