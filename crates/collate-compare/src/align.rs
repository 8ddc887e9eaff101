//! Greedy multi-witness aligner.
//!
//! Alignment proceeds in two passes:
//!
//! 1. **Base pass**: every item of the base witness, in order, opens an
//!    alignment. Each other witness (chronologically) contributes its best
//!    unclaimed item, provided the similarity is strictly above the
//!    threshold. Ties keep the earliest candidate.
//! 2. **Sweep pass**: items left unclaimed in the non-base witnesses are new
//!    material. Each one opens an alignment of its own and is matched forward
//!    against the unclaimed items of later witnesses.
//!
//! An item is claimed by at most one alignment, and every item ends up in
//! exactly one.

use std::collections::BTreeMap;

use tracing::debug;

use collate_core::{Alignable, Rank};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A group of corresponding items, at most one per witness.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Witness to the index of its item.
    pub members: BTreeMap<Rank, usize>,
    /// Similarity of each matched item to the reference item. The reference
    /// itself has no score.
    pub scores: BTreeMap<Rank, f64>,
    /// The witness whose item opened the alignment.
    pub reference: Rank,
    /// `true` when the reference is not the base witness.
    pub new_material: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Align the item lists of several witnesses.
///
/// `order` lists witness ranks chronologically; witnesses without an entry
/// in `items` are treated as having no items. `similarity` scores two texts
/// in [0, 1].
pub fn align<T, F>(
    items: &BTreeMap<Rank, Vec<T>>,
    order: &[Rank],
    base: Rank,
    threshold: f64,
    similarity: F,
) -> Vec<Alignment>
where
    T: Alignable,
    F: Fn(&str, &str) -> f64,
{
    let empty: Vec<T> = Vec::new();
    let list = |rank: Rank| items.get(&rank).unwrap_or(&empty);

    let mut claimed: BTreeMap<Rank, Vec<bool>> = order
        .iter()
        .map(|&rank| (rank, vec![false; list(rank).len()]))
        .collect();
    claimed
        .entry(base)
        .or_insert_with(|| vec![false; list(base).len()]);

    let mut alignments = Vec::new();

    // Base pass.
    for (index, item) in list(base).iter().enumerate() {
        mark(&mut claimed, base, index);
        let mut alignment = open(base, index, false);
        for &rank in order.iter().filter(|&&r| r != base) {
            extend(&mut alignment, &mut claimed, rank, list(rank), item.align_text(), threshold, &similarity);
        }
        alignments.push(alignment);
    }

    // Sweep pass.
    for (pos, &reference) in order.iter().enumerate() {
        if reference == base {
            continue;
        }
        for (index, item) in list(reference).iter().enumerate() {
            if is_claimed(&claimed, reference, index) {
                continue;
            }
            mark(&mut claimed, reference, index);
            let mut alignment = open(reference, index, true);
            for &rank in order[pos + 1..].iter().filter(|&&r| r != base) {
                extend(&mut alignment, &mut claimed, rank, list(rank), item.align_text(), threshold, &similarity);
            }
            alignments.push(alignment);
        }
    }

    alignments
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn open(reference: Rank, index: usize, new_material: bool) -> Alignment {
    let mut members = BTreeMap::new();
    members.insert(reference, index);
    Alignment {
        members,
        scores: BTreeMap::new(),
        reference,
        new_material,
    }
}

fn is_claimed(claimed: &BTreeMap<Rank, Vec<bool>>, rank: Rank, index: usize) -> bool {
    claimed
        .get(&rank)
        .and_then(|flags| flags.get(index))
        .copied()
        .unwrap_or(false)
}

fn mark(claimed: &mut BTreeMap<Rank, Vec<bool>>, rank: Rank, index: usize) {
    if let Some(flag) = claimed.get_mut(&rank).and_then(|flags| flags.get_mut(index)) {
        *flag = true;
    }
}

/// Add the best unclaimed candidate of `rank` to `alignment`, if any scores
/// strictly above `threshold`.
fn extend<T, F>(
    alignment: &mut Alignment,
    claimed: &mut BTreeMap<Rank, Vec<bool>>,
    rank: Rank,
    candidates: &[T],
    reference_text: &str,
    threshold: f64,
    similarity: &F,
) where
    T: Alignable,
    F: Fn(&str, &str) -> f64,
{
    let mut best: Option<(usize, f64)> = None;
    let mut best_score = threshold;
    for (index, candidate) in candidates.iter().enumerate() {
        if is_claimed(claimed, rank, index) {
            continue;
        }
        let score = similarity(reference_text, candidate.align_text());
        if score > best_score {
            best_score = score;
            best = Some((index, score));
        }
    }

    match best {
        Some((index, score)) => {
            mark(claimed, rank, index);
            alignment.members.insert(rank, index);
            alignment.scores.insert(rank, score);
        }
        None => {
            debug!(
                reference = %alignment.reference,
                witness = %rank,
                "no candidate above threshold"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
