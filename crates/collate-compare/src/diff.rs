//! Pairwise Diff Engine over token or character sequences, via `similar`.
//!
//! Only the equal runs `similar` reports are used. They are checked against
//! both inputs and kept in order; every gap between two kept runs (and before
//! the first and after the last) becomes exactly one change operation. The
//! resulting [`Opcode`]s tile both sequences, and two change operations are
//! never adjacent.

use std::hash::Hash;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffOp};

use collate_core::{CharEdit, DiffAlgorithm, EditOp};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// One diff operation. `old`/`new` are index ranges into the two inputs;
/// the range on the side an operation does not touch is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub old: Range<usize>,
    pub new: Range<usize>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Diff two sequences into grouped opcodes.
pub fn opcodes<T: Eq + Hash + Ord>(old: &[T], new: &[T], algorithm: DiffAlgorithm) -> Vec<Opcode> {
    let ops = similar::capture_diff_slices(to_similar(algorithm), old, new);
    let mut runs: Vec<(usize, usize, usize)> = ops
        .iter()
        .filter_map(|op| match *op {
            DiffOp::Equal {
                old_index,
                new_index,
                len,
            } if len > 0 => Some((old_index, new_index, len)),
            _ => None,
        })
        .collect();
    runs.sort_unstable();

    let mut result: Vec<Opcode> = Vec::new();
    let (mut i, mut j): (usize, usize) = (0, 0);
    for (o, n, len) in runs {
        let skip = i.saturating_sub(o).max(j.saturating_sub(n));
        if skip >= len {
            continue;
        }
        let (o, n, len) = (o + skip, n + skip, len - skip);
        if o + len > old.len() || n + len > new.len() || old[o..o + len] != new[n..n + len] {
            continue;
        }

        push_change(&mut result, i..o, j..n);
        match result.last_mut() {
            Some(last) if last.tag == OpTag::Equal && last.old.end == o && last.new.end == n => {
                last.old.end = o + len;
                last.new.end = n + len;
            }
            _ => result.push(Opcode {
                tag: OpTag::Equal,
                old: o..o + len,
                new: n..n + len,
            }),
        }
        i = o + len;
        j = n + len;
    }
    push_change(&mut result, i..old.len(), j..new.len());
    result
}

/// Character-level edits turning `base` into `other`.
pub fn char_edits(base: &str, other: &str, algorithm: DiffAlgorithm) -> Vec<CharEdit> {
    let a: Vec<char> = base.chars().collect();
    let b: Vec<char> = other.chars().collect();

    opcodes(&a, &b, algorithm)
        .into_iter()
        .filter_map(|op| {
            let edit_op = match op.tag {
                OpTag::Equal => return None,
                OpTag::Replace => EditOp::Replace,
                OpTag::Delete => EditOp::Delete,
                OpTag::Insert => EditOp::Insert,
            };
            Some(CharEdit {
                char_index: op.old.start,
                op: edit_op,
                text: b[op.new].iter().collect(),
                from: a[op.old].iter().collect(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn to_similar(algorithm: DiffAlgorithm) -> Algorithm {
    match algorithm {
        DiffAlgorithm::Myers => Algorithm::Myers,
        DiffAlgorithm::Patience => Algorithm::Patience,
        DiffAlgorithm::Lcs => Algorithm::Lcs,
    }
}

/// Record the gap between two equal runs as one change, if it is not empty.
fn push_change(result: &mut Vec<Opcode>, old: Range<usize>, new: Range<usize>) {
    let tag = match (old.is_empty(), new.is_empty()) {
        (true, true) => return,
        (false, true) => OpTag::Delete,
        (true, false) => OpTag::Insert,
        (false, false) => OpTag::Replace,
    };
    result.push(Opcode { tag, old, new });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
