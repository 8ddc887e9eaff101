use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::witness::{Rank, WitnessSet};

/// Top-level error type for the collate-core crate and dependents.
///
/// Only conditions that make a run impossible live here. Irregularities that
/// a single unit can recover from are reported as [`Anomaly`] values.
#[derive(Debug, Error)]
pub enum CollateError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no witnesses supplied")]
    NoWitnesses,

    #[error("unknown witness: {0}")]
    UnknownWitness(String),

    #[error("duplicate witness id: {0}")]
    DuplicateWitness(String),

    #[error("witnesses {first} and {second} share rank {rank}")]
    DuplicateRank {
        first: String,
        second: String,
        rank: u32,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, CollateError>;

/// A recoverable irregularity met while collating one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// The tokens reconstructed for the comparison partner did not line up
    /// with that partner's own text. The later witness was appended whole.
    MisalignedSegmentIndex {
        witness: Rank,
        partner: Rank,
        expected: usize,
        found: usize,
    },
}

impl Anomaly {
    /// Human-readable description using witness ids instead of ranks.
    pub fn describe(&self, witnesses: &WitnessSet) -> String {
        match self {
            Anomaly::MisalignedSegmentIndex {
                witness,
                partner,
                expected,
                found,
            } => format!(
                "misaligned segment index: {} reconstructed {} tokens for {}, expected {}",
                witnesses.id_of(*partner).unwrap_or("?"),
                found,
                witnesses.id_of(*witness).unwrap_or("?"),
                expected
            ),
        }
    }
}
