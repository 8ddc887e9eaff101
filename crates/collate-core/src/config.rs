//! Runtime configuration for a collation run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CollateError, Result};
use crate::hash::sha256_hex;

/// Sequence diff algorithm used for word- and character-level comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
    Lcs,
}

/// Tunables for alignment, classification and execution.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollateConfig {
    /// A unit candidate must score strictly above this to be matched.
    /// Default: 0.5.
    pub unit_threshold: f64,
    /// Same, for annotations. Default: 0.3.
    pub annotation_threshold: f64,
    /// Witness id used as alignment reference. Default: the earliest.
    pub base_witness: Option<String>,
    pub diff_algorithm: DiffAlgorithm,
    /// Single-word replacements within this edit distance are orthographic.
    /// Default: 2.
    pub orthographic_max_distance: usize,
    /// Single-word replacements whose distance / longer length is below this
    /// are orthographic. Default: 0.3.
    pub orthographic_max_ratio: f64,
    /// Replacements where both sides have at most this many words are
    /// lexical. Default: 3.
    pub lexical_max_words: usize,
    /// Split single-alternative replacements at word granularity.
    /// Default: true.
    pub split_replacements: bool,
    /// Process units on a rayon pool. Default: false.
    pub parallel: bool,
    /// Size of a dedicated pool; `None` uses the global rayon pool.
    pub worker_threads: Option<usize>,
}

impl Default for CollateConfig {
    fn default() -> Self {
        Self {
            unit_threshold: 0.5,
            annotation_threshold: 0.3,
            base_witness: None,
            diff_algorithm: DiffAlgorithm::Myers,
            orthographic_max_distance: 2,
            orthographic_max_ratio: 0.3,
            lexical_max_words: 3,
            split_replacements: true,
            parallel: false,
            worker_threads: None,
        }
    }
}

impl CollateConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CollateConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("unit_threshold", self.unit_threshold),
            ("annotation_threshold", self.annotation_threshold),
            ("orthographic_max_ratio", self.orthographic_max_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CollateError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.lexical_max_words == 0 {
            return Err(CollateError::InvalidConfig(
                "lexical_max_words must be at least 1".into(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(CollateError::InvalidConfig(
                "worker_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// SHA256 of the serialized config, identifying the settings of a run.
    pub fn digest(&self) -> Result<String> {
        Ok(sha256_hex(&serde_json::to_string(self)?))
    }
}
