//! Input document types.
//!
//! A [`CollationInput`] names the witnesses and supplies their text either
//! as free per-witness unit lists ([`InputSource::Free`]) or as units that
//! already mark where the witnesses diverge ([`InputSource::Apparatus`]).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::witness::Witness;

/// A note attached to a content unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub text: String,
    /// Character offset into the owning unit's text.
    #[serde(default)]
    pub anchor: usize,
}

/// One paragraph (or comparable block) of one witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl ContentUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_ref: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Anything the aligner can score by its text.
pub trait Alignable {
    fn align_text(&self) -> &str;
}

impl Alignable for ContentUnit {
    fn align_text(&self) -> &str {
        &self.text
    }
}

impl Alignable for Annotation {
    fn align_text(&self) -> &str {
        &self.text
    }
}

impl Alignable for String {
    fn align_text(&self) -> &str {
        self
    }
}

impl Alignable for str {
    fn align_text(&self) -> &str {
        self
    }
}

impl<T: Alignable + ?Sized> Alignable for &T {
    fn align_text(&self) -> &str {
        (**self).align_text()
    }
}

/// A segment of an apparatus-mode unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApparatusSegment {
    /// Text shared by every witness carrying the unit.
    Literal { text: String },
    /// Witness id to reading. A missing witness reads nothing here.
    Readings { readings: BTreeMap<String, String> },
}

/// A unit whose divergences are already marked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApparatusUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub segments: Vec<ApparatusSegment>,
    /// Witness id to that witness's notes on this unit.
    #[serde(default)]
    pub annotations: BTreeMap<String, Vec<Annotation>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InputSource {
    /// Witness id to its ordered units; alignment is computed.
    Free { units: BTreeMap<String, Vec<ContentUnit>> },
    /// Pre-aligned units.
    Apparatus { units: Vec<ApparatusUnit> },
}

/// Everything a collation run consumes besides configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollationInput {
    pub witnesses: Vec<Witness>,
    pub source: InputSource,
}

impl CollationInput {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
