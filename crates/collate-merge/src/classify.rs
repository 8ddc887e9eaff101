//! Variant Classifier.
//!
//! Replacements are graded by size: a single word changed by a few
//! characters is orthographic, a short rewording is lexical, anything longer
//! is a substitution.

use std::collections::BTreeSet;

use collate_compare::diff::OpTag;
use collate_compare::similarity::edit_distance;
use collate_compare::tokenize::words;
use collate_core::{CollateConfig, Span, SpanKind, VariantCategory};

#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    pub orthographic_max_distance: usize,
    pub orthographic_max_ratio: f64,
    pub lexical_max_words: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&CollateConfig::default())
    }
}

impl Classifier {
    pub fn from_config(config: &CollateConfig) -> Self {
        Self {
            orthographic_max_distance: config.orthographic_max_distance,
            orthographic_max_ratio: config.orthographic_max_ratio,
            lexical_max_words: config.lexical_max_words,
        }
    }

    /// Category of a single diff operation turning `old` into `new`.
    pub fn classify(&self, tag: OpTag, old: &str, new: &str) -> VariantCategory {
        match tag {
            OpTag::Equal => VariantCategory::None,
            OpTag::Insert => VariantCategory::Addition,
            OpTag::Delete => VariantCategory::Deletion,
            OpTag::Replace => self.classify_replacement(old, new),
        }
    }

    pub fn classify_replacement(&self, old: &str, new: &str) -> VariantCategory {
        let old_words = words(old);
        let new_words = words(new);
        if old_words.is_empty() || new_words.is_empty() {
            return VariantCategory::Substitution;
        }

        if old_words.len() == 1 && new_words.len() == 1 {
            let a = old_words[0].to_lowercase();
            let b = new_words[0].to_lowercase();
            let distance = edit_distance(&a, &b);
            let longest = a.chars().count().max(b.chars().count()).max(1);
            let ratio = distance as f64 / longest as f64;
            if distance <= self.orthographic_max_distance || ratio < self.orthographic_max_ratio {
                return VariantCategory::Orthographic;
            }
            return VariantCategory::Lexical;
        }

        if old_words.len() <= self.lexical_max_words && new_words.len() <= self.lexical_max_words {
            VariantCategory::Lexical
        } else {
            VariantCategory::Substitution
        }
    }

    /// Category of a whole span.
    ///
    /// A replacement with one distinct alternative wording is graded against
    /// the default; several distinct wordings make a substitution.
    pub fn classify_span(&self, span: &Span) -> VariantCategory {
        match span.kind {
            SpanKind::Replaced => {
                let distinct: BTreeSet<&str> = span
                    .alternatives
                    .iter()
                    .map(|a| a.text.trim())
                    .filter(|t| *t != span.text.trim())
                    .collect();
                match distinct.len() {
                    1 => distinct
                        .iter()
                        .next()
                        .map(|alt| self.classify_replacement(&span.text, alt))
                        .unwrap_or(VariantCategory::Substitution),
                    _ => VariantCategory::Substitution,
                }
            }
            kind => VariantCategory::for_kind(kind),
        }
    }

    pub fn classify_spans(&self, spans: &mut [Span]) {
        for span in spans {
            span.category = self.classify_span(span);
        }
    }
}
