//! Rule-driven masking for detected sensitive spans
//!
//! Classifiers decide *what* a value looks like when redacted (format-aware
//! shapes, see [`maskers`]); this crate decides *which* redaction policy
//! applies. Rules are resolved exact `(category, type)` first, then category
//! wildcard, then substring, then a global default style. The active rule
//! set is an atomically swappable snapshot so mask operations never block
//! on a concurrent rule update.

#![warn(missing_docs)]

pub mod engine;
pub mod maskers;
pub mod rules;

pub use engine::{AppliedMask, MaskAllOutcome, MaskOutcome, MaskingEngine};
pub use rules::{ResolvedRule, RuleSet, RuleTable};

use guard_common::DetectionCategory;
use serde::{Deserialize, Serialize};

/// Redaction strategy applied to a matched span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskStyle {
    /// Length-preserving run of `*` (capped at 20)
    Asterisk,
    /// Fixed placeholder string, `[REDACTED]` unless the rule overrides it
    Redact,
    /// Run of `#` capped at 16 characters regardless of input length
    Hash,
    /// Keep a prefix and suffix, replace the interior
    Partial,
    /// Rule-defined or type-derived bracketed tag
    Placeholder,
}

impl Default for MaskStyle {
    fn default() -> Self {
        Self::Asterisk
    }
}

/// One masking rule, looked up per `(category, detection type)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskingRule {
    /// Category the rule belongs to
    pub category: DetectionCategory,
    /// Detection type the rule targets; `*` matches the whole category
    pub match_type: String,
    /// Style applied when the rule wins resolution
    pub style: MaskStyle,
    /// Leading characters preserved by the partial style
    #[serde(default)]
    pub preserve_prefix_len: usize,
    /// Trailing characters preserved by the partial style
    #[serde(default)]
    pub preserve_suffix_len: usize,
    /// Override text for the redact and placeholder styles
    #[serde(default)]
    pub placeholder_text: Option<String>,
}

impl MaskingRule {
    /// Rule applying `style` to one detection type within `category`
    pub fn new(category: DetectionCategory, match_type: impl Into<String>, style: MaskStyle) -> Self {
        Self {
            category,
            match_type: match_type.into(),
            style,
            preserve_prefix_len: 0,
            preserve_suffix_len: 0,
            placeholder_text: None,
        }
    }

    /// Category-wide wildcard rule
    pub fn wildcard(category: DetectionCategory, style: MaskStyle) -> Self {
        Self::new(category, "*", style)
    }

    /// Partial-style rule preserving `prefix` and `suffix` characters
    pub fn partial(
        category: DetectionCategory,
        match_type: impl Into<String>,
        prefix: usize,
        suffix: usize,
    ) -> Self {
        Self {
            category,
            match_type: match_type.into(),
            style: MaskStyle::Partial,
            preserve_prefix_len: prefix,
            preserve_suffix_len: suffix,
            placeholder_text: None,
        }
    }

    /// Attach placeholder text for the redact or placeholder styles
    pub fn with_placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder_text = Some(text.into());
        self
    }
}
