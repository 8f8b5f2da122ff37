//! Masking engine applying rule-resolved styles to matched spans

use crate::rules::{ResolvedRule, RuleTable};
use crate::{maskers, MaskStyle, MaskingRule};
use guard_common::{DetectedMatch, DetectionCategory};
use std::sync::Arc;

/// Result of masking a single value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOutcome {
    /// The value as given
    pub original: String,
    /// The value after the resolved style was applied
    pub masked: String,
}

/// One span rewritten by [`MaskingEngine::mask_all`]
#[derive(Debug, Clone)]
pub struct AppliedMask {
    /// Detection type of the rewritten match
    pub detection_type: String,
    /// Span start in the original text
    pub start_index: usize,
    /// Span end in the original text
    pub end_index: usize,
    /// Replacement that was spliced in
    pub masked_value: String,
}

/// Result of masking every match in a text
#[derive(Debug, Clone)]
pub struct MaskAllOutcome {
    /// The text as given
    pub original: String,
    /// The text with every eligible span rewritten
    pub masked: String,
    /// Rewritten spans, in ascending text order
    pub masks_applied: Vec<AppliedMask>,
}

/// Applies rule-resolved styles to values and texts
///
/// The engine holds a shared handle to the rule table; every operation
/// works against the snapshot current when it started.
#[derive(Clone)]
pub struct MaskingEngine {
    rules: Arc<RuleTable>,
}

impl MaskingEngine {
    /// Engine over an existing rule table handle
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self { rules }
    }

    /// Engine over a fresh table pre-loaded with the built-in rules
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(RuleTable::new()))
    }

    /// Shared handle to the rule table, for runtime updates
    pub fn rules(&self) -> &Arc<RuleTable> {
        &self.rules
    }

    /// Mask one value per the resolved rule for `(category, detection_type)`
    pub fn mask(
        &self,
        value: &str,
        detection_type: &str,
        category: DetectionCategory,
    ) -> MaskOutcome {
        let snapshot = self.rules.snapshot();
        let masked = match snapshot.resolve(category, detection_type) {
            ResolvedRule::Rule(rule) => apply_rule(rule, detection_type, value),
            ResolvedRule::Default(style) => apply_style(style, None, detection_type, value),
        };
        MaskOutcome {
            original: value.to_string(),
            masked,
        }
    }

    /// Rewrite every matched span in `text`
    ///
    /// Matches are processed in descending start-index order so splicing a
    /// replacement of different length never invalidates the offsets of the
    /// matches still waiting to the left. A match overlapping an already
    /// rewritten span is skipped.
    ///
    /// A match that carries a classifier-computed masked value is spliced
    /// as-is, keeping the format-aware shape. Only matches without one go
    /// through rule resolution.
    pub fn mask_all(&self, text: &str, matches: &[DetectedMatch]) -> MaskAllOutcome {
        if matches.is_empty() {
            return MaskAllOutcome {
                original: text.to_string(),
                masked: text.to_string(),
                masks_applied: Vec::new(),
            };
        }

        let snapshot = self.rules.snapshot();

        let mut order: Vec<&DetectedMatch> = matches
            .iter()
            .filter(|m| {
                m.start_index < m.end_index
                    && m.end_index <= text.len()
                    && text.is_char_boundary(m.start_index)
                    && text.is_char_boundary(m.end_index)
            })
            .collect();
        order.sort_by(|a, b| {
            b.start_index
                .cmp(&a.start_index)
                .then_with(|| b.end_index.cmp(&a.end_index))
        });

        let mut masked = text.to_string();
        let mut applied = Vec::new();
        // Left edge of the region already rewritten; spans reaching past it
        // would splice into replaced text, so they are dropped.
        let mut left_edge = usize::MAX;

        for m in order {
            if m.end_index > left_edge {
                tracing::debug!(
                    detection_type = %m.detection_type,
                    start = m.start_index,
                    "skipping overlapped span during mask"
                );
                continue;
            }
            let replacement = if !m.masked_value.is_empty() {
                m.masked_value.clone()
            } else {
                match snapshot.resolve(m.category, &m.detection_type) {
                    ResolvedRule::Rule(rule) => apply_rule(rule, &m.detection_type, &m.raw_value),
                    ResolvedRule::Default(style) => {
                        apply_style(style, None, &m.detection_type, &m.raw_value)
                    }
                }
            };
            masked.replace_range(m.start_index..m.end_index, &replacement);
            applied.push(AppliedMask {
                detection_type: m.detection_type.clone(),
                start_index: m.start_index,
                end_index: m.end_index,
                masked_value: replacement,
            });
            left_edge = m.start_index;
        }

        applied.reverse();
        MaskAllOutcome {
            original: text.to_string(),
            masked,
            masks_applied: applied,
        }
    }
}

fn apply_rule(rule: &MaskingRule, detection_type: &str, value: &str) -> String {
    apply_style(rule.style, Some(rule), detection_type, value)
}

fn apply_style(
    style: MaskStyle,
    rule: Option<&MaskingRule>,
    detection_type: &str,
    value: &str,
) -> String {
    match style {
        MaskStyle::Asterisk => "*".repeat(value.chars().count().min(20)),
        MaskStyle::Redact => rule
            .and_then(|r| r.placeholder_text.clone())
            .unwrap_or_else(|| "[REDACTED]".to_string()),
        MaskStyle::Hash => "#".repeat(value.chars().count().min(16)),
        MaskStyle::Partial => {
            let (prefix, suffix) = rule
                .map(|r| (r.preserve_prefix_len, r.preserve_suffix_len))
                .unwrap_or((0, 4));
            maskers::partial(value, prefix, suffix)
        }
        MaskStyle::Placeholder => rule
            .and_then(|r| r.placeholder_text.clone())
            .unwrap_or_else(|| format!("[{}]", detection_type.to_uppercase())),
    }
}
