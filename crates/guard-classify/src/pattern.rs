//! Compiled detection patterns and context helpers.

use aho_corasick::AhoCorasick;
use regex::Regex;

use guard_common::{GuardError, GuardResult, SeverityLevel};

/// One raw regex hit before scoring. Borrows the scanned text.
#[derive(Debug, Clone, Copy)]
pub struct RawHit<'t> {
    /// Detection type name, e.g. `credit_card`.
    pub name: &'static str,
    /// Severity assigned to the pattern.
    pub severity: SeverityLevel,
    /// Starting confidence before validators adjust it.
    pub base_confidence: f64,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// The matched slice.
    pub value: &'t str,
}

struct PatternEntry {
    name: &'static str,
    regex: Regex,
    severity: SeverityLevel,
    base_confidence: f64,
    /// When set, report this capture group instead of the whole match.
    /// Used by labeled patterns where only the value after the label
    /// is sensitive.
    value_group: Option<usize>,
}

/// An ordered set of compiled patterns for one classifier.
///
/// Compilation happens once at construction. A pattern that fails to
/// compile is skipped with a warning rather than poisoning the whole
/// table; the classifier keeps running on the patterns that did
/// compile.
pub struct PatternTable {
    entries: Vec<PatternEntry>,
}

impl PatternTable {
    /// Start building a table.
    pub fn builder() -> PatternTableBuilder {
        PatternTableBuilder {
            entries: Vec::new(),
        }
    }

    /// Number of successfully compiled patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no pattern compiled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every pattern over `text` and collect raw hits. Hits may
    /// overlap across patterns; callers dedupe before scoring.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<RawHit<'t>> {
        let mut hits = Vec::new();
        for entry in &self.entries {
            match entry.value_group {
                None => {
                    for m in entry.regex.find_iter(text) {
                        hits.push(RawHit {
                            name: entry.name,
                            severity: entry.severity,
                            base_confidence: entry.base_confidence,
                            start: m.start(),
                            end: m.end(),
                            value: m.as_str(),
                        });
                    }
                }
                Some(group) => {
                    for caps in entry.regex.captures_iter(text) {
                        if let Some(m) = caps.get(group) {
                            hits.push(RawHit {
                                name: entry.name,
                                severity: entry.severity,
                                base_confidence: entry.base_confidence,
                                start: m.start(),
                                end: m.end(),
                                value: m.as_str(),
                            });
                        }
                    }
                }
            }
        }
        hits
    }
}

/// Builder that compiles patterns up front and drops the broken ones.
pub struct PatternTableBuilder {
    entries: Vec<PatternEntry>,
}

impl PatternTableBuilder {
    /// Add a pattern whose whole match is the sensitive value.
    pub fn pattern(
        self,
        name: &'static str,
        pattern: &str,
        severity: SeverityLevel,
        base_confidence: f64,
    ) -> Self {
        self.add(name, pattern, severity, base_confidence, None)
    }

    /// Add a labeled pattern; capture group 1 holds the sensitive
    /// value while the label stays in the surrounding text.
    pub fn labeled(
        self,
        name: &'static str,
        pattern: &str,
        severity: SeverityLevel,
        base_confidence: f64,
    ) -> Self {
        self.add(name, pattern, severity, base_confidence, Some(1))
    }

    /// Add a pattern, surfacing a compile failure instead of skipping
    /// it. Dynamically loaded patterns go through this so a bad entry
    /// is rejected up front rather than silently dropped.
    pub fn try_pattern(
        mut self,
        name: &'static str,
        pattern: &str,
        severity: SeverityLevel,
        base_confidence: f64,
    ) -> GuardResult<Self> {
        match Regex::new(pattern) {
            Ok(regex) => {
                self.entries.push(PatternEntry {
                    name,
                    regex,
                    severity,
                    base_confidence,
                    value_group: None,
                });
                Ok(self)
            }
            Err(error) => Err(GuardError::InvalidPattern {
                name: name.to_string(),
                reason: error.to_string(),
            }),
        }
    }

    fn add(
        mut self,
        name: &'static str,
        pattern: &str,
        severity: SeverityLevel,
        base_confidence: f64,
        value_group: Option<usize>,
    ) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.entries.push(PatternEntry {
                name,
                regex,
                severity,
                base_confidence,
                value_group,
            }),
            Err(error) => {
                tracing::warn!(pattern = name, %error, "skipping pattern that failed to compile");
            }
        }
        self
    }

    /// Finish the table.
    pub fn build(self) -> PatternTable {
        PatternTable {
            entries: self.entries,
        }
    }
}

/// Case-insensitive keyword search in a window around a match.
///
/// Classifiers use nearby vocabulary ("ssn", "routing", "diagnosis")
/// to raise confidence for patterns whose shape alone is ambiguous.
pub struct ContextKeywords {
    automaton: Option<AhoCorasick>,
    window: usize,
}

impl ContextKeywords {
    /// Build the automaton. `window` is the number of bytes inspected
    /// on each side of a match.
    pub fn new(keywords: &[&str], window: usize) -> Self {
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(keywords)
            .ok();
        Self { automaton, window }
    }

    /// True when any keyword occurs within the window around
    /// `start..end`. Window edges snap outward to char boundaries.
    pub fn near(&self, text: &str, start: usize, end: usize) -> bool {
        let automaton = match &self.automaton {
            Some(a) => a,
            None => return false,
        };
        let mut lo = start.saturating_sub(self.window);
        while lo > 0 && !text.is_char_boundary(lo) {
            lo -= 1;
        }
        let mut hi = end.saturating_add(self.window).min(text.len());
        while hi < text.len() && !text.is_char_boundary(hi) {
            hi += 1;
        }
        automaton.is_match(&text[lo..hi])
    }
}
