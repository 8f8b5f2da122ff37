//! Detection records produced by classifiers and the orchestrator

use crate::{DetectionCategory, GuardAction, SeverityLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One pattern hit inside a scanned text
///
/// `start_index`/`end_index` are byte offsets into the original scanned
/// text. They stay valid during rewriting because replacements are always
/// spliced back-to-front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedMatch {
    /// Detection type name, e.g. `credit_card`
    pub detection_type: String,
    /// Category of the classifier that produced the hit
    pub category: DetectionCategory,
    /// Raw matched value; never crosses into audit records or log lines
    pub raw_value: String,
    /// Format-aware masked representation of the value
    pub masked_value: String,
    /// Byte offset of the match start
    pub start_index: usize,
    /// Byte offset one past the match end
    pub end_index: usize,
    /// Severity assigned by the owning pattern entry
    pub severity: SeverityLevel,
    /// Deterministic confidence in `[0, 1]`
    pub confidence: f64,
}

impl DetectedMatch {
    /// Match length in bytes
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }
}

/// Output of one classifier over one text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Category of the classifier that produced this result
    pub category: DetectionCategory,
    /// All surviving matches
    pub matches: Vec<DetectedMatch>,
    /// True when `matches` is non-empty
    pub has_detections: bool,
    /// Maximum severity across `matches`
    pub highest_severity: Option<SeverityLevel>,
    /// Count of matches per detection type
    pub type_counts: HashMap<String, usize>,
    /// Bytes of text the classifier looked at
    pub content_length: usize,
    /// Wall time the scan took, fractional milliseconds
    pub processing_time_ms: f64,
}

impl ScanResult {
    /// An empty result for a disabled or matchless scan
    pub fn empty(category: DetectionCategory) -> Self {
        Self {
            category,
            matches: Vec::new(),
            has_detections: false,
            highest_severity: None,
            type_counts: HashMap::new(),
            content_length: 0,
            processing_time_ms: 0.0,
        }
    }

    /// Build a result from surviving matches, deriving the rollup fields
    pub fn from_matches(
        category: DetectionCategory,
        matches: Vec<DetectedMatch>,
        content_length: usize,
        processing_time_ms: f64,
    ) -> Self {
        let highest_severity = matches.iter().map(|m| m.severity).max();
        let mut type_counts: HashMap<String, usize> = HashMap::new();
        for m in &matches {
            *type_counts.entry(m.detection_type.clone()).or_insert(0) += 1;
        }
        Self {
            category,
            has_detections: !matches.is_empty(),
            highest_severity,
            type_counts,
            content_length,
            processing_time_ms,
            matches,
        }
    }

    /// Number of matches
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Scan throughput in MB/s, derived from content length and wall time
    pub fn throughput_mbps(&self) -> f64 {
        if self.processing_time_ms <= 0.0 {
            return f64::INFINITY;
        }
        (self.content_length as f64 / 1_000_000.0) / (self.processing_time_ms / 1000.0)
    }
}

/// Caller-supplied identity and correlation data for one guarded request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanContext {
    /// End user on whose behalf the request runs
    pub user_id: Option<String>,
    /// Conversation or connection session
    pub session_id: Option<String>,
    /// Correlation identifier supplied by the pipeline host
    pub request_id: String,
    /// Request path, checked against the bypass allow-list
    pub request_path: Option<String>,
    /// Caller identity, checked against the bypass allow-list
    pub caller_id: Option<String>,
}

impl ScanContext {
    /// New context with a correlation identifier
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Attach a user identifier
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach a session identifier
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach the request path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.request_path = Some(path.into());
        self
    }

    /// Attach the caller identity
    pub fn with_caller(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }
}

/// Aggregate decision for one scanned text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    /// Resolved policy action
    pub action: GuardAction,
    /// Maximum severity across every classifier result
    pub aggregated_severity: Option<SeverityLevel>,
    /// The text after policy was applied; equals the original unless masked
    pub processed_text: String,
    /// Human-readable warnings; never contain raw matched values
    pub warnings: Vec<String>,
    /// Per-classifier results that fed the aggregation
    pub scan_results: Vec<ScanResult>,
}

impl GuardrailVerdict {
    /// An allow-verdict that passes `text` through untouched
    pub fn allow(text: impl Into<String>) -> Self {
        Self {
            action: GuardAction::Allow,
            aggregated_severity: None,
            processed_text: text.into(),
            warnings: Vec::new(),
            scan_results: Vec::new(),
        }
    }

    /// True unless the action is `Block`
    pub fn is_allowed(&self) -> bool {
        self.action != GuardAction::Block
    }

    /// True when the payload must be rejected
    pub fn blocked(&self) -> bool {
        self.action == GuardAction::Block
    }

    /// Total matches across all classifier results
    pub fn match_count(&self) -> usize {
        self.scan_results.iter().map(|r| r.match_count()).sum()
    }
}
