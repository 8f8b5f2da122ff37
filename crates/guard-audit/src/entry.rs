//! Audit entry shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use guard_common::{
    DetectedMatch, DetectionCategory, Direction, GuardAction, ScanContext, SeverityLevel,
};

/// One recorded detection. The entry carries the masked rendition
/// only; the raw value is dropped at construction and cannot be
/// recovered from the trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry id.
    pub id: Uuid,
    /// When the detection was recorded.
    pub timestamp: DateTime<Utc>,
    /// Caller identity, when the pipeline supplied one.
    pub user_id: Option<String>,
    /// Session correlation id.
    pub session_id: Option<String>,
    /// Correlation id supplied by the pipeline host.
    pub request_id: String,
    /// Which way the text was flowing.
    pub direction: Direction,
    /// Reporting classifier's category.
    pub category: DetectionCategory,
    /// Detection type name, e.g. `credit_card`.
    pub detection_type: String,
    /// Severity the pattern carries.
    pub severity: SeverityLevel,
    /// What the service did with the request.
    pub action: GuardAction,
    /// Final confidence score.
    pub confidence: f64,
    /// Masked rendition of the matched value.
    pub masked_value: String,
    /// Wall time the owning scan took, when known.
    pub processing_time_ms: Option<f64>,
}

impl AuditEntry {
    /// Build an entry from a scored match and the request context.
    pub fn from_match(
        detected: &DetectedMatch,
        direction: Direction,
        action: GuardAction,
        context: &ScanContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: context.user_id.clone(),
            session_id: context.session_id.clone(),
            request_id: context.request_id.clone(),
            direction,
            category: detected.category,
            detection_type: detected.detection_type.clone(),
            severity: detected.severity,
            action,
            confidence: detected.confidence,
            masked_value: detected.masked_value.clone(),
            processing_time_ms: None,
        }
    }

    /// Attach the owning scan's wall time.
    pub fn with_processing_time(mut self, ms: f64) -> Self {
        self.processing_time_ms = Some(ms);
        self
    }
}
