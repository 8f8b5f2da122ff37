//! Aggregate statistics over the audit trail.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entry::AuditEntry;

const TOP_TYPES: usize = 5;

/// Rollup counts over recorded entries. Keys are the stable string
/// forms of the enums so the structure serializes cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardStatistics {
    /// Entries considered.
    pub total_entries: usize,
    /// Count per detection category.
    pub by_category: HashMap<String, usize>,
    /// Count per severity level.
    pub by_severity: HashMap<String, usize>,
    /// Count per final action.
    pub by_action: HashMap<String, usize>,
    /// Most frequent detection types, highest count first, capped at
    /// five. Ties break alphabetically so output is stable.
    pub top_types: Vec<(String, usize)>,
    /// Mean scan wall time across entries that carried one.
    pub avg_processing_time_ms: f64,
}

/// Streaming accumulator so stores can build statistics without
/// cloning entries out of their map.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    total: usize,
    by_category: HashMap<String, usize>,
    by_severity: HashMap<String, usize>,
    by_action: HashMap<String, usize>,
    by_type: HashMap<String, usize>,
    time_sum: f64,
    time_count: usize,
}

impl StatsAccumulator {
    /// Fold one entry into the rollup.
    pub fn add(&mut self, entry: &AuditEntry) {
        self.total += 1;
        *self
            .by_category
            .entry(entry.category.to_string())
            .or_insert(0) += 1;
        *self
            .by_severity
            .entry(entry.severity.to_string())
            .or_insert(0) += 1;
        *self.by_action.entry(entry.action.to_string()).or_insert(0) += 1;
        *self
            .by_type
            .entry(entry.detection_type.clone())
            .or_insert(0) += 1;
        if let Some(ms) = entry.processing_time_ms {
            self.time_sum += ms;
            self.time_count += 1;
        }
    }

    /// Produce the final statistics.
    pub fn finish(self) -> GuardStatistics {
        let mut top_types: Vec<(String, usize)> = self.by_type.into_iter().collect();
        top_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_types.truncate(TOP_TYPES);
        GuardStatistics {
            total_entries: self.total,
            by_category: self.by_category,
            by_severity: self.by_severity,
            by_action: self.by_action,
            top_types,
            avg_processing_time_ms: if self.time_count > 0 {
                self.time_sum / self.time_count as f64
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guard_common::{
        DetectedMatch, DetectionCategory, Direction, GuardAction, ScanContext, SeverityLevel,
    };

    fn entry(detection_type: &str, ms: Option<f64>) -> AuditEntry {
        let detected = DetectedMatch {
            detection_type: detection_type.to_string(),
            category: DetectionCategory::Credentials,
            raw_value: "raw".to_string(),
            masked_value: "***".to_string(),
            start_index: 0,
            end_index: 3,
            severity: SeverityLevel::High,
            confidence: 0.9,
        };
        let mut e = AuditEntry::from_match(
            &detected,
            Direction::Input,
            GuardAction::Warn,
            &ScanContext::default(),
        );
        e.processing_time_ms = ms;
        e
    }

    #[test]
    fn test_top_types_capped_and_ordered() {
        let mut accumulator = StatsAccumulator::default();
        for (name, count) in [("a", 1), ("b", 3), ("c", 2), ("d", 5), ("e", 4), ("f", 4)] {
            for _ in 0..count {
                accumulator.add(&entry(name, None));
            }
        }
        let stats = accumulator.finish();
        assert_eq!(stats.total_entries, 19);
        assert_eq!(stats.top_types.len(), 5);
        assert_eq!(stats.top_types[0], ("d".to_string(), 5));
        // 4-4 tie breaks alphabetically.
        assert_eq!(stats.top_types[1], ("e".to_string(), 4));
        assert_eq!(stats.top_types[2], ("f".to_string(), 4));
        assert_eq!(stats.top_types[3], ("b".to_string(), 3));
        assert_eq!(stats.top_types[4], ("c".to_string(), 2));
    }

    #[test]
    fn test_average_ignores_missing_times() {
        let mut accumulator = StatsAccumulator::default();
        accumulator.add(&entry("a", Some(2.0)));
        accumulator.add(&entry("a", Some(4.0)));
        accumulator.add(&entry("a", None));
        let stats = accumulator.finish();
        assert!((stats.avg_processing_time_ms - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_accumulator() {
        let stats = StatsAccumulator::default().finish();
        assert_eq!(stats.total_entries, 0);
        assert!(stats.top_types.is_empty());
        assert_eq!(stats.avg_processing_time_ms, 0.0);
    }
}
