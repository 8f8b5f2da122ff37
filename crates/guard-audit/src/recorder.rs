//! Audit recording and retrieval.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use guard_common::{DetectionCategory, GuardResult, SeverityLevel};

use crate::entry::AuditEntry;
use crate::stats::{GuardStatistics, StatsAccumulator};

const DEFAULT_QUERY_LIMIT: usize = 100;
const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Filters for audit retrieval. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Restrict to one user.
    pub user_id: Option<String>,
    /// Restrict to one detection category.
    pub category: Option<DetectionCategory>,
    /// Keep entries at or above this severity.
    pub min_severity: Option<SeverityLevel>,
    /// Keep entries recorded at or after this instant.
    pub from_time: Option<DateTime<Utc>>,
    /// Keep entries recorded at or before this instant.
    pub to_time: Option<DateTime<Utc>>,
    /// Maximum entries returned, newest first. Defaults to 100.
    pub limit: Option<usize>,
}

/// Storage behind audit recording.
///
/// `record` runs on the request path after the verdict is decided, so
/// implementations keep it cheap and push slow IO elsewhere.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    /// Persist one entry.
    async fn record(&self, entry: AuditEntry) -> GuardResult<()>;

    /// Fetch entries matching `query`, newest first.
    async fn query(&self, query: &AuditQuery) -> GuardResult<Vec<AuditEntry>>;

    /// Rollup counts over the whole trail.
    async fn statistics(&self) -> GuardResult<GuardStatistics>;

    /// Drop entries past retention. Returns how many were removed.
    async fn purge_expired(&self) -> GuardResult<usize>;
}

/// In-memory store on a concurrent map, the default backend. Entries
/// are only ever inserted or aged out; there is no update path.
pub struct MemoryAuditStore {
    entries: DashMap<Uuid, AuditEntry>,
    retention_days: i64,
}

impl MemoryAuditStore {
    /// Store with the default 90-day retention.
    pub fn new() -> Self {
        Self::with_retention_days(DEFAULT_RETENTION_DAYS)
    }

    /// Store with explicit retention.
    pub fn with_retention_days(days: i64) -> Self {
        Self {
            entries: DashMap::new(),
            retention_days: days,
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditRecorder for MemoryAuditStore {
    async fn record(&self, entry: AuditEntry) -> GuardResult<()> {
        tracing::info!(
            entry_id = %entry.id,
            category = %entry.category,
            detection_type = %entry.detection_type,
            severity = %entry.severity,
            action = %entry.action,
            direction = %entry.direction,
            confidence = entry.confidence,
            "audit entry recorded"
        );
        self.entries.insert(entry.id, entry);
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> GuardResult<Vec<AuditEntry>> {
        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let mut matched: Vec<AuditEntry> = self
            .entries
            .iter()
            .filter(|e| {
                query
                    .user_id
                    .as_ref()
                    .map_or(true, |u| e.user_id.as_deref() == Some(u.as_str()))
            })
            .filter(|e| query.category.map_or(true, |c| e.category == c))
            .filter(|e| query.min_severity.map_or(true, |s| e.severity >= s))
            .filter(|e| query.from_time.map_or(true, |t| e.timestamp >= t))
            .filter(|e| query.to_time.map_or(true, |t| e.timestamp <= t))
            .map(|e| e.value().clone())
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn statistics(&self) -> GuardResult<GuardStatistics> {
        let mut accumulator = StatsAccumulator::default();
        for entry in self.entries.iter() {
            accumulator.add(entry.value());
        }
        Ok(accumulator.finish())
    }

    async fn purge_expired(&self) -> GuardResult<usize> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let before = self.entries.len();
        self.entries.retain(|_, e| e.timestamp >= cutoff);
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(removed, retention_days = self.retention_days, "purged expired audit entries");
        }
        Ok(removed)
    }
}
