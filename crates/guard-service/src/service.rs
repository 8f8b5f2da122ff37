//! Guardrail orchestration.
//!
//! [`GuardrailService`] fans one text out to every enabled classifier,
//! joins their results under a per-classifier deadline, resolves the
//! policy action and rewrites the text when the action calls for it.
//! A classifier that times out or fails contributes nothing and leaves
//! a warning; the verdict still carries every other result. No error
//! escapes [`GuardrailService::process_text`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use guard_audit::{
    AuditEntry, AuditQuery, AuditRecorder, GuardStatistics, MemoryAuditStore, StatsAccumulator,
};
use guard_classify::{default_classifiers, Classifier};
use guard_common::{
    AtomicCounter, DetectedMatch, DetectionCategory, Direction, GuardAction, GuardError,
    GuardResult, GuardrailVerdict, ScanContext, ScanResult, Timestamp,
};
use guard_mask::MaskingEngine;

use crate::config::{ConfigRecord, ConfigStore, GuardConfig, GuardMode};
use crate::policy;

/// Lock-free runtime counters for the service.
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// Texts submitted for processing.
    pub requests_total: AtomicCounter,
    /// Texts skipped by the bypass allow-lists.
    pub requests_bypassed: AtomicCounter,
    /// Verdicts that blocked the payload.
    pub requests_blocked: AtomicCounter,
    /// Verdicts that rewrote the text.
    pub requests_masked: AtomicCounter,
    /// Matches that survived aggregation.
    pub matches_total: AtomicCounter,
    /// Classifier scans lost to timeouts or faults.
    pub scan_failures: AtomicCounter,
}

impl ServiceStats {
    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            requests_total: self.requests_total.get(),
            requests_bypassed: self.requests_bypassed.get(),
            requests_blocked: self.requests_blocked.get(),
            requests_masked: self.requests_masked.get(),
            matches_total: self.matches_total.get(),
            scan_failures: self.scan_failures.get(),
        }
    }
}

/// Serializable view of [`ServiceStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatsSnapshot {
    /// Texts submitted for processing.
    pub requests_total: u64,
    /// Texts skipped by the bypass allow-lists.
    pub requests_bypassed: u64,
    /// Verdicts that blocked the payload.
    pub requests_blocked: u64,
    /// Verdicts that rewrote the text.
    pub requests_masked: u64,
    /// Matches that survived aggregation.
    pub matches_total: u64,
    /// Classifier scans lost to timeouts or faults.
    pub scan_failures: u64,
}

/// Spawned classifier scan. Aborts the task when dropped so an
/// abandoned verdict cancels its in-flight scans instead of leaving
/// them to finish for nobody.
struct ScanTask {
    handle: JoinHandle<(DetectionCategory, GuardResult<ScanResult>)>,
}

impl Drop for ScanTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The guardrail layer between a pipeline host and the model.
pub struct GuardrailService {
    config: ConfigStore,
    classifiers: Vec<Arc<dyn Classifier>>,
    masking: MaskingEngine,
    audit: Arc<dyn AuditRecorder>,
    stats: ServiceStats,
}

impl GuardrailService {
    /// Service over the default classifier set, masking rules and an
    /// in-memory audit store.
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        let service = Self {
            config: ConfigStore::new(config)?,
            classifiers: default_classifiers(),
            masking: MaskingEngine::with_defaults(),
            audit: Arc::new(MemoryAuditStore::new()),
            stats: ServiceStats::default(),
        };
        service.push_classifier_options();
        Ok(service)
    }

    /// Replace the audit backend.
    pub fn with_recorder(mut self, audit: Arc<dyn AuditRecorder>) -> Self {
        self.audit = audit;
        self
    }

    /// Replace the classifier set. The active configuration is pushed
    /// into the replacements immediately.
    pub fn with_classifiers(mut self, classifiers: Vec<Arc<dyn Classifier>>) -> Self {
        self.classifiers = classifiers;
        self.push_classifier_options();
        self
    }

    /// Replace the masking engine.
    pub fn with_masking(mut self, masking: MaskingEngine) -> Self {
        self.masking = masking;
        self
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<GuardConfig> {
        self.config.snapshot()
    }

    /// Monotonic configuration version, bumped on every update.
    pub fn config_version(&self) -> u64 {
        self.config.version()
    }

    /// Runtime counters.
    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// The audit backend.
    pub fn audit(&self) -> &Arc<dyn AuditRecorder> {
        &self.audit
    }

    /// The masking engine, for runtime rule updates.
    pub fn masking(&self) -> &MaskingEngine {
        &self.masking
    }

    /// Validates and publishes a new configuration, then pushes the
    /// per-category options into the classifiers. Scans already in
    /// flight finish against the snapshot they loaded.
    pub fn update_config(&self, config: GuardConfig) -> GuardResult<()> {
        self.config.update(config)?;
        self.push_classifier_options();
        Ok(())
    }

    /// Re-derives the configuration from external store records layered
    /// over the current snapshot, without a restart.
    pub fn apply_records(&self, records: &[ConfigRecord]) -> GuardResult<()> {
        let next = GuardConfig::from_records(&self.config.snapshot(), records);
        self.update_config(next)
    }

    fn push_classifier_options(&self) {
        let config = self.config.snapshot();
        for classifier in &self.classifiers {
            let options = config
                .classifiers
                .get(&classifier.category())
                .cloned()
                .unwrap_or_default();
            classifier.configure(options);
        }
    }

    /// Guard a request payload on its way to the model.
    pub async fn validate_input(&self, text: &str, context: &ScanContext) -> GuardrailVerdict {
        self.process_text(text, Direction::Input, context).await
    }

    /// Guard a response payload on its way back to the user.
    pub async fn validate_output(&self, text: &str, context: &ScanContext) -> GuardrailVerdict {
        self.process_text(text, Direction::Output, context).await
    }

    /// Scan `text` and resolve a verdict.
    ///
    /// The pipeline is: bypass checks, size capping, one concurrent scan
    /// per enabled classifier under the configured deadline, severity
    /// aggregation, action resolution, masking when required, and audit
    /// recording. Joining the scans is the only await point that can
    /// take noticeable time.
    pub async fn process_text(
        &self,
        text: &str,
        direction: Direction,
        context: &ScanContext,
    ) -> GuardrailVerdict {
        self.stats.requests_total.inc();
        let config = self.config.snapshot();

        if !config.enabled {
            return GuardrailVerdict::allow(text);
        }
        if config.is_bypassed(context) {
            self.stats.requests_bypassed.inc();
            tracing::debug!(
                request_id = %context.request_id,
                "request matches a bypass allow-list, skipping scan"
            );
            return GuardrailVerdict::allow(text);
        }

        let started = Timestamp::now();
        let mut warnings: Vec<String> = Vec::new();

        let scan_len = if text.len() > config.max_text_len {
            let mut cut = config.max_text_len;
            while cut > 0 && !text.is_char_boundary(cut) {
                cut -= 1;
            }
            warnings.push(format!(
                "text length {} exceeds the {} byte scan limit, scanned a truncated prefix",
                text.len(),
                config.max_text_len
            ));
            cut
        } else {
            text.len()
        };
        let scan_text: Arc<str> = Arc::from(&text[..scan_len]);

        let tasks = self.spawn_scans(&scan_text, direction, &config);
        let (scan_results, joined_cleanly) =
            self.join_scans(tasks, &config, context, &mut warnings).await;

        if !joined_cleanly {
            return self.orchestration_failure_verdict(&config, text, warnings);
        }

        // Severity aggregates over every classifier result; the deduped
        // union below only drives warnings, masking and audit entries.
        let aggregated = scan_results.iter().filter_map(|r| r.highest_severity).max();
        let mut union: Vec<DetectedMatch> = scan_results
            .iter()
            .flat_map(|r| r.matches.iter().cloned())
            .collect();
        dedupe_across_classifiers(&mut union);
        self.stats.matches_total.add(union.len() as u64);

        for m in &union {
            warnings.push(format!(
                "detected {} ({} category, {} severity)",
                m.detection_type, m.category, m.severity
            ));
        }

        let action = policy::resolve_action(
            config.mode,
            aggregated,
            config.block_on_critical,
            config.mask_on_high,
        );
        let processed_text = if policy::should_rewrite(action, aggregated) && !union.is_empty() {
            self.stats.requests_masked.inc();
            // Match offsets point into the scanned prefix, which is a
            // prefix of `text`, so rewriting the full text keeps any
            // unscanned tail intact.
            self.masking.mask_all(text, &union).masked
        } else {
            text.to_string()
        };
        if action == GuardAction::Block {
            self.stats.requests_blocked.inc();
        }

        let should_audit =
            config.log_all_requests || (config.log_detections_only && !union.is_empty());
        if should_audit {
            self.record_audit(&union, &scan_results, direction, action, context)
                .await;
        }

        tracing::debug!(
            request_id = %context.request_id,
            %direction,
            %action,
            matches = union.len(),
            elapsed_ms = started.elapsed_millis(),
            "guardrail verdict resolved"
        );

        GuardrailVerdict {
            action,
            aggregated_severity: aggregated,
            processed_text,
            warnings,
            scan_results,
        }
    }

    /// Rewrites every pattern hit without scoring, severity resolution
    /// or auditing. Meant for scrubbing diagnostics and log payloads.
    pub fn quick_mask(&self, text: &str) -> String {
        self.classifiers
            .iter()
            .fold(text.to_string(), |acc, classifier| classifier.quick_mask(&acc))
    }

    /// Detection rollups from the audit trail, optionally bounded to a
    /// time window.
    pub async fn get_statistics(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> GuardResult<GuardStatistics> {
        if from.is_none() && to.is_none() {
            return self.audit.statistics().await;
        }
        let query = AuditQuery {
            from_time: from,
            to_time: to,
            limit: Some(usize::MAX),
            ..AuditQuery::default()
        };
        let entries = self.audit.query(&query).await?;
        let mut accumulator = StatsAccumulator::default();
        for entry in &entries {
            accumulator.add(entry);
        }
        Ok(accumulator.finish())
    }

    fn spawn_scans(
        &self,
        scan_text: &Arc<str>,
        direction: Direction,
        config: &GuardConfig,
    ) -> Vec<ScanTask> {
        let deadline = Duration::from_millis(config.classifier_timeout_ms);
        let mut tasks = Vec::with_capacity(self.classifiers.len());
        for classifier in &self.classifiers {
            if !classifier.is_enabled(direction) {
                continue;
            }
            let classifier = Arc::clone(classifier);
            let scan_text = Arc::clone(scan_text);
            let handle = tokio::spawn(async move {
                let category = classifier.category();
                let scan =
                    tokio::task::spawn_blocking(move || classifier.scan(&scan_text, direction));
                let outcome = match tokio::time::timeout(deadline, scan).await {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(join_error)) => {
                        let reason = if join_error.is_panic() {
                            "panicked"
                        } else {
                            "was cancelled"
                        };
                        Err(GuardError::ClassifierFailed(format!(
                            "{category} classifier {reason}"
                        )))
                    }
                    Err(_) => Err(GuardError::ClassifierTimeout(category.to_string())),
                };
                (category, outcome)
            });
            tasks.push(ScanTask { handle });
        }
        tasks
    }

    /// Awaits every scan task. Per-classifier timeouts and faults turn
    /// into warnings; a task that cannot be joined at all flips the
    /// clean flag so the caller takes the failure path.
    async fn join_scans(
        &self,
        tasks: Vec<ScanTask>,
        config: &GuardConfig,
        context: &ScanContext,
        warnings: &mut Vec<String>,
    ) -> (Vec<ScanResult>, bool) {
        let mut scan_results = Vec::with_capacity(tasks.len());
        let mut joined_cleanly = true;
        for mut task in tasks {
            match (&mut task.handle).await {
                Ok((_, Ok(result))) => scan_results.push(result),
                Ok((category, Err(error))) => {
                    self.stats.scan_failures.inc();
                    tracing::warn!(
                        request_id = %context.request_id,
                        %category,
                        %error,
                        "classifier scan failed, verdict continues without its results"
                    );
                    warnings.push(match error {
                        GuardError::ClassifierTimeout(_) => format!(
                            "{category} classifier timed out after {}ms, its findings are missing",
                            config.classifier_timeout_ms
                        ),
                        _ => format!("{category} classifier failed, its findings are missing"),
                    });
                }
                Err(join_error) => {
                    joined_cleanly = false;
                    tracing::error!(
                        request_id = %context.request_id,
                        error = %join_error,
                        "failed to join a classifier scan task"
                    );
                }
            }
        }
        (scan_results, joined_cleanly)
    }

    /// Verdict for a scan whose tasks could not be joined. Strict mode
    /// fails closed; the other modes fail open with a warning either way.
    fn orchestration_failure_verdict(
        &self,
        config: &GuardConfig,
        text: &str,
        mut warnings: Vec<String>,
    ) -> GuardrailVerdict {
        warnings.push("guardrail processing failed".to_string());
        let action = match config.mode {
            GuardMode::Strict => {
                self.stats.requests_blocked.inc();
                GuardAction::Block
            }
            GuardMode::Standard | GuardMode::Permissive => GuardAction::Allow,
        };
        GuardrailVerdict {
            action,
            aggregated_severity: None,
            processed_text: text.to_string(),
            warnings,
            scan_results: Vec::new(),
        }
    }

    async fn record_audit(
        &self,
        union: &[DetectedMatch],
        scan_results: &[ScanResult],
        direction: Direction,
        action: GuardAction,
        context: &ScanContext,
    ) {
        for m in union {
            let scan_ms = scan_results
                .iter()
                .find(|r| r.category == m.category)
                .map(|r| r.processing_time_ms);
            let mut entry = AuditEntry::from_match(m, direction, action, context);
            if let Some(ms) = scan_ms {
                entry = entry.with_processing_time(ms);
            }
            if let Err(error) = self.audit.record(entry).await {
                tracing::warn!(
                    request_id = %context.request_id,
                    %error,
                    "failed to record an audit entry"
                );
            }
        }
    }
}

/// Drops matches whose span overlaps an already kept earlier span, so
/// two classifiers hitting the same bytes produce one warning and one
/// rewrite. The earliest start wins; at equal start the higher severity,
/// then the longer match.
fn dedupe_across_classifiers(matches: &mut Vec<DetectedMatch>) {
    if matches.len() <= 1 {
        return;
    }
    matches.sort_by(|a, b| {
        a.start_index
            .cmp(&b.start_index)
            .then(b.severity.cmp(&a.severity))
            .then(b.end_index.cmp(&a.end_index))
    });
    let mut kept_end = 0usize;
    matches.retain(|m| {
        if m.start_index >= kept_end {
            kept_end = m.end_index;
            true
        } else {
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use guard_common::SeverityLevel;

    fn service() -> GuardrailService {
        GuardrailService::new(GuardConfig::default()).expect("default config is valid")
    }

    fn ctx() -> ScanContext {
        ScanContext::new("req-test")
    }

    fn make_match(
        category: DetectionCategory,
        start: usize,
        end: usize,
        severity: SeverityLevel,
    ) -> DetectedMatch {
        DetectedMatch {
            detection_type: "t".into(),
            category,
            raw_value: "v".into(),
            masked_value: "*".into(),
            start_index: start,
            end_index: end,
            severity,
            confidence: 0.9,
        }
    }

    #[test]
    fn dedupe_keeps_earliest_then_severity_then_length() {
        let mut matches = vec![
            make_match(DetectionCategory::Financial, 10, 20, SeverityLevel::High),
            make_match(DetectionCategory::IdentityData, 10, 25, SeverityLevel::High),
            make_match(DetectionCategory::IdentityData, 12, 18, SeverityLevel::Critical),
            make_match(DetectionCategory::Health, 30, 40, SeverityLevel::Low),
        ];
        dedupe_across_classifiers(&mut matches);
        assert_eq!(matches.len(), 2);
        // Equal start: same severity, longer span wins.
        assert_eq!(matches[0].end_index, 25);
        assert_eq!(matches[0].category, DetectionCategory::IdentityData);
        assert_eq!(matches[1].start_index, 30);
    }

    #[tokio::test]
    async fn disabled_service_allows_everything() {
        let mut config = GuardConfig::default();
        config.enabled = false;
        let service = GuardrailService::new(config).expect("valid");
        let verdict = service
            .process_text("card 4532015112830366", Direction::Input, &ctx())
            .await;
        assert_eq!(verdict.action, GuardAction::Allow);
        assert_eq!(verdict.processed_text, "card 4532015112830366");
        assert!(verdict.scan_results.is_empty());
    }

    #[tokio::test]
    async fn bypass_path_skips_scanning() {
        let mut config = GuardConfig::default();
        config.bypass_paths.push("/internal".into());
        let service = GuardrailService::new(config).expect("valid");
        let context = ScanContext::new("req-bypass").with_path("/internal/echo");
        let verdict = service
            .process_text("ssn 536-22-8124", Direction::Input, &context)
            .await;
        assert_eq!(verdict.action, GuardAction::Allow);
        assert_eq!(verdict.match_count(), 0);
        assert_eq!(service.stats().requests_bypassed.get(), 1);
    }

    #[tokio::test]
    async fn clean_text_allows_with_all_results() {
        let service = service();
        let verdict = service
            .process_text("the quick brown fox", Direction::Input, &ctx())
            .await;
        assert_eq!(verdict.action, GuardAction::Allow);
        assert_eq!(verdict.aggregated_severity, None);
        assert_eq!(verdict.scan_results.len(), 4);
        assert!(verdict.warnings.is_empty());
        assert_eq!(verdict.processed_text, "the quick brown fox");
    }

    #[tokio::test]
    async fn critical_detection_blocks_in_standard_mode() {
        let service = service();
        let verdict = service
            .process_text(
                "my key is sk-abcdefghijklmnopqrstuvwx1234",
                Direction::Input,
                &ctx(),
            )
            .await;
        assert_eq!(verdict.action, GuardAction::Block);
        assert_eq!(verdict.aggregated_severity, Some(SeverityLevel::Critical));
        assert!(verdict.blocked());
        // Blocked payloads are not rewritten.
        assert!(verdict.processed_text.contains("sk-abcdefghijklmnopqrstuvwx1234"));
        assert!(verdict.warnings.iter().any(|w| w.contains("openai_key")));
        assert!(verdict.warnings.iter().all(|w| !w.contains("abcdefghijklmnopqrstuvwx1234")));
        assert_eq!(service.stats().requests_blocked.get(), 1);
    }

    #[tokio::test]
    async fn critical_masks_when_blocking_disabled() {
        let mut config = GuardConfig::default();
        config.block_on_critical = false;
        let service = GuardrailService::new(config).expect("valid");
        let verdict = service
            .process_text("key sk-abcdefghijklmnopqrstuvwx1234 ok", Direction::Input, &ctx())
            .await;
        assert_eq!(verdict.action, GuardAction::Mask);
        assert!(!verdict.processed_text.contains("abcdefghijklmnopqrstuvwx1234"));
        assert!(verdict.processed_text.contains("sk-"));
        assert!(verdict.processed_text.ends_with(" ok"));
    }

    #[tokio::test]
    async fn medium_detection_masks_in_standard_mode() {
        let service = service();
        let verdict = service
            .process_text("mail me at jane.doe@example.com today", Direction::Input, &ctx())
            .await;
        assert_eq!(verdict.action, GuardAction::Mask);
        assert_eq!(verdict.aggregated_severity, Some(SeverityLevel::Medium));
        assert!(!verdict.processed_text.contains("jane.doe@example.com"));
        assert!(verdict.processed_text.contains("***@example.com"));
        assert_eq!(service.stats().requests_masked.get(), 1);
    }

    #[tokio::test]
    async fn permissive_critical_warns_and_still_scrubs() {
        let mut config = GuardConfig::default();
        config.mode = GuardMode::Permissive;
        let service = GuardrailService::new(config).expect("valid");
        let verdict = service
            .process_text("key sk-abcdefghijklmnopqrstuvwx1234", Direction::Input, &ctx())
            .await;
        assert_eq!(verdict.action, GuardAction::Warn);
        assert!(verdict.is_allowed());
        assert!(!verdict.processed_text.contains("abcdefghijklmnopqrstuvwx1234"));
    }

    #[tokio::test]
    async fn oversize_text_truncates_with_warning_and_keeps_tail() {
        let mut config = GuardConfig::default();
        config.max_text_len = 64;
        let service = GuardrailService::new(config).expect("valid");
        let head = "email jane.doe@example.com padding padding padding padding";
        assert!(head.len() <= 64);
        let tail = " and a very long tail that is past the scan limit entirely";
        let text = format!("{head}{tail}");
        assert!(text.len() > 64);

        let verdict = service.process_text(&text, Direction::Input, &ctx()).await;
        assert!(verdict.warnings.iter().any(|w| w.contains("scan limit")));
        assert_eq!(verdict.action, GuardAction::Mask);
        assert!(!verdict.processed_text.contains("jane.doe@example.com"));
        assert!(verdict.processed_text.ends_with(tail));
    }

    #[tokio::test]
    async fn truncation_respects_char_boundaries() {
        let mut config = GuardConfig::default();
        config.max_text_len = 10;
        let service = GuardrailService::new(config).expect("valid");
        // The leading ascii byte puts every following two-byte character
        // astride the 10-byte limit, forcing the boundary walk-back.
        let text = "aééééééé tail";
        let verdict = service.process_text(text, Direction::Input, &ctx()).await;
        assert_eq!(verdict.processed_text, text);
        assert!(verdict.warnings.iter().any(|w| w.contains("scan limit")));
    }

    #[tokio::test]
    async fn audit_entries_recorded_per_match() {
        let service = service();
        let context = ScanContext::new("req-audit").with_user("u1");
        let verdict = service
            .process_text(
                "cards 4532015112830366 and 4111111111111111",
                Direction::Output,
                &context,
            )
            .await;
        assert!(verdict.match_count() >= 2);

        let entries = service
            .audit()
            .query(&AuditQuery::default())
            .await
            .expect("query");
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.request_id, "req-audit");
            assert_eq!(entry.direction, Direction::Output);
            assert!(!entry.masked_value.contains("4532015112830366"));
        }
    }

    #[tokio::test]
    async fn clean_requests_not_audited_by_default() {
        let service = service();
        service
            .process_text("nothing sensitive here", Direction::Input, &ctx())
            .await;
        let entries = service
            .audit()
            .query(&AuditQuery::default())
            .await
            .expect("query");
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn quick_mask_scrubs_across_categories() {
        let service = service();
        let scrubbed =
            service.quick_mask("jane@example.com paid with 4532015112830366");
        assert!(!scrubbed.contains("jane@example.com"));
        assert!(!scrubbed.contains("4532015112830366"));
    }

    #[tokio::test]
    async fn config_update_reaches_classifiers() {
        let service = service();
        let mut config = GuardConfig::default();
        let mut options = guard_classify::ClassifierOptions::default();
        options.enabled = false;
        config
            .classifiers
            .insert(DetectionCategory::Financial, options);
        service.update_config(config).expect("valid");
        assert_eq!(service.config_version(), 2);

        let verdict = service
            .process_text("card 4532015112830366", Direction::Input, &ctx())
            .await;
        // Only three classifiers ran and the card went unreported.
        assert_eq!(verdict.scan_results.len(), 3);
        assert!(verdict
            .scan_results
            .iter()
            .all(|r| r.category != DetectionCategory::Financial));
    }

    #[tokio::test]
    async fn records_rederive_configuration() {
        let service = service();
        let records = vec![ConfigRecord {
            category: "service".into(),
            key: "mode".into(),
            value: "permissive".into(),
            is_enabled: true,
            priority: 0,
        }];
        service.apply_records(&records).expect("valid records");
        assert_eq!(service.config().mode, GuardMode::Permissive);
    }

    #[tokio::test]
    async fn statistics_window_filters_entries() {
        let service = service();
        service
            .process_text("card 4532015112830366", Direction::Input, &ctx())
            .await;

        let all = service.get_statistics(None, None).await.expect("stats");
        assert_eq!(all.total_entries, 1);

        let future = Utc::now() + chrono::Duration::hours(1);
        let none = service
            .get_statistics(Some(future), None)
            .await
            .expect("stats");
        assert_eq!(none.total_entries, 0);
    }

    struct FailingStore;

    #[async_trait]
    impl AuditRecorder for FailingStore {
        async fn record(&self, _entry: AuditEntry) -> GuardResult<()> {
            Err(GuardError::AuditError("store offline".into()))
        }

        async fn query(&self, _query: &AuditQuery) -> GuardResult<Vec<AuditEntry>> {
            Err(GuardError::AuditError("store offline".into()))
        }

        async fn statistics(&self) -> GuardResult<GuardStatistics> {
            Err(GuardError::AuditError("store offline".into()))
        }

        async fn purge_expired(&self) -> GuardResult<usize> {
            Err(GuardError::AuditError("store offline".into()))
        }
    }

    #[tokio::test]
    async fn audit_store_failure_never_blocks_the_verdict() {
        let service = service().with_recorder(Arc::new(FailingStore));
        let verdict = service
            .process_text("card 4532015112830366", Direction::Input, &ctx())
            .await;
        // The record failure is logged and swallowed; the verdict is
        // exactly what a healthy store would have produced.
        assert!(verdict.blocked());
        assert!(verdict.match_count() >= 1);

        let error = service.get_statistics(None, None).await.unwrap_err();
        assert!(matches!(error, GuardError::AuditError(_)));
    }
}
