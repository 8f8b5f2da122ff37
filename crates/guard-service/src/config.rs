//! Service configuration and its hot-reload store.
//!
//! Configuration lives behind an [`ArcSwap`] so scans read a consistent
//! snapshot without locking while updates swap the whole document at once.
//! A scan that started before an update finishes against the snapshot it
//! loaded; the new configuration applies to scans that start afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use guard_classify::ClassifierOptions;
use guard_common::{DetectionCategory, GuardError, GuardResult, ScanContext};

/// Default cap on scanned text, in bytes.
pub const DEFAULT_MAX_TEXT_LEN: usize = 1_048_576;

/// Default per-classifier scan deadline.
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 500;

/// Enforcement posture. Selects the severity-to-action table applied to
/// every verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Block critical and high findings, mask medium, warn on the rest.
    Strict,
    /// Configurable blocking and masking; the shipped default.
    #[default]
    Standard,
    /// Never block. Warn on critical, mask high, log the rest.
    Permissive,
}

impl GuardMode {
    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardMode::Strict => "strict",
            GuardMode::Standard => "standard",
            GuardMode::Permissive => "permissive",
        }
    }

    /// Parses the string form, ignoring case.
    pub fn parse(s: &str) -> Option<GuardMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(GuardMode::Strict),
            "standard" => Some(GuardMode::Standard),
            "permissive" => Some(GuardMode::Permissive),
            _ => None,
        }
    }
}

impl std::fmt::Display for GuardMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn default_max_text_len() -> usize {
    DEFAULT_MAX_TEXT_LEN
}

fn default_classifier_timeout_ms() -> u64 {
    DEFAULT_CLASSIFIER_TIMEOUT_MS
}

/// Top-level guardrail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardConfig {
    /// Master switch. When false every request passes through untouched.
    pub enabled: bool,
    /// Enforcement posture.
    pub mode: GuardMode,
    /// In standard mode, whether critical findings block instead of mask.
    pub block_on_critical: bool,
    /// In standard mode, whether high findings mask instead of log.
    pub mask_on_high: bool,
    /// Record audit entries only for requests with detections.
    pub log_detections_only: bool,
    /// Record audit entries for every request regardless of detections.
    pub log_all_requests: bool,
    /// Texts longer than this are truncated before scanning.
    pub max_text_len: usize,
    /// Hard deadline for a single classifier scan.
    pub classifier_timeout_ms: u64,
    /// Request path prefixes exempt from scanning.
    pub bypass_paths: Vec<String>,
    /// Caller identities exempt from scanning.
    pub bypass_callers: Vec<String>,
    /// Per-category classifier overrides.
    pub classifiers: HashMap<DetectionCategory, ClassifierOptions>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            mode: GuardMode::default(),
            block_on_critical: default_true(),
            mask_on_high: default_true(),
            log_detections_only: default_true(),
            log_all_requests: false,
            max_text_len: default_max_text_len(),
            classifier_timeout_ms: default_classifier_timeout_ms(),
            bypass_paths: Vec::new(),
            bypass_callers: Vec::new(),
            classifiers: HashMap::new(),
        }
    }
}

impl GuardConfig {
    /// Checks internal consistency. Called before any store update so a
    /// bad document never becomes the active snapshot.
    pub fn validate(&self) -> GuardResult<()> {
        if self.max_text_len == 0 {
            return Err(GuardError::ConfigError(
                "maxTextLen must be greater than zero".into(),
            ));
        }
        if self.classifier_timeout_ms == 0 {
            return Err(GuardError::ConfigError(
                "classifierTimeoutMs must be greater than zero".into(),
            ));
        }
        for (category, options) in &self.classifiers {
            if !(0.0..=1.0).contains(&options.min_confidence) {
                return Err(GuardError::ConfigError(format!(
                    "minConfidence for {category} must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// True when the request context matches a bypass allow-list. Paths
    /// match by prefix, callers by exact identity.
    pub fn is_bypassed(&self, context: &ScanContext) -> bool {
        if let Some(path) = &context.request_path {
            if self.bypass_paths.iter().any(|p| path.starts_with(p.as_str())) {
                return true;
            }
        }
        if let Some(caller) = &context.caller_id {
            if self.bypass_callers.iter().any(|c| c == caller) {
                return true;
            }
        }
        false
    }

    /// Folds a set of key-value records from an external configuration
    /// store into a full configuration document.
    ///
    /// Records apply in ascending priority so higher-priority rows win.
    /// Disabled rows and rows that fail to parse are skipped; a skipped
    /// row is logged and never aborts the derivation.
    pub fn from_records(base: &GuardConfig, records: &[ConfigRecord]) -> GuardConfig {
        let mut config = base.clone();
        let mut ordered: Vec<&ConfigRecord> = records.iter().filter(|r| r.is_enabled).collect();
        ordered.sort_by_key(|r| r.priority);
        for record in ordered {
            if !config.apply_record(record) {
                tracing::warn!(
                    category = %record.category,
                    key = %record.key,
                    "ignoring unrecognized or malformed configuration record"
                );
            }
        }
        config
    }

    fn apply_record(&mut self, record: &ConfigRecord) -> bool {
        let value = record.value.trim();
        if record.category.eq_ignore_ascii_case("service") {
            return match record.key.as_str() {
                "enabled" => parse_bool(value).map(|v| self.enabled = v).is_some(),
                "mode" => GuardMode::parse(value).map(|v| self.mode = v).is_some(),
                "blockOnCritical" => {
                    parse_bool(value).map(|v| self.block_on_critical = v).is_some()
                }
                "maskOnHigh" => parse_bool(value).map(|v| self.mask_on_high = v).is_some(),
                "logDetectionsOnly" => {
                    parse_bool(value).map(|v| self.log_detections_only = v).is_some()
                }
                "logAllRequests" => {
                    parse_bool(value).map(|v| self.log_all_requests = v).is_some()
                }
                "maxTextLen" => value.parse().map(|v| self.max_text_len = v).is_ok(),
                "classifierTimeoutMs" => {
                    value.parse().map(|v| self.classifier_timeout_ms = v).is_ok()
                }
                "bypassPaths" => {
                    self.bypass_paths = parse_list(value);
                    true
                }
                "bypassCallers" => {
                    self.bypass_callers = parse_list(value);
                    true
                }
                _ => false,
            };
        }

        let Some(category) = DetectionCategory::parse(&record.category) else {
            return false;
        };
        let options = self.classifiers.entry(category).or_default();
        match record.key.as_str() {
            "enabled" => parse_bool(value).map(|v| options.enabled = v).is_some(),
            "scanInput" => parse_bool(value).map(|v| options.scan_input = v).is_some(),
            "scanOutput" => parse_bool(value).map(|v| options.scan_output = v).is_some(),
            "minConfidence" => value.parse().map(|v| options.min_confidence = v).is_ok(),
            "excludedTypes" => {
                options.excluded_types = parse_list(value);
                true
            }
            "whitelist" => {
                options.whitelist = parse_list(value);
                true
            }
            _ => false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// One row of an external configuration store. The service re-derives its
/// configuration from these without a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRecord {
    /// `"service"` or a detection category name.
    pub category: String,
    /// Setting name within the category.
    pub key: String,
    /// Setting value in string form.
    pub value: String,
    /// Disabled records are skipped during derivation.
    pub is_enabled: bool,
    /// Higher priority wins when two records set the same key.
    pub priority: i32,
}

/// Versioned copy-on-write holder for the active configuration.
#[derive(Debug)]
pub struct ConfigStore {
    inner: ArcSwap<GuardConfig>,
    version: AtomicU64,
}

impl ConfigStore {
    /// Store seeded with a validated configuration.
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: ArcSwap::from_pointee(config),
            version: AtomicU64::new(1),
        })
    }

    /// Current configuration snapshot. Holders keep reading the snapshot
    /// they loaded even if an update lands mid-scan.
    pub fn snapshot(&self) -> Arc<GuardConfig> {
        self.inner.load_full()
    }

    /// Validates and atomically publishes a new configuration.
    pub fn update(&self, config: GuardConfig) -> GuardResult<()> {
        config.validate()?;
        self.inner.store(Arc::new(config));
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(version, "guardrail configuration updated");
        Ok(())
    }

    /// Monotonic version, bumped on every successful update.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            inner: ArcSwap::from_pointee(GuardConfig::default()),
            version: AtomicU64::new(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = GuardConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.enabled);
        assert_eq!(config.mode, GuardMode::Standard);
        assert!(config.block_on_critical);
        assert_eq!(config.max_text_len, DEFAULT_MAX_TEXT_LEN);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut config = GuardConfig::default();
        config.max_text_len = 0;
        assert!(config.validate().is_err());

        let mut config = GuardConfig::default();
        config.classifier_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let mut config = GuardConfig::default();
        let mut options = ClassifierOptions::default();
        options.min_confidence = 1.5;
        config.classifiers.insert(DetectionCategory::Financial, options);
        assert!(config.validate().is_err());
    }

    #[test]
    fn bypass_matches_path_prefix_and_exact_caller() {
        let mut config = GuardConfig::default();
        config.bypass_paths.push("/health".into());
        config.bypass_callers.push("metrics-agent".into());

        let ctx = ScanContext::new("r1").with_path("/health/live");
        assert!(config.is_bypassed(&ctx));

        let ctx = ScanContext::new("r2").with_path("/v1/chat");
        assert!(!config.is_bypassed(&ctx));

        let ctx = ScanContext::new("r3").with_caller("metrics-agent");
        assert!(config.is_bypassed(&ctx));

        let ctx = ScanContext::new("r4").with_caller("metrics-agent-2");
        assert!(!config.is_bypassed(&ctx));
    }

    #[test]
    fn records_derive_service_settings_by_priority() {
        let records = vec![
            ConfigRecord {
                category: "service".into(),
                key: "mode".into(),
                value: "permissive".into(),
                is_enabled: true,
                priority: 10,
            },
            ConfigRecord {
                category: "service".into(),
                key: "mode".into(),
                value: "strict".into(),
                is_enabled: true,
                priority: 20,
            },
            ConfigRecord {
                category: "service".into(),
                key: "maxTextLen".into(),
                value: "2048".into(),
                is_enabled: true,
                priority: 0,
            },
            ConfigRecord {
                category: "service".into(),
                key: "enabled".into(),
                value: "false".into(),
                is_enabled: false,
                priority: 99,
            },
        ];
        let config = GuardConfig::from_records(&GuardConfig::default(), &records);
        assert_eq!(config.mode, GuardMode::Strict);
        assert_eq!(config.max_text_len, 2048);
        assert!(config.enabled, "disabled record must not apply");
    }

    #[test]
    fn records_derive_classifier_options() {
        let records = vec![
            ConfigRecord {
                category: "financial".into(),
                key: "minConfidence".into(),
                value: "0.8".into(),
                is_enabled: true,
                priority: 0,
            },
            ConfigRecord {
                category: "financial".into(),
                key: "excludedTypes".into(),
                value: "bic, ein".into(),
                is_enabled: true,
                priority: 0,
            },
            ConfigRecord {
                category: "health".into(),
                key: "scanInput".into(),
                value: "off".into(),
                is_enabled: true,
                priority: 0,
            },
        ];
        let config = GuardConfig::from_records(&GuardConfig::default(), &records);
        let financial = &config.classifiers[&DetectionCategory::Financial];
        assert!((financial.min_confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(financial.excluded_types, vec!["bic", "ein"]);
        assert!(!config.classifiers[&DetectionCategory::Health].scan_input);
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let records = vec![
            ConfigRecord {
                category: "service".into(),
                key: "maxTextLen".into(),
                value: "not-a-number".into(),
                is_enabled: true,
                priority: 0,
            },
            ConfigRecord {
                category: "nonsense".into(),
                key: "enabled".into(),
                value: "true".into(),
                is_enabled: true,
                priority: 0,
            },
        ];
        let config = GuardConfig::from_records(&GuardConfig::default(), &records);
        assert_eq!(config.max_text_len, DEFAULT_MAX_TEXT_LEN);
    }

    #[test]
    fn store_updates_bump_version_and_swap_snapshot() {
        let store = ConfigStore::default();
        assert_eq!(store.version(), 1);
        let before = store.snapshot();

        let mut next = GuardConfig::default();
        next.mode = GuardMode::Strict;
        store.update(next).expect("valid config");

        assert_eq!(store.version(), 2);
        assert_eq!(store.snapshot().mode, GuardMode::Strict);
        // The old snapshot is unaffected by the swap.
        assert_eq!(before.mode, GuardMode::Standard);
    }

    #[test]
    fn store_rejects_invalid_update_and_keeps_old_snapshot() {
        let store = ConfigStore::default();
        let mut bad = GuardConfig::default();
        bad.max_text_len = 0;
        assert!(store.update(bad).is_err());
        assert_eq!(store.version(), 1);
        assert_eq!(store.snapshot().max_text_len, DEFAULT_MAX_TEXT_LEN);
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = GuardConfig::default();
        config.mode = GuardMode::Permissive;
        config.bypass_paths.push("/internal".into());
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(json.contains("\"permissive\""));
        let back: GuardConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.mode, GuardMode::Permissive);
        assert_eq!(back.bypass_paths, vec!["/internal"]);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let back: GuardConfig = serde_json::from_str(r#"{"mode":"strict"}"#).expect("parse");
        assert_eq!(back.mode, GuardMode::Strict);
        assert!(back.enabled);
        assert_eq!(back.classifier_timeout_ms, DEFAULT_CLASSIFIER_TIMEOUT_MS);
    }
}
