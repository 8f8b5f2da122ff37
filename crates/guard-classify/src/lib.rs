//! Content classifiers for sensitive-data detection.
//!
//! Each classifier owns a compiled pattern table for one detection
//! category and turns raw regex hits into scored [`DetectedMatch`]es.
//! Confidence scoring is deterministic: checksum validators, entropy
//! measurement and context keywords, never sampling. Classifiers are
//! synchronous and `Send + Sync`; the service layer decides how to
//! schedule them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod credentials;
pub mod financial;
pub mod health;
pub mod identity;
pub mod pattern;
pub mod scanner;
pub mod validators;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use guard_common::{DetectionCategory, Direction, ScanResult};

pub use credentials::CredentialsClassifier;
pub use financial::FinancialClassifier;
pub use health::HealthClassifier;
pub use identity::IdentityClassifier;
pub use pattern::{ContextKeywords, PatternTable, RawHit};
pub use scanner::PatternScanner;

/// Runtime tuning for a single classifier. Swapped atomically on
/// configuration updates; scans in flight keep the snapshot they
/// started with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierOptions {
    /// Master switch for the classifier.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Scan request payloads (user to model).
    #[serde(default = "default_true")]
    pub scan_input: bool,
    /// Scan response payloads (model to user).
    #[serde(default = "default_true")]
    pub scan_output: bool,
    /// Detection type names to suppress entirely.
    #[serde(default)]
    pub excluded_types: Vec<String>,
    /// Exact values that are never reported, e.g. documented test keys.
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Matches scoring below this confidence are dropped.
    #[serde(default)]
    pub min_confidence: f64,
}

fn default_true() -> bool {
    true
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_input: true,
            scan_output: true,
            excluded_types: Vec::new(),
            whitelist: Vec::new(),
            min_confidence: 0.0,
        }
    }
}

impl ClassifierOptions {
    /// True when scanning is active for the given direction.
    pub fn scans(&self, direction: Direction) -> bool {
        self.enabled
            && match direction {
                Direction::Input => self.scan_input,
                Direction::Output => self.scan_output,
            }
    }
}

/// A detector for one category of sensitive content.
///
/// `scan` is CPU-bound and must not block on IO. Implementations keep
/// their compiled patterns for the lifetime of the classifier and read
/// options through an atomic snapshot, so `&self` methods are safe to
/// call from any number of threads.
pub trait Classifier: Send + Sync {
    /// Category this classifier reports under.
    fn category(&self) -> DetectionCategory;

    /// Replace the classifier's runtime options.
    fn configure(&self, options: ClassifierOptions);

    /// Whether this classifier participates in scans for `direction`.
    fn is_enabled(&self, direction: Direction) -> bool;

    /// Scan `text` and return every scored match.
    fn scan(&self, text: &str, direction: Direction) -> ScanResult;

    /// Mask every pattern hit in `text` without scoring or reporting.
    ///
    /// Confidence filtering is intentionally skipped so that low-score
    /// hits are still scrubbed from logs and diagnostics.
    fn quick_mask(&self, text: &str) -> String;
}

/// The standard classifier set, one per detection category.
pub fn default_classifiers() -> Vec<Arc<dyn Classifier>> {
    vec![
        Arc::new(IdentityClassifier::new()),
        Arc::new(CredentialsClassifier::new()),
        Arc::new(FinancialClassifier::new()),
        Arc::new(HealthClassifier::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classifiers_cover_all_categories() {
        let classifiers = default_classifiers();
        assert_eq!(classifiers.len(), DetectionCategory::ALL.len());
        for category in DetectionCategory::ALL {
            assert!(
                classifiers.iter().any(|c| c.category() == category),
                "missing classifier for {category}"
            );
        }
    }

    #[test]
    fn test_options_direction_gating() {
        let mut options = ClassifierOptions::default();
        assert!(options.scans(Direction::Input));
        assert!(options.scans(Direction::Output));

        options.scan_output = false;
        assert!(options.scans(Direction::Input));
        assert!(!options.scans(Direction::Output));

        options.enabled = false;
        assert!(!options.scans(Direction::Input));
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let options: ClassifierOptions = serde_json::from_str("{}").unwrap();
        assert!(options.enabled);
        assert!(options.whitelist.is_empty());
        assert_eq!(options.min_confidence, 0.0);
    }
}
