//! Financial data: cards, bank identifiers, tax IDs, crypto addresses.

use guard_common::{DetectionCategory, Direction, ScanResult, SeverityLevel};
use guard_mask::maskers;

use crate::pattern::{ContextKeywords, PatternTable, RawHit};
use crate::scanner::PatternScanner;
use crate::validators;
use crate::{Classifier, ClassifierOptions};

const CONTEXT_WINDOW: usize = 30;

/// Detects payment and banking identifiers. Checksums carry most of
/// the scoring weight: a Luhn or mod-97 pass is near-certain, a fail
/// drops the hit to advisory confidence without discarding it.
pub struct FinancialClassifier {
    scanner: PatternScanner,
    context: ContextKeywords,
}

impl FinancialClassifier {
    /// Build the classifier with its full pattern table.
    pub fn new() -> Self {
        Self {
            scanner: PatternScanner::new(DetectionCategory::Financial, Self::build_table()),
            context: ContextKeywords::new(
                &["iban", "swift", "bic", "ein", "tax", "bank"],
                CONTEXT_WINDOW,
            ),
        }
    }

    fn build_table() -> PatternTable {
        PatternTable::builder()
            .pattern(
                "credit_card",
                r"\b(?:(?:4\d{3}|5[1-5]\d{2}|6(?:011|5\d{2})|3(?:0[0-5]|[68]\d)\d)[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}|3[47]\d{2}[\s-]?\d{6}[\s-]?\d{5})\b",
                SeverityLevel::Critical,
                0.95,
            )
            .pattern(
                "iban",
                r"\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b",
                SeverityLevel::High,
                0.95,
            )
            .pattern(
                "bic",
                r"\b[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?\b",
                SeverityLevel::Medium,
                0.35,
            )
            .labeled(
                "us_bank_account",
                r"\b(?i:account|acct)\.?\s*(?i:number|num|no)?\.?\s*[:#]?\s*(\d{8,17})\b",
                SeverityLevel::High,
                0.75,
            )
            .labeled(
                "aba_routing",
                r"\b(?i:routing|aba)\s*(?i:number|num|no)?\.?\s*[:#]?\s*(\d{9})\b",
                SeverityLevel::High,
                0.75,
            )
            .pattern("ein", r"\b\d{2}-\d{7}\b", SeverityLevel::Medium, 0.4)
            .pattern(
                "itin",
                r"\b9\d{2}-[5-9]\d-\d{4}\b",
                SeverityLevel::High,
                0.7,
            )
            .pattern(
                "crypto_btc",
                r"\b(?:bc1[a-z0-9]{25,62}|[13][1-9A-HJ-NP-Za-km-z]{25,34})\b",
                SeverityLevel::Medium,
                0.8,
            )
            .pattern(
                "crypto_eth",
                r"\b0x[a-fA-F0-9]{40}\b",
                SeverityLevel::Medium,
                0.9,
            )
            .build()
    }

    fn confidence(&self, hit: &RawHit<'_>, text: &str) -> f64 {
        match hit.name {
            "credit_card" => {
                if validators::luhn_valid(hit.value) {
                    hit.base_confidence
                } else {
                    0.35
                }
            }
            "iban" => {
                if validators::iban_valid(hit.value) {
                    hit.base_confidence
                } else {
                    0.3
                }
            }
            "aba_routing" => {
                if validators::aba_valid(hit.value) {
                    0.95
                } else {
                    0.3
                }
            }
            "bic" | "ein" => {
                if self.context.near(text, hit.start, hit.end) {
                    0.85
                } else {
                    hit.base_confidence
                }
            }
            _ => hit.base_confidence,
        }
    }

    fn mask_value(value: &str, name: &str) -> String {
        match name {
            "credit_card" => maskers::mask_card(value),
            "iban" => maskers::mask_iban(value),
            "bic" => maskers::partial(value, 4, 0),
            "us_bank_account" | "aba_routing" => maskers::mask_digits_keep_last(value, 4),
            "ein" => "**-*******".to_string(),
            "itin" => "***-**-****".to_string(),
            "crypto_btc" => maskers::partial(value, 3, 4),
            "crypto_eth" => maskers::partial(value, 2, 4),
            _ => "*".repeat(value.chars().count().min(20)),
        }
    }
}

impl Default for FinancialClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for FinancialClassifier {
    fn category(&self) -> DetectionCategory {
        DetectionCategory::Financial
    }

    fn configure(&self, options: ClassifierOptions) {
        self.scanner.configure(options);
    }

    fn is_enabled(&self, direction: Direction) -> bool {
        self.scanner.is_enabled(direction)
    }

    fn scan(&self, text: &str, direction: Direction) -> ScanResult {
        self.scanner
            .scan(text, direction, |hit, text| self.confidence(hit, text), Self::mask_value)
    }

    fn quick_mask(&self, text: &str) -> String {
        self.scanner.quick_mask(text, Self::mask_value)
    }
}
