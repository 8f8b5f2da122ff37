//! Identity data: contact details, government identifiers, network
//! addresses.

use guard_common::{DetectionCategory, Direction, ScanResult, SeverityLevel};
use guard_mask::maskers;

use crate::pattern::{ContextKeywords, PatternTable, RawHit};
use crate::scanner::PatternScanner;
use crate::validators;
use crate::{Classifier, ClassifierOptions};

const CONTEXT_WINDOW: usize = 30;

/// Detects personally identifying information in free text.
pub struct IdentityClassifier {
    scanner: PatternScanner,
    context: ContextKeywords,
}

impl IdentityClassifier {
    /// Build the classifier with its full pattern table.
    pub fn new() -> Self {
        Self {
            scanner: PatternScanner::new(DetectionCategory::IdentityData, Self::build_table()),
            context: ContextKeywords::new(
                &["ssn", "social security", "passport", "tax id"],
                CONTEXT_WINDOW,
            ),
        }
    }

    fn build_table() -> PatternTable {
        PatternTable::builder()
            .pattern(
                "email",
                r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
                SeverityLevel::Medium,
                0.9,
            )
            .pattern(
                "phone_us",
                r"\b(?:\+?1[-.\s]?)?\(?[2-9]\d{2}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
                SeverityLevel::High,
                0.7,
            )
            .pattern(
                "phone_intl",
                r"\+\d{1,3}(?:[ -]?\d){6,12}\b",
                SeverityLevel::High,
                0.75,
            )
            .pattern("ssn", r"\b\d{3}-\d{2}-\d{4}\b", SeverityLevel::High, 0.7)
            .pattern(
                "passport",
                r"\b[A-Z]{1,2}\d{7,8}\b",
                SeverityLevel::Medium,
                0.4,
            )
            .labeled(
                "drivers_license",
                r"\b(?i:driver'?s?\s+licen[sc]e|dl)\s*(?i:number|num|no)?\.?\s*[:#]?\s*([A-Z0-9]{5,13})\b",
                SeverityLevel::High,
                0.8,
            )
            .labeled(
                "date_of_birth",
                r"\b(?i:dob|date\s+of\s+birth|birth\s*date|born\s+on)\s*:?\s*(\d{4}-\d{2}-\d{2}|\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4})\b",
                SeverityLevel::Medium,
                0.85,
            )
            .pattern(
                "street_address",
                r"\b\d{1,5}\s+(?:[A-Z][A-Za-z]*\s+){1,3}(?:Street|St|Avenue|Ave|Boulevard|Blvd|Road|Rd|Drive|Dr|Lane|Ln|Court|Ct|Place|Pl|Way)\b",
                SeverityLevel::Low,
                0.6,
            )
            .pattern(
                "ipv4",
                r"\b(?:(?:25[0-5]|2[0-4]\d|1\d{2}|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d{2}|[1-9]?\d)\b",
                SeverityLevel::Low,
                0.7,
            )
            .pattern(
                "ipv6",
                r"\b(?:[0-9a-fA-F]{1,4}:){4,7}[0-9a-fA-F]{1,4}\b",
                SeverityLevel::Low,
                0.6,
            )
            .build()
    }

    fn confidence(&self, hit: &RawHit<'_>, text: &str) -> f64 {
        match hit.name {
            "ssn" => {
                if validators::ssn_valid(hit.value) {
                    if self.context.near(text, hit.start, hit.end) {
                        0.9
                    } else {
                        0.7
                    }
                } else {
                    0.3
                }
            }
            "passport" => {
                if self.context.near(text, hit.start, hit.end) {
                    0.85
                } else {
                    hit.base_confidence
                }
            }
            // Bare ten-digit runs are far more often order numbers
            // than phone numbers.
            "phone_us" => {
                if hit.value.chars().any(|c| matches!(c, '-' | '.' | '(' | ' ')) {
                    0.8
                } else {
                    0.45
                }
            }
            "ipv4" => {
                if validators::is_common_ip(hit.value) {
                    0.3
                } else {
                    hit.base_confidence
                }
            }
            _ => hit.base_confidence,
        }
    }

    fn mask_value(value: &str, name: &str) -> String {
        match name {
            "email" => maskers::mask_email(value),
            "phone_us" | "phone_intl" => maskers::mask_phone(value),
            "ssn" => "***-**-****".to_string(),
            "date_of_birth" => "**/**/****".to_string(),
            "passport" | "drivers_license" => maskers::partial(value, 1, 2),
            "street_address" => "[ADDRESS]".to_string(),
            "ipv4" => match value.split('.').next() {
                Some(first) => format!("{first}.*.*.*"),
                None => "*.*.*.*".to_string(),
            },
            "ipv6" => "[IPV6]".to_string(),
            _ => "*".repeat(value.chars().count().min(20)),
        }
    }
}

impl Default for IdentityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for IdentityClassifier {
    fn category(&self) -> DetectionCategory {
        DetectionCategory::IdentityData
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
