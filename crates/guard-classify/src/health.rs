//! Health data: diagnosis codes, medications, lab results, clinical
//! identifiers.

use guard_common::{DetectionCategory, Direction, ScanResult, SeverityLevel};
use guard_mask::maskers;

use crate::pattern::{ContextKeywords, PatternTable, RawHit};
use crate::scanner::PatternScanner;
use crate::validators;
use crate::{Classifier, ClassifierOptions};

const CONTEXT_WINDOW: usize = 30;

/// Detects protected health information. Clinical identifiers are
/// mostly label-driven; bare ICD codes lean on nearby clinical
/// vocabulary to separate them from part numbers.
pub struct HealthClassifier {
    scanner: PatternScanner,
    context: ContextKeywords,
}

impl HealthClassifier {
    /// Build the classifier with its full pattern table.
    pub fn new() -> Self {
        Self {
            scanner: PatternScanner::new(DetectionCategory::Health, Self::build_table()),
            context: ContextKeywords::new(
                &[
                    "patient",
                    "diagnosis",
                    "diagnosed",
                    "icd",
                    "condition",
                    "prescribed",
                ],
                CONTEXT_WINDOW,
            ),
        }
    }

    fn build_table() -> PatternTable {
        PatternTable::builder()
            .labeled(
                "diagnosis_label",
                r"\b(?i:diagnosis|diagnosed\s+with|icd-?10(?:\s+code)?)\s*:?\s*([A-TV-Z]\d{2}(?:\.\d{1,4})?)\b",
                SeverityLevel::High,
                0.9,
            )
            .pattern(
                "icd10_code",
                r"\b[A-TV-Z]\d{2}\.\d{1,4}\b",
                SeverityLevel::High,
                0.7,
            )
            .pattern(
                "medication_dosage",
                r"\b[A-Z][a-z]{3,}\s?\d{1,4}\s?(?i:mg|mcg|ml|units?)\b",
                SeverityLevel::Medium,
                0.7,
            )
            .labeled(
                "lab_value",
                r"\b(?i:a1c|hba1c|glucose|cholesterol|ldl|hdl|triglycerides|creatinine|tsh|hemoglobin|wbc)\s*:?\s*(\d{1,3}(?:\.\d{1,2})?)\b",
                SeverityLevel::Medium,
                0.85,
            )
            .labeled(
                "insurance_id",
                r"\b(?i:member|policy|insurance)\s*(?i:id|number|num|no)?\s*[:#]?\s*([A-Z]{1,3}\d{6,12})\b",
                SeverityLevel::High,
                0.8,
            )
            .labeled(
                "mrn",
                r"\b(?i:mrn|medical\s+record(?:\s+(?:number|num|no))?)\s*[:#]?\s*(\d{6,10})\b",
                SeverityLevel::High,
                0.9,
            )
            .labeled(
                "npi",
                r"\b(?i:npi)\s*[:#]?\s*(\d{10})\b",
                SeverityLevel::Medium,
                0.4,
            )
            .labeled(
                "dea",
                r"\b(?i:dea)\s*(?i:number|num|no)?\.?\s*[:#]?\s*([ABFGMPRX][A-Z]\d{7})\b",
                SeverityLevel::Medium,
                0.4,
            )
            .build()
    }

    fn confidence(&self, hit: &RawHit<'_>, text: &str) -> f64 {
        match hit.name {
            "icd10_code" => {
                if self.context.near(text, hit.start, hit.end) {
                    0.9
                } else {
                    hit.base_confidence
                }
            }
            "npi" => {
                if validators::npi_valid(hit.value) {
                    0.95
                } else {
                    hit.base_confidence
                }
            }
            "dea" => {
                if validators::dea_valid(hit.value) {
                    0.95
                } else {
                    hit.base_confidence
                }
            }
            _ => hit.base_confidence,
        }
    }

    fn mask_value(value: &str, name: &str) -> String {
        match name {
            "diagnosis_label" | "icd10_code" => "[DIAGNOSIS]".to_string(),
            "medication_dosage" => "[MEDICATION]".to_string(),
            "lab_value" => "[LAB-RESULT]".to_string(),
            "insurance_id" | "mrn" | "npi" | "dea" => maskers::mask_digits_keep_last(value, 2),
            _ => "[REDACTED]".to_string(),
        }
    }
}

impl Default for HealthClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for HealthClassifier {
    fn category(&self) -> DetectionCategory {
        DetectionCategory::Health
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

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> ScanResult {
        HealthClassifier::new().scan(text, Direction::Input)
    }

    #[test]
    fn test_labeled_diagnosis_wins_over_bare_code() {
        let result = scan("patient diagnosed with E11.9 today");
        assert_eq!(result.match_count(), 1);
        let m = &result.matches[0];
        assert_eq!(m.detection_type, "diagnosis_label");
        assert_eq!(m.raw_value, "E11.9");
        assert_eq!(m.masked_value, "[DIAGNOSIS]");
        assert_eq!(m.severity, SeverityLevel::High);
    }

    #[test]
    fn test_bare_icd_code_confidence_tiers() {
        let clinical = scan("patient record shows E11.9 unchanged");
        assert_eq!(clinical.matches[0].detection_type, "icd10_code");
        assert!(clinical.matches[0].confidence >= 0.9);

        let bare = scan("section E11.9 of the manual");
        assert!((bare.matches[0].confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_undotted_code_needs_label() {
        let labeled = scan("diagnosis: E11");
        assert_eq!(labeled.match_count(), 1);
        assert_eq!(labeled.matches[0].detection_type, "diagnosis_label");

        let bare = scan("bus E11 to downtown");
        assert!(!bare.has_detections);
    }

    #[test]
    fn test_medication_dosage() {
        let result = scan("takes Metformin 500mg and Lisinopril 10 mg daily");
        assert_eq!(result.match_count(), 2);
        assert!(result.matches.iter().all(|m| m.detection_type == "medication_dosage"));
        assert!(result.matches.iter().all(|m| m.masked_value == "[MEDICATION]"));
    }

    #[test]
    fn test_lab_value_masks_number_only() {
        let text = "fasting glucose: 142 this morning";
        let result = scan(text);
        assert_eq!(result.match_count(), 1);
        let m = &result.matches[0];
        assert_eq!(m.detection_type, "lab_value");
        assert_eq!(m.raw_value, "142");
        assert_eq!(&text[m.start_index..m.end_index], "142");
        assert_eq!(m.masked_value, "[LAB-RESULT]");
    }

    #[test]
    fn test_insurance_and_mrn() {
        let result = scan("member id: ABC123456789 MRN: 00482913");
        let insurance = result
            .matches
            .iter()
            .find(|m| m.detection_type == "insurance_id")
            .unwrap();
        assert_eq!(insurance.raw_value, "ABC123456789");
        assert_eq!(insurance.masked_value, "ABC*******89");

        let mrn = result.matches.iter().find(|m| m.detection_type == "mrn").unwrap();
        assert_eq!(mrn.raw_value, "00482913");
        assert_eq!(mrn.masked_value, "******13");
    }

    #[test]
    fn test_npi_checksum_scoring() {
        let valid = scan("NPI: 1234567893 on the referral");
        assert!((valid.matches[0].confidence - 0.95).abs() < f64::EPSILON);

        let invalid = scan("NPI: 1234567890 on the referral");
        assert!((invalid.matches[0].confidence - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dea_check_digit_scoring() {
        let valid = scan("DEA AB1234563 prescriber");
        assert_eq!(valid.matches[0].detection_type, "dea");
        assert!((valid.matches[0].confidence - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quick_mask_then_rescan_is_clean() {
        let classifier = HealthClassifier::new();
        let masked = classifier.quick_mask("MRN: 00482913, diagnosed with E11.9");
        assert!(!masked.contains("00482913"));
        assert!(!masked.contains("E11.9"));
        let rescan = classifier.scan(&masked, Direction::Input);
        assert!(!rescan.has_detections, "rescan found {:?}", rescan.matches);
    }

    #[test]
    fn test_plain_text_is_clean() {
        let result = scan("schedule the quarterly review for next week");
        assert!(!result.has_detections);
    }
}
