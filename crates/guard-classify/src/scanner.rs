//! Shared scan driver used by every classifier.

use arc_swap::ArcSwap;
use std::sync::Arc;

use guard_common::{DetectedMatch, DetectionCategory, Direction, ScanResult, Timestamp};

use crate::pattern::{PatternTable, RawHit};
use crate::ClassifierOptions;

/// Drives a pattern table through the common scan steps: hit
/// collection, overlap resolution, option filters, scoring and
/// masking. Classifiers supply the scoring and masking closures so
/// category-specific logic stays in their own modules.
pub struct PatternScanner {
    category: DetectionCategory,
    table: PatternTable,
    options: ArcSwap<ClassifierOptions>,
}

impl PatternScanner {
    /// Wrap a compiled table with default options.
    pub fn new(category: DetectionCategory, table: PatternTable) -> Self {
        Self {
            category,
            table,
            options: ArcSwap::from_pointee(ClassifierOptions::default()),
        }
    }

    /// Category the owning classifier reports under.
    pub fn category(&self) -> DetectionCategory {
        self.category
    }

    /// Swap in new options. Scans already running keep their snapshot.
    pub fn configure(&self, options: ClassifierOptions) {
        self.options.store(Arc::new(options));
    }

    /// Current options snapshot.
    pub fn options(&self) -> Arc<ClassifierOptions> {
        self.options.load_full()
    }

    /// Whether scans run for `direction` under current options.
    pub fn is_enabled(&self, direction: Direction) -> bool {
        self.options.load().scans(direction)
    }

    /// Full scan: collect, dedupe, filter, score and mask every hit.
    ///
    /// `confidence` maps a raw hit to a final score; `mask` renders the
    /// masked form of a value. Hits under the configured minimum
    /// confidence are dropped after scoring.
    pub fn scan<F, M>(&self, text: &str, direction: Direction, confidence: F, mask: M) -> ScanResult
    where
        F: Fn(&RawHit<'_>, &str) -> f64,
        M: Fn(&str, &str) -> String,
    {
        let started = Timestamp::now();
        let options = self.options.load();
        if !options.scans(direction) {
            return ScanResult::empty(self.category);
        }

        let mut hits = self.table.find_all(text);
        resolve_overlaps(&mut hits);

        let mut matches = Vec::with_capacity(hits.len());
        for hit in &hits {
            if is_filtered(&options, hit) || is_mask_artifact(text, hit.start, hit.end) {
                continue;
            }
            let score = confidence(hit, text).clamp(0.0, 1.0);
            if score < options.min_confidence {
                continue;
            }
            matches.push(DetectedMatch {
                detection_type: hit.name.to_string(),
                category: self.category,
                raw_value: hit.value.to_string(),
                masked_value: mask(hit.value, hit.name),
                start_index: hit.start,
                end_index: hit.end,
                severity: hit.severity,
                confidence: score,
            });
        }

        let result =
            ScanResult::from_matches(self.category, matches, text.len(), started.elapsed_millis());
        if result.has_detections {
            tracing::debug!(
                category = %self.category,
                matches = result.match_count(),
                throughput_mbps = result.throughput_mbps(),
                "classifier found sensitive content"
            );
        }
        result
    }

    /// Mask every hit in place without scoring. Exclusions and
    /// whitelists still apply; confidence filtering does not, so
    /// low-score hits are scrubbed too.
    pub fn quick_mask<M>(&self, text: &str, mask: M) -> String
    where
        M: Fn(&str, &str) -> String,
    {
        let options = self.options.load();
        let mut hits = self.table.find_all(text);
        resolve_overlaps(&mut hits);

        // Splice from the back so earlier offsets stay valid.
        let mut masked = text.to_string();
        for hit in hits.iter().rev() {
            if is_filtered(&options, hit) || is_mask_artifact(text, hit.start, hit.end) {
                continue;
            }
            masked.replace_range(hit.start..hit.end, &mask(hit.value, hit.name));
        }
        masked
    }
}

fn is_filtered(options: &ClassifierOptions, hit: &RawHit<'_>) -> bool {
    options.excluded_types.iter().any(|t| t == hit.name)
        || options.whitelist.iter().any(|w| w == hit.value)
}

/// Collapse overlapping hits from different patterns. The earliest
/// start wins; at equal start the higher severity, then the longer
/// match. Survivors come out sorted by start and non-overlapping.
fn resolve_overlaps(hits: &mut Vec<RawHit<'_>>) {
    if hits.len() <= 1 {
        return;
    }
    hits.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.severity.cmp(&a.severity))
            .then_with(|| b.end.cmp(&a.end))
    });
    let mut kept_end = 0usize;
    hits.retain(|hit| {
        if hit.start >= kept_end {
            kept_end = hit.end;
            true
        } else {
            false
        }
    });
}

/// True when the candidate span is the residue of a previous masking
/// pass. Re-scanning already-masked text must come back clean, so
/// spans containing mask characters or sitting inside placeholder
/// brackets are never reported again.
fn is_mask_artifact(text: &str, start: usize, end: usize) -> bool {
    let value = &text[start..end];
    if value.contains('*') || value.contains('#') {
        return true;
    }
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    matches!(before, Some('[')) && matches!(after, Some(']'))
}
