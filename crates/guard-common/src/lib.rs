//! Shared vocabulary for the data guardrail core
//!
//! This crate defines the types every other guardrail crate speaks in:
//! detection categories, severity ordering, scan directions, match and
//! result records, and the common error type. It carries no detection
//! logic of its own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{GuardError, GuardResult};
pub use types::{DetectedMatch, GuardrailVerdict, ScanContext, ScanResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Category of sensitive data a classifier is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionCategory {
    /// Contact and government identifiers, addresses, network addresses
    IdentityData,
    /// API keys, tokens, private keys, passwords
    Credentials,
    /// Payment cards, bank accounts, tax identifiers
    Financial,
    /// Diagnoses, medications, lab values, insurance identifiers
    Health,
}

impl DetectionCategory {
    /// All categories, in classifier registration order
    pub const ALL: [DetectionCategory; 4] = [
        DetectionCategory::IdentityData,
        DetectionCategory::Credentials,
        DetectionCategory::Financial,
        DetectionCategory::Health,
    ];

    /// Stable string form used in config records and audit rollups
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionCategory::IdentityData => "identity-data",
            DetectionCategory::Credentials => "credentials",
            DetectionCategory::Financial => "financial",
            DetectionCategory::Health => "health",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "identity-data" => Some(DetectionCategory::IdentityData),
            "credentials" => Some(DetectionCategory::Credentials),
            "financial" => Some(DetectionCategory::Financial),
            "health" => Some(DetectionCategory::Health),
            _ => None,
        }
    }
}

impl fmt::Display for DetectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered severity of a detection
///
/// Aggregation only ever keeps the maximum; a severity is never demoted
/// once observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SeverityLevel {
    /// Informational
    Info = 0,
    /// Low risk
    Low = 1,
    /// Medium risk
    Medium = 2,
    /// High risk
    High = 3,
    /// Critical risk
    Critical = 4,
}

impl SeverityLevel {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Info => "info",
            SeverityLevel::Low => "low",
            SeverityLevel::Medium => "medium",
            SeverityLevel::High => "high",
            SeverityLevel::Critical => "critical",
        }
    }
}

impl Default for SeverityLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way the scanned text is flowing through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// User to model (prompts, request payloads)
    Input,
    /// Model to user (completions, response payloads)
    Output,
}

impl Direction {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final disposition of one scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardAction {
    /// Pass through untouched
    Allow,
    /// Pass through, record the detections
    Log,
    /// Pass through with a caller-visible warning
    Warn,
    /// Rewrite matched spans before passing through
    Mask,
    /// Reject the payload
    Block,
}

impl GuardAction {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardAction::Allow => "allow",
            GuardAction::Log => "log",
            GuardAction::Warn => "warn",
            GuardAction::Mask => "mask",
            GuardAction::Block => "block",
        }
    }
}

impl fmt::Display for GuardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic nanosecond timestamp for sub-microsecond timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get current timestamp (nanoseconds since epoch)
    #[inline(always)]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self(nanos)
    }

    /// Get nanoseconds value
    #[inline(always)]
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Duration since this timestamp in microseconds
    #[inline(always)]
    pub fn elapsed_micros(&self) -> u64 {
        (Self::now().0.saturating_sub(self.0)) / 1000
    }

    /// Duration since this timestamp in fractional milliseconds
    #[inline(always)]
    pub fn elapsed_millis(&self) -> f64 {
        self.elapsed_micros() as f64 / 1000.0
    }
}

/// High-performance counter for lock-free statistics
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Add value and return previous
    #[inline(always)]
    pub fn add(&self, val: u64) -> u64 {
        self.0.fetch_add(val, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
