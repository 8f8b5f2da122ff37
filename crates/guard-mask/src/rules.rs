//! Lock-free masking rule table with hot-swapping

use crate::{MaskStyle, MaskingRule};
use arc_swap::ArcSwap;
use guard_common::{DetectionCategory, GuardError, GuardResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Immutable snapshot of the registered rules plus the default style
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<MaskingRule>,
    default_style: MaskStyle,
}

/// Outcome of rule resolution
#[derive(Debug)]
pub enum ResolvedRule<'a> {
    /// A registered rule won resolution
    Rule(&'a MaskingRule),
    /// No rule matched; the table's default style applies
    Default(MaskStyle),
}

impl RuleSet {
    /// Snapshot from explicit rules
    pub fn new(rules: Vec<MaskingRule>, default_style: MaskStyle) -> Self {
        Self { rules, default_style }
    }

    /// Resolve the rule for one detection
    ///
    /// Precedence: exact `(category, type)`, then `(category, "*")`, then a
    /// substring match against any registered rule's type, then the default
    /// style. Within one tier the first registered rule wins.
    pub fn resolve(&self, category: DetectionCategory, detection_type: &str) -> ResolvedRule<'_> {
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.category == category && r.match_type == detection_type)
        {
            return ResolvedRule::Rule(rule);
        }

        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.category == category && r.match_type == "*")
        {
            return ResolvedRule::Rule(rule);
        }

        if let Some(rule) = self.rules.iter().find(|r| {
            r.match_type != "*"
                && (detection_type.contains(r.match_type.as_str())
                    || r.match_type.contains(detection_type))
        }) {
            return ResolvedRule::Rule(rule);
        }

        ResolvedRule::Default(self.default_style)
    }

    /// Style applied when no rule matches
    pub fn default_style(&self) -> MaskStyle {
        self.default_style
    }

    /// Registered rules, in registration order
    pub fn rules(&self) -> &[MaskingRule] {
        &self.rules
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Lock-free rule table with atomic updates
///
/// Reads take a snapshot and never block; an update takes effect for mask
/// operations that start after it commits.
pub struct RuleTable {
    inner: ArcSwap<RuleSet>,
    version: AtomicU64,
}

impl RuleTable {
    /// Table pre-loaded with the built-in rule set
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(RuleSet::new(builtin_rules(), MaskStyle::Asterisk)),
            version: AtomicU64::new(1),
        }
    }

    /// Empty table with only a default style
    pub fn empty(default_style: MaskStyle) -> Self {
        Self {
            inner: ArcSwap::from_pointee(RuleSet::new(Vec::new(), default_style)),
            version: AtomicU64::new(0),
        }
    }

    /// Table with an explicit initial rule set
    pub fn with_rules(rules: Vec<MaskingRule>, default_style: MaskStyle) -> GuardResult<Self> {
        validate_rules(&rules)?;
        Ok(Self {
            inner: ArcSwap::from_pointee(RuleSet::new(rules, default_style)),
            version: AtomicU64::new(1),
        })
    }

    /// Current version, incremented once per committed update
    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Atomically replace the rule set
    pub fn update(&self, rules: Vec<MaskingRule>, default_style: MaskStyle) -> GuardResult<()> {
        validate_rules(&rules)?;
        let count = rules.len();
        self.inner.store(Arc::new(RuleSet::new(rules, default_style)));
        let version = self.version.fetch_add(1, Ordering::Release) + 1;
        tracing::info!(rules = count, version, "masking rules swapped");
        Ok(())
    }

    /// Snapshot of the current rule set
    #[inline]
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.inner.load_full()
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Check if no rules are registered
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_rules(rules: &[MaskingRule]) -> GuardResult<()> {
    for rule in rules {
        if rule.match_type.is_empty() {
            return Err(GuardError::MaskingRule(format!(
                "empty match type in {} rule",
                rule.category
            )));
        }
    }
    Ok(())
}

/// Built-in rule set covering the stock classifiers
pub fn builtin_rules() -> Vec<MaskingRule> {
    use DetectionCategory::*;
    vec![
        MaskingRule::partial(Financial, "credit_card", 0, 4),
        MaskingRule::partial(Financial, "iban", 2, 4),
        MaskingRule::wildcard(Financial, MaskStyle::Asterisk),
        MaskingRule::partial(Credentials, "openai_key", 3, 0),
        MaskingRule::wildcard(Credentials, MaskStyle::Redact),
        MaskingRule::new(IdentityData, "email", MaskStyle::Placeholder),
        MaskingRule::new(IdentityData, "ssn", MaskStyle::Redact).with_placeholder("***-**-****"),
        MaskingRule::partial(IdentityData, "phone_us", 3, 4),
        MaskingRule::partial(IdentityData, "phone_intl", 3, 4),
        MaskingRule::wildcard(IdentityData, MaskStyle::Asterisk),
        MaskingRule::wildcard(Health, MaskStyle::Redact),
    ]
}
