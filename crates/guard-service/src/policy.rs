//! Severity-to-action resolution.
//!
//! Pure functions of `(mode, severity, flags)`. Every scan outcome maps
//! through [`resolve_action`], so the tables here are the single place
//! enforcement posture is decided.

use guard_common::{GuardAction, SeverityLevel};

use crate::config::GuardMode;

/// Maps the aggregated severity of a scan to the verdict action.
///
/// `severity` is `None` when no classifier reported a match; that is
/// always an allow. `block_on_critical` and `mask_on_high` only apply
/// in standard mode.
pub fn resolve_action(
    mode: GuardMode,
    severity: Option<SeverityLevel>,
    block_on_critical: bool,
    mask_on_high: bool,
) -> GuardAction {
    let Some(severity) = severity else {
        return GuardAction::Allow;
    };
    match mode {
        GuardMode::Strict => match severity {
            SeverityLevel::Critical | SeverityLevel::High => GuardAction::Block,
            SeverityLevel::Medium => GuardAction::Mask,
            SeverityLevel::Low | SeverityLevel::Info => GuardAction::Warn,
        },
        GuardMode::Standard => match severity {
            SeverityLevel::Critical => {
                if block_on_critical {
                    GuardAction::Block
                } else {
                    GuardAction::Mask
                }
            }
            SeverityLevel::High => {
                if mask_on_high {
                    GuardAction::Mask
                } else {
                    GuardAction::Log
                }
            }
            SeverityLevel::Medium => GuardAction::Mask,
            SeverityLevel::Low => GuardAction::Log,
            SeverityLevel::Info => GuardAction::Allow,
        },
        GuardMode::Permissive => match severity {
            SeverityLevel::Critical => GuardAction::Warn,
            SeverityLevel::High => GuardAction::Mask,
            SeverityLevel::Medium | SeverityLevel::Low | SeverityLevel::Info => GuardAction::Log,
        },
    }
}

/// Whether the verdict text must be rewritten by the masking engine.
///
/// Masking always rewrites. A warn verdict also rewrites when the
/// aggregated severity is high or above, so permissive mode scrubs
/// critical findings even though it never blocks.
pub fn should_rewrite(action: GuardAction, severity: Option<SeverityLevel>) -> bool {
    match action {
        GuardAction::Mask => true,
        GuardAction::Warn => severity.is_some_and(|s| s >= SeverityLevel::High),
        _ => false,
    }
}
