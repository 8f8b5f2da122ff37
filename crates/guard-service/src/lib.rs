//! Bidirectional guardrails for sensitive data in model pipelines.
//!
//! The service sits between a pipeline host and the model, scanning
//! request text on the way in and response text on the way out. Four
//! classifiers run concurrently per scan under a hard deadline; their
//! findings aggregate into one [`GuardrailVerdict`] whose action comes
//! from the mode tables in [`policy`]. Masking rewrites matched spans,
//! blocking rejects the payload, and every surviving match lands in
//! the audit trail as a masked record.
//!
//! [`PipelineAdapter`] adapts structured JSON payloads onto the text
//! interface; [`GuardrailService`] is the text interface itself.
//!
//! ```no_run
//! use guard_common::ScanContext;
//! use guard_service::{GuardConfig, GuardrailService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = GuardrailService::new(GuardConfig::default())?;
//! let context = ScanContext::new("req-1").with_user("alice");
//! let verdict = service
//!     .validate_input("my card is 4532015112830366", &context)
//!     .await;
//! assert!(verdict.blocked());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod config;
pub mod policy;
pub mod service;

pub use adapter::{BlockedResponse, InterceptOutcome, PipelineAdapter};
pub use config::{ConfigRecord, ConfigStore, GuardConfig, GuardMode};
pub use policy::{resolve_action, should_rewrite};
pub use service::{GuardrailService, ServiceStats, ServiceStatsSnapshot};

pub use guard_common::{
    Direction, GuardAction, GuardError, GuardResult, GuardrailVerdict, ScanContext, SeverityLevel,
};
