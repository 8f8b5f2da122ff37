//! Append-only audit trail for guardrail decisions.
//!
//! Every detection that reaches a verdict produces one [`AuditEntry`]
//! carrying the masked value only; raw matches never leave the scan
//! path. The in-memory store is the default backend and the
//! [`AuditRecorder`] trait is the seam for durable ones.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod recorder;
pub mod stats;

pub use entry::AuditEntry;
pub use recorder::{AuditQuery, AuditRecorder, MemoryAuditStore};
pub use stats::{GuardStatistics, StatsAccumulator};
