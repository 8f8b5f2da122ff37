//! Pipeline payload adapter.
//!
//! Bridges JSON request and response bodies to the text-oriented
//! guardrail service. String leaves are gathered into one scan text,
//! the verdict is resolved once, and on a masking outcome the payload
//! is rewritten leaf by leaf so its structure survives untouched.
//! Binary carrier fields (file uploads, base64 blobs) are left alone.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use guard_common::{Direction, GuardAction, GuardrailVerdict, ScanContext};

use crate::service::GuardrailService;

/// Nesting depth past which payload values are ignored.
const MAX_WALK_DEPTH: usize = 16;

/// Cap on warnings surfaced in a rejection body.
const MAX_SURFACE_WARNINGS: usize = 5;

/// String leaves at least this long with no early whitespace are
/// treated as opaque data, not prose.
const OPAQUE_MIN_LEN: usize = 1024;

/// Object keys whose string values carry encoded binary payloads.
const OPAQUE_KEYS: &[&str] = &[
    "attachment",
    "audio",
    "b64_json",
    "base64",
    "blob",
    "buffer",
    "bytes",
    "content_base64",
    "file",
    "file_data",
    "image",
    "image_data",
];

/// What the host should do with an intercepted payload.
#[derive(Debug, Clone)]
pub enum InterceptOutcome {
    /// Forward the payload unchanged.
    Passed {
        verdict: GuardrailVerdict,
    },
    /// Forward the rewritten payload instead of the original.
    Masked {
        payload: Value,
        verdict: GuardrailVerdict,
    },
    /// Reject the payload; `rejection` is the client-facing body.
    Blocked {
        rejection: BlockedResponse,
        verdict: GuardrailVerdict,
    },
}

impl InterceptOutcome {
    /// The verdict behind this outcome.
    pub fn verdict(&self) -> &GuardrailVerdict {
        match self {
            InterceptOutcome::Passed { verdict }
            | InterceptOutcome::Masked { verdict, .. }
            | InterceptOutcome::Blocked { verdict, .. } => verdict,
        }
    }

    /// True when the payload was rejected.
    pub fn is_blocked(&self) -> bool {
        matches!(self, InterceptOutcome::Blocked { .. })
    }
}

/// Client-facing rejection body, the bad-request equivalent for the
/// host protocol. Warnings are bounded and never carry raw values.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedResponse {
    /// Stable, detail-free rejection message.
    pub error: String,
    /// Correlation identifier for support lookups.
    pub request_id: String,
    /// First few verdict warnings plus a count of the rest.
    pub warnings: Vec<String>,
}

/// Guards structured payloads on both directions of a pipeline.
pub struct PipelineAdapter {
    service: Arc<GuardrailService>,
}

impl PipelineAdapter {
    /// Adapter over a shared service handle.
    pub fn new(service: Arc<GuardrailService>) -> Self {
        Self { service }
    }

    /// The wrapped service.
    pub fn service(&self) -> &Arc<GuardrailService> {
        &self.service
    }

    /// Guard a request body on its way to the model.
    pub async fn intercept_request(
        &self,
        payload: &Value,
        context: &ScanContext,
    ) -> InterceptOutcome {
        self.intercept(payload, Direction::Input, context).await
    }

    /// Guard a response body on its way back to the client.
    pub async fn intercept_response(
        &self,
        payload: &Value,
        context: &ScanContext,
    ) -> InterceptOutcome {
        self.intercept(payload, Direction::Output, context).await
    }

    async fn intercept(
        &self,
        payload: &Value,
        direction: Direction,
        context: &ScanContext,
    ) -> InterceptOutcome {
        let context = ensure_request_id(context);
        let text = extract_text(payload);
        if text.is_empty() {
            return InterceptOutcome::Passed {
                verdict: GuardrailVerdict::allow(""),
            };
        }

        let verdict = self.service.process_text(&text, direction, &context).await;
        match verdict.action {
            GuardAction::Block => {
                tracing::info!(
                    request_id = %context.request_id,
                    %direction,
                    "payload rejected by guardrail policy"
                );
                let rejection = BlockedResponse {
                    error: "payload rejected: sensitive data detected".to_string(),
                    request_id: context.request_id.clone(),
                    warnings: bounded_warnings(&verdict.warnings),
                };
                InterceptOutcome::Blocked { rejection, verdict }
            }
            _ if verdict.processed_text != text => {
                let mut rewritten = payload.clone();
                rewrite_strings(&self.service, &mut rewritten, 0);
                InterceptOutcome::Masked {
                    payload: rewritten,
                    verdict,
                }
            }
            _ => InterceptOutcome::Passed { verdict },
        }
    }
}

/// Joins every scannable string leaf of `payload` with newlines.
pub fn extract_text(payload: &Value) -> String {
    let mut parts = Vec::new();
    collect_strings(payload, 0, &mut parts);
    parts.join("\n")
}

fn collect_strings<'v>(value: &'v Value, depth: usize, out: &mut Vec<&'v str>) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    match value {
        Value::String(s) => {
            if !looks_opaque(s) {
                out.push(s);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_strings(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                if is_opaque_key(key) && item.is_string() {
                    continue;
                }
                collect_strings(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// Scrubs every scannable string leaf in place with the quick mask.
/// Quick masking skips confidence filtering, so each leaf comes back
/// at least as scrubbed as the joined scan text was.
fn rewrite_strings(service: &GuardrailService, value: &mut Value, depth: usize) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    match value {
        Value::String(s) => {
            if !looks_opaque(s) {
                let masked = service.quick_mask(s);
                if masked != *s {
                    *s = masked;
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_strings(service, item, depth + 1);
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if is_opaque_key(key) && item.is_string() {
                    continue;
                }
                rewrite_strings(service, item, depth + 1);
            }
        }
        _ => {}
    }
}

fn is_opaque_key(key: &str) -> bool {
    OPAQUE_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k))
}

fn looks_opaque(s: &str) -> bool {
    if s.len() < OPAQUE_MIN_LEN {
        return false;
    }
    let head = &s.as_bytes()[..256];
    memchr::memchr2(b' ', b'\n', head).is_none()
}

fn bounded_warnings(warnings: &[String]) -> Vec<String> {
    if warnings.len() <= MAX_SURFACE_WARNINGS {
        return warnings.to_vec();
    }
    let mut bounded: Vec<String> = warnings[..MAX_SURFACE_WARNINGS].to_vec();
    bounded.push(format!("and {} more", warnings.len() - MAX_SURFACE_WARNINGS));
    bounded
}

fn ensure_request_id(context: &ScanContext) -> ScanContext {
    let mut context = context.clone();
    if context.request_id.is_empty() {
        context.request_id = Uuid::new_v4().to_string();
    }
    context
}
