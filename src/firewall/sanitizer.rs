//! Output sanitizer
//!
//! Gates an agent result through the rule engine and redacts fenced system
//! blocks from content that passes.

use super::engine::evaluate_with_limit;
use super::rule::{Direction, Rule};
use crate::swarm::{AgentOutput, AgentResult};
use crate::{Result, SwarmGateError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Replacement for a redacted system block
pub const REDACTION_MARKER: &str = "[REDACTED: system block]";

lazy_static! {
    // Lazy body so two system blocks never merge into one match
    static ref SYSTEM_BLOCK: Regex =
        Regex::new(r"(?s)```[ \t]*system\b.*?```").expect("System block pattern must compile");
}

/// Agent output that passed the firewall
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedOutput {
    /// The fields of the original result, untouched
    pub original: AgentOutput,
    /// Payload text with system blocks redacted
    pub text: String,
    pub sanitized: bool,
    /// Tag from the passing verdict, for downstream routing
    pub tag: Option<String>,
}

impl CleanedOutput {
    pub fn needs_review(&self) -> bool {
        self.tag.as_deref() == Some(super::policy::NEEDS_REVIEW)
    }
}

/// Run an agent result through the firewall
///
/// Failed results are returned as [`SwarmGateError::Upstream`] without being
/// evaluated. Blocked content becomes [`SwarmGateError::Blocked`] carrying the
/// verdict's reason.
pub fn sanitize(result: &AgentResult, rules: &[Rule], direction: Direction) -> Result<CleanedOutput> {
    sanitize_with_limit(result, rules, direction, super::engine::MAX_OUTPUT_SIZE)
}

/// Same as [`sanitize`] with an explicit size limit
pub fn sanitize_with_limit(
    result: &AgentResult,
    rules: &[Rule],
    direction: Direction,
    max_size: usize,
) -> Result<CleanedOutput> {
    let output = match result {
        Ok(output) => output,
        Err(failure) => return Err(SwarmGateError::Upstream(failure.clone())),
    };

    let payload = output.payload();
    let verdict = evaluate_with_limit(payload, rules, direction, max_size);

    if verdict.is_blocked() {
        let reason = verdict
            .reason
            .unwrap_or_else(|| super::engine::NO_RULE_MATCHED.to_string());
        warn!(%direction, %reason, "Agent output blocked");
        return Err(SwarmGateError::Blocked { reason });
    }

    Ok(CleanedOutput {
        original: output.clone(),
        text: redact_system_blocks(payload).into_owned(),
        sanitized: true,
        tag: verdict.tag,
    })
}

/// Replace every fenced `system` block with [`REDACTION_MARKER`]
///
/// Idempotent: the marker never matches the block pattern.
pub fn redact_system_blocks(text: &str) -> Cow<'_, str> {
    let count = SYSTEM_BLOCK.find_iter(text).count();
    if count == 0 {
        return Cow::Borrowed(text);
    }

    debug!(count, "Redacting system blocks");
    crate::metrics::record_redactions(count);
    SYSTEM_BLOCK.replace_all(text, REDACTION_MARKER)
}
