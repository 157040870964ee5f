//! Rule evaluation - first-match-wins, default-deny.

use super::rule::{Direction, Rule, RuleAction};
use serde::Serialize;
use tracing::{debug, trace};

/// Largest text, in characters, the engine will evaluate
pub const MAX_OUTPUT_SIZE: usize = 100_000;

/// Reason attached to the default-deny verdict
pub const NO_RULE_MATCHED: &str = "no rule matched";

/// Block or pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Block,
    Pass,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Pass => "pass",
        }
    }
}

/// Decision produced by evaluating one text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub outcome: Outcome,
    /// Present iff the outcome is block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<Rule>,
}

impl Verdict {
    /// Create a blocking verdict
    pub fn block(reason: impl Into<String>, matched_rule: Option<Rule>) -> Self {
        Self {
            outcome: Outcome::Block,
            reason: Some(reason.into()),
            tag: None,
            matched_rule,
        }
    }

    /// Create a passing verdict
    pub fn pass(tag: Option<String>, matched_rule: Option<Rule>) -> Self {
        Self {
            outcome: Outcome::Pass,
            reason: None,
            tag,
            matched_rule,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.outcome == Outcome::Block
    }

    pub fn is_passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }
}

/// Evaluate `text` against `rules` for traffic in `direction`
///
/// Texts longer than [`MAX_OUTPUT_SIZE`] characters are blocked before any
/// pattern runs. Otherwise the first eligible rule whose pattern matches decides
/// the verdict. If nothing matches the text is blocked.
pub fn evaluate(text: &str, rules: &[Rule], direction: Direction) -> Verdict {
    evaluate_with_limit(text, rules, direction, MAX_OUTPUT_SIZE)
}

/// Same as [`evaluate`] with an explicit size limit
pub fn evaluate_with_limit(
    text: &str,
    rules: &[Rule],
    direction: Direction,
    max_size: usize,
) -> Verdict {
    let verdict = decide(text, rules, direction, max_size);
    crate::metrics::record_verdict(verdict.outcome.as_str(), direction.as_str());
    verdict
}

fn decide(text: &str, rules: &[Rule], direction: Direction, max_size: usize) -> Verdict {
    // Byte length bounds char count from above, so only count chars when needed
    if text.len() > max_size {
        let size = text.chars().count();
        if size > max_size {
            debug!(size, limit = max_size, %direction, "Oversize text blocked");
            return Verdict::block(
                format!(
                    "output size {} exceeds maximum of {} characters",
                    size, max_size
                ),
                None,
            );
        }
    }

    for rule in rules {
        if !rule.applies_to(direction) {
            trace!(rule = rule.name(), %direction, "Rule skipped for direction");
            continue;
        }
        if !rule.matches(text) {
            continue;
        }

        debug!(
            rule = rule.name(),
            action = %rule.action(),
            %direction,
            "Rule matched"
        );

        return match rule.action() {
            RuleAction::Block => Verdict::block(rule.block_reason(), Some(rule.clone())),
            RuleAction::Pass => Verdict::pass(rule.tag().map(String::from), Some(rule.clone())),
        };
    }

    Verdict::block(NO_RULE_MATCHED, None)
}
