//! Shipped firewall policy
//!
//! Order matters: specific block rules come first, the review tag next, and the
//! catch-all pass last. Only the first matching rule is honored.

use super::rule::{Direction, Rule};
use lazy_static::lazy_static;

/// Tag attached to content that should be routed to manual review
pub const NEEDS_REVIEW: &str = "needs_review";

// (name, direction, pattern)
const PROMPT_INJECTION: &[(&str, Direction, &str)] = &[
    (
        "injection-ignore-instructions",
        Direction::Any,
        r"(?i)\b(ignore|disregard|forget)\s+(all\s+)?(the\s+)?(previous|prior|above|earlier)\s+(instructions|prompts?|rules)",
    ),
    (
        "injection-system-prompt",
        Direction::Any,
        r"(?i)\b(reveal|print|show|repeat|leak)\s+(me\s+)?(your|the)\s+(system|hidden|initial)\s+prompt",
    ),
    (
        "injection-role-override",
        Direction::Any,
        r"(?i)\byou\s+are\s+now\s+(in\s+)?(developer|dan|jailbreak|god)\s+mode",
    ),
    (
        "injection-fake-system-turn",
        Direction::Any,
        r"(?im)^\s*(<\|im_start\|>\s*system|\[system\]|###\s*system\s*:)",
    ),
];

const PRIVILEGE_ESCALATION: &[(&str, Direction, &str)] = &[
    ("privesc-sudo", Direction::In, r"(?i)\bsudo\s+\S"),
    ("privesc-su-root", Direction::In, r"(?i)\bsu\s+(-\s*|-l\s+)?root\b|\bsu\s+-\s*$"),
    (
        "privesc-setuid",
        Direction::In,
        r"(?i)\bchmod\s+([ugo]*\+s|[0-7]?[4-7][0-7]{3})\b",
    ),
    ("privesc-chown-root", Direction::In, r"(?i)\bchown\s+(-R\s+)?root\b"),
    (
        "privesc-sudoers",
        Direction::In,
        r"(?i)/etc/(sudoers|shadow|passwd)\b",
    ),
];

const DESTRUCTIVE_OPERATIONS: &[(&str, Direction, &str)] = &[
    (
        "destructive-rm-root",
        Direction::In,
        r"(?i)\brm\s+(-[a-z]*r[a-z]*f[a-z]*|-[a-z]*f[a-z]*r[a-z]*|-r\s+-f|-f\s+-r)\s+(/|~|\*|/\*)(\s|$)",
    ),
    ("destructive-mkfs", Direction::In, r"(?i)\bmkfs(\.[a-z0-9]+)?\s"),
    ("destructive-dd-device", Direction::In, r"(?i)\bdd\s+.*\bof=/dev/"),
    ("destructive-fork-bomb", Direction::In, r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:"),
    (
        "destructive-sql-drop",
        Direction::In,
        r"(?i)\bdrop\s+(table|database|schema)\b",
    ),
    (
        "destructive-git-force",
        Direction::In,
        r"(?i)\bgit\s+push\s+(.*\s)?(--force|-f)\b",
    ),
];

const REVIEW_PATTERN: &str = r"(?i)\b(needs?\s+review|review\s+required|unverified|TODO|FIXME)\b";

lazy_static! {
    static ref DEFAULT_RULES: Vec<Rule> =
        build_default_rules().expect("Default policy patterns must compile");
}

/// The shipped rule table
pub fn default_rules() -> &'static [Rule] {
    &DEFAULT_RULES
}

/// Catch-all rule that passes anything
pub fn catch_all() -> crate::Result<Rule> {
    Rule::pass("catch-all", Direction::Any, ".*")
}

fn build_default_rules() -> crate::Result<Vec<Rule>> {
    let mut rules = Vec::new();

    for table in [PROMPT_INJECTION, PRIVILEGE_ESCALATION, DESTRUCTIVE_OPERATIONS] {
        for (name, direction, pattern) in table {
            rules.push(Rule::block(*name, *direction, pattern)?.with_quick(true));
        }
    }

    rules.push(Rule::pass("review-flagged", Direction::Any, REVIEW_PATTERN)?.with_tag(NEEDS_REVIEW));
    rules.push(catch_all()?);

    Ok(rules)
}
