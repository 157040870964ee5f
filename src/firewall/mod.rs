//! Content firewall
//!
//! Every piece of agent-produced content passes through an ordered,
//! direction-aware rule table before it reaches the rest of the system.
//!
//! # Overview
//!
//! - **Rules**: a compiled pattern, an action (block/pass), a direction and an
//!   optional tag
//! - **Engine**: first-match-wins evaluation with an oversize guard and a
//!   default-deny fallback
//! - **Sanitizer**: extracts the payload from an agent result, evaluates it, and
//!   redacts fenced system blocks from content that passes
//! - **Policy**: the shipped rule table
//!
//! # Example
//!
//! ```ignore
//! use swarmgate::firewall::{Firewall, Direction};
//!
//! let firewall = Firewall::with_defaults();
//! let verdict = firewall.evaluate("please sudo apt", Direction::In);
//! assert!(verdict.is_blocked());
//! ```

mod engine;
mod policy;
mod rule;
mod sanitizer;

pub use engine::{evaluate, evaluate_with_limit, Outcome, Verdict, MAX_OUTPUT_SIZE, NO_RULE_MATCHED};
pub use policy::{catch_all, default_rules, NEEDS_REVIEW};
pub use rule::{Direction, Rule, RuleAction, RuleSpec};
pub use sanitizer::{
    redact_system_blocks, sanitize, sanitize_with_limit, CleanedOutput, REDACTION_MARKER,
};

use crate::config::FirewallConfig;
use crate::swarm::AgentResult;
use std::sync::Arc;

/// A rule table bundled with its size limit
///
/// Cheap to clone and safe to share across agent threads; the rules are
/// immutable once built.
#[derive(Debug, Clone)]
pub struct Firewall {
    rules: Arc<[Rule]>,
    max_output_size: usize,
}

impl Firewall {
    /// Create a firewall from an explicit rule list
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: rules.into(),
            max_output_size: MAX_OUTPUT_SIZE,
        }
    }

    /// Create a firewall with the shipped policy
    pub fn with_defaults() -> Self {
        Self::new(default_rules().to_vec())
    }

    /// Build the firewall described by a configuration section
    ///
    /// Configured rules come first; the shipped policy follows them unless
    /// `use_default_policy` is off.
    pub fn from_config(config: &FirewallConfig) -> crate::Result<Self> {
        let mut rules = config
            .rules
            .iter()
            .cloned()
            .map(Rule::try_from)
            .collect::<crate::Result<Vec<_>>>()?;

        if config.use_default_policy {
            rules.extend(default_rules().iter().cloned());
        }

        if rules.is_empty() {
            return Err(crate::SwarmGateError::Config(
                "Firewall has no rules; enable the default policy or configure rules".to_string(),
            ));
        }

        tracing::debug!(
            rules = rules.len(),
            max_output_size = config.max_output_size,
            "Firewall built"
        );

        Ok(Self::new(rules).with_max_output_size(config.max_output_size))
    }

    /// Override the oversize guard
    pub fn with_max_output_size(mut self, max_output_size: usize) -> Self {
        self.max_output_size = max_output_size;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn max_output_size(&self) -> usize {
        self.max_output_size
    }

    /// Evaluate a text
    pub fn evaluate(&self, text: &str, direction: Direction) -> Verdict {
        evaluate_with_limit(text, &self.rules, direction, self.max_output_size)
    }

    /// Sanitize an agent result
    pub fn sanitize(&self, result: &AgentResult, direction: Direction) -> crate::Result<CleanedOutput> {
        sanitize_with_limit(result, &self.rules, direction, self.max_output_size)
    }
}

impl Default for Firewall {
    fn default() -> Self {
        Self::with_defaults()
    }
}
