//! Rule definition
//!
//! A rule pairs a compiled pattern with an action and the traffic direction it
//! applies to. Rules are built once and never mutated.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a matching rule does to the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Reject the content
    Block,
    /// Let the content through
    Pass,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Pass => write!(f, "pass"),
        }
    }
}

/// Direction of content flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Content flowing into the system (user or agent input)
    In,
    /// Content flowing out of the system (agent responses)
    #[default]
    Out,
    /// Either direction
    Any,
}

impl Direction {
    /// Check whether a rule restricted to `self` is eligible for an evaluation in `call`
    ///
    /// An evaluation in `Any` direction considers every rule.
    pub fn covers(&self, call: Direction) -> bool {
        matches!(self, Self::Any) || matches!(call, Self::Any) || *self == call
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = crate::SwarmGateError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            "any" => Ok(Self::Any),
            other => Err(crate::SwarmGateError::Config(format!(
                "Unknown direction '{}', expected in, out or any",
                other
            ))),
        }
    }
}

/// Serializable form of a rule, as written in policy files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub action: RuleAction,
    #[serde(default = "default_rule_direction")]
    pub direction: Direction,
    pub pattern: String,
    #[serde(default)]
    pub quick: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

fn default_rule_direction() -> Direction {
    Direction::Any
}

/// A compiled firewall rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RuleSpec", into = "RuleSpec")]
pub struct Rule {
    name: String,
    action: RuleAction,
    direction: Direction,
    pattern: Regex,
    quick: bool,
    tag: Option<String>,
}

impl Rule {
    /// Compile a rule
    pub fn new(
        name: impl Into<String>,
        action: RuleAction,
        direction: Direction,
        pattern: &str,
    ) -> crate::Result<Self> {
        Ok(Self {
            name: name.into(),
            action,
            direction,
            pattern: Regex::new(pattern)?,
            quick: false,
            tag: None,
        })
    }

    /// Shorthand for a blocking rule
    pub fn block(name: impl Into<String>, direction: Direction, pattern: &str) -> crate::Result<Self> {
        Self::new(name, RuleAction::Block, direction, pattern)
    }

    /// Shorthand for a passing rule
    pub fn pass(name: impl Into<String>, direction: Direction, pattern: &str) -> crate::Result<Self> {
        Self::new(name, RuleAction::Pass, direction, pattern)
    }

    /// Set the advisory quick flag
    pub fn with_quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    /// Attach a tag carried by passing verdicts
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> RuleAction {
        self.action
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Advisory only; evaluation already stops at the first match
    pub fn is_quick(&self) -> bool {
        self.quick
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Check if the rule is eligible for an evaluation in the given direction
    pub fn applies_to(&self, direction: Direction) -> bool {
        self.direction.covers(direction)
    }

    /// Check if the pattern matches anywhere in the text
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Human-readable reason used when this rule blocks content
    pub fn block_reason(&self) -> String {
        format!(
            "blocked by rule '{}' ({}, pattern /{}/)",
            self.name,
            self.direction,
            self.pattern.as_str()
        )
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.action == other.action
            && self.direction == other.direction
            && self.pattern.as_str() == other.pattern.as_str()
            && self.quick == other.quick
            && self.tag == other.tag
    }
}

impl TryFrom<RuleSpec> for Rule {
    type Error = crate::SwarmGateError;

    fn try_from(spec: RuleSpec) -> crate::Result<Self> {
        let mut rule = Rule::new(spec.name, spec.action, spec.direction, &spec.pattern)?
            .with_quick(spec.quick);
        rule.tag = spec.tag;
        Ok(rule)
    }
}

impl From<Rule> for RuleSpec {
    fn from(rule: Rule) -> Self {
        RuleSpec {
            pattern: rule.pattern.as_str().to_string(),
            name: rule.name,
            action: rule.action,
            direction: rule.direction,
            quick: rule.quick,
            tag: rule.tag,
        }
    }
}
