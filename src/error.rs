//! Error types for SwarmGate
//!
//! Defines a single error enum covering firewall, swarm, and configuration failures.
//! Uses thiserror for ergonomic error handling.

use crate::swarm::{AgentFailure, AgentStatus};
use thiserror::Error;

/// Result type alias for SwarmGate operations
pub type Result<T> = std::result::Result<T, SwarmGateError>;

/// Comprehensive error type for SwarmGate operations
#[derive(Error, Debug)]
pub enum SwarmGateError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A rule pattern failed to compile
    #[error("Invalid rule pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Content rejected by the firewall
    #[error("Content blocked: {reason}")]
    Blocked { reason: String },

    /// The agent result was already a failure before it reached the firewall
    #[error("Agent failed: {0}")]
    Upstream(AgentFailure),

    /// Budget fraction outside of (0, 1]
    #[error("Invalid budget fraction {0}: must be in (0, 1]")]
    InvalidFraction(f64),

    /// Illegal agent status change
    #[error("Agent '{agent_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        agent_id: String,
        from: AgentStatus,
        to: AgentStatus,
    },

    /// Agent lookup failed
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Swarm/scheduler errors
    #[error("Swarm error: {0}")]
    Swarm(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SwarmGateError {
    /// True when the error is a content policy rejection rather than a fault
    pub fn is_policy_block(&self) -> bool {
        matches!(self, SwarmGateError::Blocked { .. })
    }
}
