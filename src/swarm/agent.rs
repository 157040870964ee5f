//! Agent representation and lifecycle states
//!
//! An agent is a budget-bounded unit of delegated work. Its task and budget are
//! fixed at construction; only status and result change afterwards, and only
//! forward along `pending -> running -> completed | failed | timeout`.

use super::executor::{execute_request, TaskExecutor, TaskRequest};
use crate::{Result, SwarmGateError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Scope used when the caller does not pick one
pub const DEFAULT_SCOPE: &str = "general";

/// Payload fields checked for agent text, highest priority first
pub const PAYLOAD_FIELDS: [&str; 3] = ["response", "text", "rendered"];

/// Agent status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Spawned, not yet dispatched
    Pending,

    /// Dispatched to the executor
    Running,

    /// Executor returned a result
    Completed,

    /// Executor returned a failure or panicked
    Failed,

    /// The pool stopped waiting for the executor
    Timeout,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }

    /// Check if the agent has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }

    /// Check if moving to `next` keeps the lifecycle moving forward
    pub fn can_transition_to(&self, next: AgentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Timeout)
        )
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful executor output: a bag of named fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentOutput {
    pub fields: Map<String, Value>,
}

impl AgentOutput {
    /// Create an empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an output whose payload is a `response` field
    pub fn with_response(text: impl Into<String>) -> Self {
        Self::new().with_field("response", Value::String(text.into()))
    }

    /// Build an output from a JSON object
    pub fn from_fields(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(SwarmGateError::Other(format!(
                "Agent output must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Add a field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// The text payload: the first string among `response`, `text`, `rendered`
    ///
    /// Non-string values in those fields are skipped. Empty when none is present.
    pub fn payload(&self) -> &str {
        PAYLOAD_FIELDS
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_str))
            .unwrap_or("")
    }
}

/// Why an agent did not produce output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The executor reported a failure
    Executor,
    /// The pool gave up waiting
    Timeout,
    /// The executor panicked or its worker thread died
    Panicked,
}

/// Failure result of an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AgentFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure reported by the executor itself
    pub fn executor(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Executor, message)
    }

    /// Failure synthesized when the pool stops waiting for an agent
    pub fn timeout(agent_id: &str, timeout: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("Agent {} timed out after {:?}", agent_id, timeout),
        )
    }
}

impl fmt::Display for AgentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of an agent run
pub type AgentResult = std::result::Result<AgentOutput, AgentFailure>;

/// Parse an agent result from JSON text
///
/// An object with an `error` string is a failed result; any other object is
/// the output's field map.
pub fn parse_agent_result(input: &str) -> Result<AgentResult> {
    let value: Value = serde_json::from_str(input)?;
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Ok(Err(AgentFailure::executor(message)));
    }
    Ok(Ok(AgentOutput::from_fields(value)?))
}

/// A unit of delegated work
#[derive(Debug, Clone)]
pub struct Agent {
    id: String,
    task: String,
    scope: String,
    budget: f64,
    axiom_filter: Option<String>,
    /// Originating session or agent; a reference, not an owner
    parent_id: Option<String>,
    status: AgentStatus,
    result: Option<AgentResult>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Agent {
    /// Create a pending agent
    pub fn new(id: impl Into<String>, task: impl Into<String>, budget: f64) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            scope: DEFAULT_SCOPE.to_string(),
            budget,
            axiom_filter: None,
            parent_id: None,
            status: AgentStatus::Pending,
            result: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Set the scope
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Set the axiom filter passed through to the executor
    pub fn with_axiom_filter(mut self, filter: impl Into<String>) -> Self {
        self.axiom_filter = Some(filter.into());
        self
    }

    /// Set the parent reference
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn axiom_filter(&self) -> Option<&str> {
        self.axiom_filter.as_deref()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    /// Present once the agent reached a terminal state
    pub fn result(&self) -> Option<&AgentResult> {
        self.result.as_ref()
    }

    /// Build the executor request for this agent
    pub fn request(&self, cancel: CancellationToken) -> TaskRequest {
        TaskRequest {
            agent_id: self.id.clone(),
            task: self.task.clone(),
            budget: self.budget,
            scope: self.scope.clone(),
            axiom_filter: self.axiom_filter.clone(),
            parent_id: self.parent_id.clone(),
            cancel,
        }
    }

    /// Run the agent on the calling thread
    ///
    /// Moves the agent to running, invokes the executor, and records the
    /// terminal status before returning. A panicking executor is recorded as a
    /// failure.
    pub fn run(&mut self, executor: &dyn TaskExecutor) -> Result<&AgentResult> {
        self.start()?;
        let result = execute_request(executor, &self.request(CancellationToken::new()));
        self.finish(result)?;
        self.result
            .as_ref()
            .ok_or_else(|| SwarmGateError::Swarm(format!("Agent '{}' has no result", self.id)))
    }

    /// Mark the agent as dispatched
    pub(crate) fn start(&mut self) -> Result<()> {
        self.transition(AgentStatus::Running)?;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    /// Record the executor's result
    pub(crate) fn finish(&mut self, result: AgentResult) -> Result<()> {
        let status = if result.is_ok() {
            AgentStatus::Completed
        } else {
            AgentStatus::Failed
        };
        self.settle(status, result)
    }

    /// Record that the pool stopped waiting after `timeout`
    pub(crate) fn time_out(&mut self, timeout: Duration) -> Result<()> {
        let failure = AgentFailure::timeout(&self.id, timeout);
        self.settle(AgentStatus::Timeout, Err(failure))
    }

    fn settle(&mut self, status: AgentStatus, result: AgentResult) -> Result<()> {
        self.transition(status)?;
        self.result = Some(result);
        self.finished_at = Some(Instant::now());
        Ok(())
    }

    fn transition(&mut self, next: AgentStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SwarmGateError::InvalidTransition {
                agent_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        debug!(agent_id = %self.id, from = %self.status, to = %next, "Agent status change");
        self.status = next;
        Ok(())
    }

    /// Time from dispatch to terminal state, or to now while running
    pub fn runtime(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_creation() {
        let agent = Agent::new("agent_0", "Summarize the report", 25.0);

        assert_eq!(agent.id(), "agent_0");
        assert_eq!(agent.scope(), DEFAULT_SCOPE);
        assert_eq!(agent.budget(), 25.0);
        assert_eq!(agent.status(), AgentStatus::Pending);
        assert!(agent.result().is_none());
        assert_eq!(agent.runtime(), Duration::ZERO);
    }

    #[test]
    fn test_agent_builder() {
        let agent = Agent::new("agent_1", "Audit", 5.0)
            .with_scope("security")
            .with_axiom_filter("strict")
            .with_parent("session-42");

        assert_eq!(agent.scope(), "security");
        assert_eq!(agent.axiom_filter(), Some("strict"));
        assert_eq!(agent.parent_id(), Some("session-42"));

        let request = agent.request(CancellationToken::new());
        assert_eq!(request.agent_id, "agent_1");
        assert_eq!(request.scope, "security");
        assert_eq!(request.parent_id.as_deref(), Some("session-42"));
    }

    #[test]
    fn test_status_transitions() {
        use AgentStatus::*;

        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Timeout));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Timeout.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Running));
    }

    #[test]
    fn test_run_success() {
        let executor = |req: &TaskRequest| -> AgentResult {
            Ok(AgentOutput::with_response(format!("done: {}", req.task)))
        };
        let mut agent = Agent::new("agent_0", "write tests", 1.0);

        let result = agent.run(&executor).unwrap();
        assert_eq!(result.as_ref().unwrap().payload(), "done: write tests");
        assert_eq!(agent.status(), AgentStatus::Completed);
    }

    #[test]
    fn test_run_failure() {
        let executor = |_: &TaskRequest| -> AgentResult { Err(AgentFailure::executor("quota exhausted")) };
        let mut agent = Agent::new("agent_0", "t", 1.0);

        agent.run(&executor).unwrap();
        assert_eq!(agent.status(), AgentStatus::Failed);
        assert_eq!(
            agent.result().unwrap().as_ref().unwrap_err().message,
            "quota exhausted"
        );
    }

    #[test]
    fn test_run_twice_is_rejected() {
        let executor = |_: &TaskRequest| -> AgentResult { Ok(AgentOutput::new()) };
        let mut agent = Agent::new("agent_0", "t", 1.0);

        agent.run(&executor).unwrap();
        let err = agent.run(&executor).unwrap_err();
        assert!(matches!(err, SwarmGateError::InvalidTransition { .. }));
        assert_eq!(agent.status(), AgentStatus::Completed);
    }

    #[test]
    fn test_timeout_result_mentions_id_and_duration() {
        let mut agent = Agent::new("agent_7", "t", 1.0);
        agent.start().unwrap();
        agent.time_out(Duration::from_secs(300)).unwrap();

        assert_eq!(agent.status(), AgentStatus::Timeout);
        let failure = agent.result().unwrap().as_ref().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert!(failure.message.contains("agent_7"));
        assert!(failure.message.contains("300s"));

        // Terminal states are never left
        assert!(agent.finish(Ok(AgentOutput::new())).is_err());
        assert_eq!(agent.status(), AgentStatus::Timeout);
    }

    #[test]
    fn test_payload_skips_non_string_fields() {
        let output = AgentOutput::from_fields(json!({
            "response": {"nested": true},
            "rendered": "<p>hi</p>",
        }))
        .unwrap();
        assert_eq!(output.payload(), "<p>hi</p>");
    }

    #[test]
    fn test_output_must_be_object() {
        assert!(AgentOutput::from_fields(json!("plain string")).is_err());
    }

    #[test]
    fn test_parse_agent_result() {
        let output = parse_agent_result(r#"{"response": "done", "tokens": 12}"#)
            .unwrap()
            .unwrap();
        assert_eq!(output.payload(), "done");
        assert_eq!(output.fields["tokens"], json!(12));

        let failure = parse_agent_result(r#"{"error": "rate limited"}"#)
            .unwrap()
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Executor);
        assert_eq!(failure.message, "rate limited");
    }

    #[test]
    fn test_parse_agent_result_invalid_json() {
        assert!(matches!(
            parse_agent_result("{not json"),
            Err(SwarmGateError::Json(_))
        ));
        assert!(matches!(
            parse_agent_result("[1, 2]"),
            Err(SwarmGateError::Other(_))
        ));
    }
}
