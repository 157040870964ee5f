//! Task executor seam
//!
//! The executor performs an agent's actual work. It lives outside this crate;
//! the pool only needs a synchronous call that turns a request into a result.

use super::agent::{AgentFailure, AgentResult, FailureKind};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Everything an executor needs to run one agent
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub agent_id: String,
    pub task: String,
    pub budget: f64,
    pub scope: String,
    /// Opaque policy reference, passed through untouched
    pub axiom_filter: Option<String>,
    pub parent_id: Option<String>,
    /// Cancelled when the pool stops waiting for this agent
    pub cancel: CancellationToken,
}

impl TaskRequest {
    /// Check if the pool has given up on this request
    ///
    /// Long-running executors should poll this and return early. Executors
    /// that never check it keep running after a timeout until they finish on
    /// their own.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Performs the work behind an agent
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, request: &TaskRequest) -> AgentResult;
}

impl<F> TaskExecutor for F
where
    F: Fn(&TaskRequest) -> AgentResult + Send + Sync,
{
    fn execute(&self, request: &TaskRequest) -> AgentResult {
        self(request)
    }
}

/// Invoke an executor, turning a panic into a failure result
pub fn execute_request(executor: &dyn TaskExecutor, request: &TaskRequest) -> AgentResult {
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(request))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(agent_id = %request.agent_id, %message, "Executor panicked");
            Err(AgentFailure::new(
                FailureKind::Panicked,
                format!("Executor panicked: {}", message),
            ))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
