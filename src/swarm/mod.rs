//! Agent swarm scheduling
//!
//! Spawns budget-bounded agents and runs them in bounded batches.
//!
//! # Overview
//!
//! - **Agent Lifecycle**: `pending -> running -> completed | failed | timeout`,
//!   forward only
//! - **Budget Allocation**: each child gets a fraction of the parent budget
//! - **Pool Scheduling**: at most four agents in flight, five minutes each
//! - **Executor Seam**: the actual work is done by a [`TaskExecutor`] supplied
//!   by the caller
//!
//! # Example
//!
//! ```ignore
//! use swarmgate::swarm::{AgentOutput, AgentPool, SpawnRequest, TaskRequest};
//!
//! let pool = AgentPool::new(100.0, |req: &TaskRequest| {
//!     Ok(AgentOutput::with_response(format!("done: {}", req.task)))
//! });
//!
//! let agent = pool.spawn(SpawnRequest::new("Summarize findings", 0.25))?;
//! assert_eq!(agent.budget(), 25.0);
//!
//! let results = pool.run_all();
//! for agent in results.values() {
//!     println!("{}: {}", agent.id(), agent.status());
//! }
//! ```

mod agent;
mod budget;
mod executor;
mod pool;

pub use agent::{
    parse_agent_result, Agent, AgentFailure, AgentOutput, AgentResult, AgentStatus, FailureKind,
    DEFAULT_SCOPE, PAYLOAD_FIELDS,
};
pub use budget::{allocate, allocate_checked};
pub use executor::{execute_request, TaskExecutor, TaskRequest};
pub use pool::{AgentPool, PoolStats, SpawnRequest, AGENT_TIMEOUT, MAX_CONCURRENT};
