//! Agent pool scheduler
//!
//! Spawns agents against a parent budget and runs them in fixed-size batches.
//! Each agent runs on its own OS thread under a wall-clock deadline; batches
//! run one after another with a hard barrier in between, so at most
//! `max_concurrent` agents are ever dispatched at once.

use super::agent::{Agent, AgentFailure, AgentResult, AgentStatus, FailureKind, DEFAULT_SCOPE};
use super::budget::{allocate, allocate_checked};
use super::executor::{execute_request, TaskExecutor};
use crate::config::PoolConfig;
use crate::{Result, SwarmGateError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Agents dispatched per batch
pub const MAX_CONCURRENT: usize = 4;

/// Wall-clock limit per agent
pub const AGENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Agent spawn request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Task description handed to the executor
    pub task: String,

    /// Scope classifier
    pub scope: String,

    /// Share of the parent budget, expected in (0, 1]
    pub budget_fraction: f64,

    /// Opaque policy reference passed to the executor
    pub axiom_filter: Option<String>,

    /// Originating session or agent
    pub parent_id: Option<String>,
}

impl SpawnRequest {
    /// Create a new spawn request in the default scope
    pub fn new(task: impl Into<String>, budget_fraction: f64) -> Self {
        Self {
            task: task.into(),
            scope: DEFAULT_SCOPE.to_string(),
            budget_fraction,
            axiom_filter: None,
            parent_id: None,
        }
    }

    /// Set scope
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Set axiom filter
    pub fn with_axiom_filter(mut self, filter: impl Into<String>) -> Self {
        self.axiom_filter = Some(filter.into());
        self
    }

    /// Set parent reference
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Counts by status plus allocated budget
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub total_agents: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub allocated_budget: f64,
    pub parent_budget: f64,
}

/// A dispatched agent the pool is waiting on
struct InFlight {
    agent_id: String,
    receiver: Receiver<AgentResult>,
    cancel: CancellationToken,
    dispatched_at: Instant,
}

enum Resolution {
    Finished(AgentResult),
    TimedOut,
}

/// Agent pool
///
/// Owns its agents; only the pool changes an agent's status or result.
/// `spawn` may be called from other threads while `run_all` is in progress;
/// agents spawned that way stay pending until the next run.
pub struct AgentPool {
    parent_budget: f64,
    executor: Arc<dyn TaskExecutor>,
    agents: RwLock<Vec<Agent>>,
    /// Serializes runs so two callers never exceed the batch bound together
    run_lock: Mutex<()>,
    /// Agents dispatched and not yet settled
    in_flight: AtomicUsize,
    max_concurrent: usize,
    agent_timeout: Duration,
    validate_fractions: bool,
}

impl AgentPool {
    /// Create a pool with default limits
    pub fn new<E>(parent_budget: f64, executor: E) -> Self
    where
        E: TaskExecutor + 'static,
    {
        Self {
            parent_budget,
            executor: Arc::new(executor),
            agents: RwLock::new(Vec::new()),
            run_lock: Mutex::new(()),
            in_flight: AtomicUsize::new(0),
            max_concurrent: MAX_CONCURRENT,
            agent_timeout: AGENT_TIMEOUT,
            validate_fractions: true,
        }
    }

    /// Create a pool with limits from configuration
    pub fn from_config<E>(parent_budget: f64, executor: E, config: &PoolConfig) -> Self
    where
        E: TaskExecutor + 'static,
    {
        Self::new(parent_budget, executor)
            .with_max_concurrent(config.max_concurrent)
            .with_agent_timeout(config.agent_timeout())
            .with_fraction_validation(config.validate_fractions)
    }

    /// Set the batch size (at least 1)
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Set the per-agent deadline
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Toggle the (0, 1] fraction check in [`AgentPool::spawn`]
    ///
    /// With validation off, any fraction is multiplied through unchecked,
    /// which can yield zero, negative, or over-parent budgets.
    pub fn with_fraction_validation(mut self, enabled: bool) -> Self {
        self.validate_fractions = enabled;
        self
    }

    pub fn parent_budget(&self) -> f64 {
        self.parent_budget
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn agent_timeout(&self) -> Duration {
        self.agent_timeout
    }

    /// Agents dispatched whose outcome has not been recorded yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn read_agents(&self) -> RwLockReadGuard<'_, Vec<Agent>> {
        self.agents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_agents(&self) -> RwLockWriteGuard<'_, Vec<Agent>> {
        self.agents.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a new pending agent
    ///
    /// The agent's budget is `parent_budget * budget_fraction`. Returns a
    /// snapshot of the agent; use [`AgentPool::get`] to observe later state.
    pub fn spawn(&self, request: SpawnRequest) -> Result<Agent> {
        let budget = if self.validate_fractions {
            allocate_checked(self.parent_budget, request.budget_fraction)?
        } else {
            allocate(self.parent_budget, request.budget_fraction)
        };

        let agent = {
            let mut agents = self.write_agents();
            let id = format!("agent_{}", agents.len());

            let mut agent = Agent::new(id, request.task, budget).with_scope(request.scope);
            if let Some(filter) = request.axiom_filter {
                agent = agent.with_axiom_filter(filter);
            }
            if let Some(parent_id) = request.parent_id {
                agent = agent.with_parent(parent_id);
            }

            agents.push(agent.clone());
            agent
        };

        info!(
            agent_id = agent.id(),
            budget,
            scope = agent.scope(),
            "Spawned agent"
        );

        Ok(agent)
    }

    /// Run every pending agent to a terminal state
    ///
    /// Blocks until the last batch has resolved. Returns every agent that has
    /// reached a terminal state, keyed by id. Agents spawned while the run is in
    /// progress are not picked up.
    pub fn run_all(&self) -> HashMap<String, Agent> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let pending: Vec<String> = self
            .read_agents()
            .iter()
            .filter(|a| a.status() == AgentStatus::Pending)
            .map(|a| a.id().to_string())
            .collect();

        info!(
            agents = pending.len(),
            batches = pending.len().div_ceil(self.max_concurrent),
            max_concurrent = self.max_concurrent,
            "Running agent pool"
        );

        for (index, batch) in pending.chunks(self.max_concurrent).enumerate() {
            debug!(batch = index + 1, size = batch.len(), "Starting batch");
            self.run_batch(batch);
        }

        self.read_agents()
            .iter()
            .filter(|a| a.status().is_terminal())
            .map(|a| (a.id().to_string(), a.clone()))
            .collect()
    }

    /// Run a single pending agent under the same supervision as `run_all`
    pub fn run_one(&self, agent_id: &str) -> Result<Agent> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let status = self
            .get(agent_id)
            .map(|a| a.status())
            .ok_or_else(|| SwarmGateError::AgentNotFound(agent_id.to_string()))?;
        if status != AgentStatus::Pending {
            return Err(SwarmGateError::InvalidTransition {
                agent_id: agent_id.to_string(),
                from: status,
                to: AgentStatus::Running,
            });
        }

        self.run_batch(&[agent_id.to_string()]);

        self.get(agent_id)
            .ok_or_else(|| SwarmGateError::AgentNotFound(agent_id.to_string()))
    }

    fn run_batch(&self, ids: &[String]) {
        let in_flight: Vec<InFlight> = ids.iter().filter_map(|id| self.dispatch(id)).collect();

        // Barrier: every dispatched agent resolves before the batch ends
        for flight in in_flight {
            let resolution = self.wait_for(&flight);
            self.settle(&flight.agent_id, resolution);
        }
    }

    fn dispatch(&self, agent_id: &str) -> Option<InFlight> {
        let cancel = CancellationToken::new();

        let request = {
            let mut agents = self.write_agents();
            let agent = agents.iter_mut().find(|a| a.id() == agent_id)?;
            if let Err(e) = agent.start() {
                debug!(agent_id, error = %e, "Skipping agent");
                return None;
            }
            agent.request(cancel.clone())
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        crate::metrics::add_running_agents(1);

        let (sender, receiver) = mpsc::channel();
        let executor = Arc::clone(&self.executor);
        let spawned = thread::Builder::new()
            .name(format!("swarmgate-{}", agent_id))
            .spawn(move || {
                let result = execute_request(executor.as_ref(), &request);
                // The pool may have stopped listening after a timeout
                let _ = sender.send(result);
            });

        match spawned {
            // Handle dropped on purpose: a timed-out worker is left detached
            Ok(_) => Some(InFlight {
                agent_id: agent_id.to_string(),
                receiver,
                cancel,
                dispatched_at: Instant::now(),
            }),
            Err(e) => {
                warn!(agent_id, error = %e, "Failed to start worker thread");
                let failure = AgentFailure::executor(format!("Failed to start worker thread: {}", e));
                self.settle(agent_id, Resolution::Finished(Err(failure)));
                None
            }
        }
    }

    fn wait_for(&self, flight: &InFlight) -> Resolution {
        // A deadline past the end of the clock means no deadline at all
        let received = match flight.dispatched_at.checked_add(self.agent_timeout) {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                flight.receiver.recv_timeout(remaining)
            }
            None => flight
                .receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(result) => Resolution::Finished(result),
            Err(RecvTimeoutError::Timeout) => {
                flight.cancel.cancel();
                warn!(
                    agent_id = %flight.agent_id,
                    timeout = ?self.agent_timeout,
                    "Agent timed out; worker thread abandoned"
                );
                Resolution::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => Resolution::Finished(Err(AgentFailure::new(
                FailureKind::Panicked,
                "Worker thread exited without a result",
            ))),
        }
    }

    fn settle(&self, agent_id: &str, resolution: Resolution) {
        // Every dispatched agent leaves the running count, recorded or not
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        crate::metrics::add_running_agents(-1);

        let mut agents = self.write_agents();
        let Some(agent) = agents.iter_mut().find(|a| a.id() == agent_id) else {
            return;
        };

        let settled = match resolution {
            Resolution::Finished(result) => agent.finish(result),
            Resolution::TimedOut => agent.time_out(self.agent_timeout),
        };
        if let Err(e) = settled {
            warn!(agent_id, error = %e, "Could not record agent result");
            return;
        }

        crate::metrics::record_agent_finished(agent.status().as_str(), agent.runtime().as_secs_f64());

        info!(
            agent_id,
            status = %agent.status(),
            runtime_ms = agent.runtime().as_millis() as u64,
            "Agent finished"
        );
    }

    /// Get an agent by ID
    pub fn get(&self, agent_id: &str) -> Option<Agent> {
        self.read_agents()
            .iter()
            .find(|a| a.id() == agent_id)
            .cloned()
    }

    /// Get all agents in spawn order
    pub fn list(&self) -> Vec<Agent> {
        self.read_agents().clone()
    }

    pub fn len(&self) -> usize {
        self.read_agents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_agents().is_empty()
    }

    /// Agents whose status is exactly `completed`
    pub fn completed(&self) -> Vec<Agent> {
        self.read_agents()
            .iter()
            .filter(|a| a.status() == AgentStatus::Completed)
            .cloned()
            .collect()
    }

    /// Every agent that is not `completed`
    ///
    /// This includes timed-out agents and also agents that are still pending or
    /// running. Queried before `run_all` finishes, it reports unscheduled work
    /// as failed. Use [`AgentPool::failed_strict`] for `status == failed` only.
    pub fn failed(&self) -> Vec<Agent> {
        self.read_agents()
            .iter()
            .filter(|a| a.status() != AgentStatus::Completed)
            .cloned()
            .collect()
    }

    /// Agents whose status is exactly `failed`
    pub fn failed_strict(&self) -> Vec<Agent> {
        self.read_agents()
            .iter()
            .filter(|a| a.status() == AgentStatus::Failed)
            .cloned()
            .collect()
    }

    /// Sum of allocated budgets over all agents, run or not
    ///
    /// Advisory only: this is what was handed out, not what was spent.
    pub fn total_budget_used(&self) -> f64 {
        self.read_agents().iter().map(|a| a.budget()).sum()
    }

    /// Get summary statistics
    pub fn stats(&self) -> PoolStats {
        let agents = self.read_agents();
        let count = |status: AgentStatus| agents.iter().filter(|a| a.status() == status).count();

        PoolStats {
            total_agents: agents.len(),
            pending: count(AgentStatus::Pending),
            running: count(AgentStatus::Running),
            completed: count(AgentStatus::Completed),
            failed: count(AgentStatus::Failed),
            timed_out: count(AgentStatus::Timeout),
            allocated_budget: agents.iter().map(|a| a.budget()).sum(),
            parent_budget: self.parent_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::{AgentOutput, TaskRequest};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn echo(req: &TaskRequest) -> AgentResult {
        Ok(AgentOutput::with_response(format!("{} done", req.task)))
    }

    #[test]
    fn test_spawn_agent() {
        let pool = AgentPool::new(100.0, echo);

        let agent = pool
            .spawn(
                SpawnRequest::new("Summarize", 0.25)
                    .with_scope("research")
                    .with_axiom_filter("strict")
                    .with_parent("session-1"),
            )
            .unwrap();

        assert_eq!(agent.id(), "agent_0");
        assert_eq!(agent.budget(), 25.0);
        assert_eq!(agent.scope(), "research");
        assert_eq!(agent.axiom_filter(), Some("strict"));
        assert_eq!(agent.parent_id(), Some("session-1"));
        assert_eq!(agent.status(), AgentStatus::Pending);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_ids_follow_spawn_order() {
        let pool = AgentPool::new(10.0, echo);
        let ids: Vec<String> = (0..3)
            .map(|i| pool.spawn(SpawnRequest::new(format!("t{}", i), 0.1)).unwrap().id().to_string())
            .collect();
        assert_eq!(ids, vec!["agent_0", "agent_1", "agent_2"]);
    }

    #[test]
    fn test_fraction_validation() {
        let pool = AgentPool::new(100.0, echo);
        assert!(matches!(
            pool.spawn(SpawnRequest::new("t", 1.5)),
            Err(SwarmGateError::InvalidFraction(_))
        ));
        assert!(pool.spawn(SpawnRequest::new("t", 0.0)).is_err());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_unchecked_fractions_when_validation_disabled() {
        let pool = AgentPool::new(100.0, echo).with_fraction_validation(false);
        let agent = pool.spawn(SpawnRequest::new("t", 1.5)).unwrap();
        assert_eq!(agent.budget(), 150.0);
    }

    #[test]
    fn test_total_budget_used_before_and_after_run() {
        let pool = AgentPool::new(100.0, echo);
        for fraction in [0.25, 0.5, 0.5] {
            pool.spawn(SpawnRequest::new("t", fraction)).unwrap();
        }

        // Sum may exceed the parent budget; the pool does not cap it
        assert_eq!(pool.total_budget_used(), 125.0);
        pool.run_all();
        assert_eq!(pool.total_budget_used(), 125.0);
    }

    #[test]
    fn test_run_all_completes_every_agent() {
        let pool = AgentPool::new(10.0, echo);
        for i in 0..6 {
            pool.spawn(SpawnRequest::new(format!("task {}", i), 0.1)).unwrap();
        }

        let results = pool.run_all();
        assert_eq!(results.len(), 6);
        assert!(results
            .values()
            .all(|a| a.status() == AgentStatus::Completed));
        assert_eq!(
            results["agent_3"].result().unwrap().as_ref().unwrap().payload(),
            "task 3 done"
        );
        assert_eq!(pool.completed().len(), 6);
        assert!(pool.failed().is_empty());
    }

    #[test]
    fn test_failures_do_not_abort_siblings() {
        let executor = |req: &TaskRequest| -> AgentResult {
            match req.task.as_str() {
                "fail" => Err(AgentFailure::executor("upstream 500")),
                "panic" => panic!("executor bug"),
                _ => Ok(AgentOutput::with_response("ok")),
            }
        };
        let pool = AgentPool::new(10.0, executor);
        for task in ["ok", "fail", "panic", "ok", "ok"] {
            pool.spawn(SpawnRequest::new(task, 0.1)).unwrap();
        }

        let results = pool.run_all();
        assert_eq!(results.len(), 5);
        assert_eq!(results["agent_1"].status(), AgentStatus::Failed);
        assert_eq!(results["agent_2"].status(), AgentStatus::Failed);
        assert_eq!(
            results["agent_2"].result().unwrap().as_ref().unwrap_err().kind,
            FailureKind::Panicked
        );
        assert_eq!(pool.completed().len(), 3);
        assert_eq!(pool.failed_strict().len(), 2);
    }

    #[test]
    fn test_failed_includes_pending_agents() {
        let pool = AgentPool::new(10.0, echo);
        pool.spawn(SpawnRequest::new("t", 0.1)).unwrap();

        assert_eq!(pool.failed().len(), 1);
        assert!(pool.failed_strict().is_empty());

        pool.run_all();
        assert!(pool.failed().is_empty());
    }

    #[test]
    fn test_concurrency_bound() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let executor = {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            move |_: &TaskRequest| -> AgentResult {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                current.fetch_sub(1, Ordering::SeqCst);
                Ok(AgentOutput::new())
            }
        };

        let pool = AgentPool::new(10.0, executor);
        for _ in 0..10 {
            pool.spawn(SpawnRequest::new("t", 0.1)).unwrap();
        }

        let started = Instant::now();
        let results = pool.run_all();
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 10);
        // Full batches run side by side, never wider than the bound
        assert_eq!(peak.load(Ordering::SeqCst), MAX_CONCURRENT);
        // Three batches of 50ms; one at a time would take at least 500ms
        assert!(elapsed < Duration::from_millis(450), "took {:?}", elapsed);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_unbounded_timeout_waits_for_result() {
        let pool = AgentPool::new(10.0, echo).with_agent_timeout(Duration::MAX);
        pool.spawn(SpawnRequest::new("t", 0.1)).unwrap();

        let results = pool.run_all();
        assert_eq!(results["agent_0"].status(), AgentStatus::Completed);
    }

    #[test]
    fn test_max_timeout_from_config() {
        let mut full = crate::config::SwarmGateConfig::new();
        full.pool = PoolConfig {
            max_concurrent: 2,
            agent_timeout_secs: u64::MAX,
            validate_fractions: true,
        };
        assert!(crate::config::validate_config(&full).is_ok());

        let pool = AgentPool::from_config(10.0, echo, &full.pool);
        pool.spawn(SpawnRequest::new("a", 0.1)).unwrap();
        pool.spawn(SpawnRequest::new("b", 0.1)).unwrap();

        let results = pool.run_all();
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|a| a.status() == AgentStatus::Completed));
    }

    #[test]
    fn test_unrecorded_result_still_leaves_in_flight() {
        let pool = AgentPool::new(10.0, echo);
        pool.spawn(SpawnRequest::new("t", 0.1)).unwrap();

        let flight = pool.dispatch("agent_0").unwrap();
        assert_eq!(pool.in_flight(), 1);

        // Agent already terminal, so the timeout below cannot be recorded
        pool.write_agents()[0]
            .finish(Ok(AgentOutput::new()))
            .unwrap();
        pool.settle(&flight.agent_id, Resolution::TimedOut);

        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.get("agent_0").unwrap().status(), AgentStatus::Completed);
    }

    #[test]
    fn test_timeout_marks_agent_and_cancels() {
        let observed_cancel = Arc::new(AtomicBool::new(false));

        let executor = {
            let observed_cancel = Arc::clone(&observed_cancel);
            move |req: &TaskRequest| -> AgentResult {
                if req.task == "hang" {
                    let started = Instant::now();
                    while !req.is_cancelled() && started.elapsed() < Duration::from_secs(5) {
                        thread::sleep(Duration::from_millis(5));
                    }
                    observed_cancel.store(req.is_cancelled(), Ordering::SeqCst);
                }
                Ok(AgentOutput::with_response("late"))
            }
        };

        let pool = AgentPool::new(10.0, executor).with_agent_timeout(Duration::from_millis(100));
        pool.spawn(SpawnRequest::new("hang", 0.1)).unwrap();
        pool.spawn(SpawnRequest::new("quick", 0.1)).unwrap();

        let started = Instant::now();
        let results = pool.run_all();
        assert!(started.elapsed() < Duration::from_secs(4));

        let hung = &results["agent_0"];
        assert_eq!(hung.status(), AgentStatus::Timeout);
        let failure = hung.result().unwrap().as_ref().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert!(failure.message.contains("agent_0"));
        assert!(failure.message.contains("100ms"));

        assert_eq!(results["agent_1"].status(), AgentStatus::Completed);

        // The detached worker sees the cancellation and stops on its own
        let waited = Instant::now();
        while !observed_cancel.load(Ordering::SeqCst) && waited.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(observed_cancel.load(Ordering::SeqCst));

        // Terminal state sticks even after the worker finished
        assert_eq!(pool.get("agent_0").unwrap().status(), AgentStatus::Timeout);
    }

    #[test]
    fn test_batches_run_in_order_with_barrier() {
        let events = Arc::new(Mutex::new(Vec::new()));

        let executor = {
            let events = Arc::clone(&events);
            move |req: &TaskRequest| -> AgentResult {
                events.lock().unwrap().push(format!("start {}", req.agent_id));
                thread::sleep(Duration::from_millis(20));
                events.lock().unwrap().push(format!("end {}", req.agent_id));
                Ok(AgentOutput::new())
            }
        };

        let pool = AgentPool::new(10.0, executor).with_max_concurrent(2);
        for _ in 0..4 {
            pool.spawn(SpawnRequest::new("t", 0.1)).unwrap();
        }
        pool.run_all();

        let events = events.lock().unwrap();
        let position = |event: &str| events.iter().position(|e| e == event).unwrap();
        let last_end_of_first = position("end agent_0").max(position("end agent_1"));
        let first_start_of_second = position("start agent_2").min(position("start agent_3"));
        assert!(last_end_of_first < first_start_of_second);
    }

    #[test]
    fn test_spawn_during_run_waits_for_next_run() {
        let gate = Arc::new(AtomicBool::new(false));

        let executor = {
            let gate = Arc::clone(&gate);
            move |_: &TaskRequest| -> AgentResult {
                let started = Instant::now();
                while !gate.load(Ordering::SeqCst) && started.elapsed() < Duration::from_secs(5) {
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(AgentOutput::new())
            }
        };

        let pool = Arc::new(AgentPool::new(10.0, executor));
        pool.spawn(SpawnRequest::new("first", 0.1)).unwrap();

        let runner = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.run_all())
        };

        // Wait until the first agent is dispatched, then spawn alongside the run
        let waited = Instant::now();
        while pool.get("agent_0").unwrap().status() == AgentStatus::Pending
            && waited.elapsed() < Duration::from_secs(2)
        {
            thread::sleep(Duration::from_millis(5));
        }
        pool.spawn(SpawnRequest::new("second", 0.1)).unwrap();
        gate.store(true, Ordering::SeqCst);

        let first_run = runner.join().unwrap();
        assert_eq!(first_run.len(), 1);
        assert_eq!(pool.get("agent_1").unwrap().status(), AgentStatus::Pending);

        let second_run = pool.run_all();
        assert_eq!(second_run.len(), 2);
        assert_eq!(second_run["agent_1"].status(), AgentStatus::Completed);
    }

    #[test]
    fn test_run_one() {
        let pool = AgentPool::new(10.0, echo);
        pool.spawn(SpawnRequest::new("a", 0.1)).unwrap();
        pool.spawn(SpawnRequest::new("b", 0.1)).unwrap();

        let agent = pool.run_one("agent_1").unwrap();
        assert_eq!(agent.status(), AgentStatus::Completed);
        assert_eq!(pool.get("agent_0").unwrap().status(), AgentStatus::Pending);

        assert!(matches!(
            pool.run_one("agent_1"),
            Err(SwarmGateError::InvalidTransition { .. })
        ));
        assert!(matches!(
            pool.run_one("agent_9"),
            Err(SwarmGateError::AgentNotFound(_))
        ));
    }

    #[test]
    fn test_stats() {
        let executor = |req: &TaskRequest| -> AgentResult {
            if req.task == "fail" {
                Err(AgentFailure::executor("nope"))
            } else {
                Ok(AgentOutput::new())
            }
        };
        let pool = AgentPool::new(40.0, executor);
        pool.spawn(SpawnRequest::new("ok", 0.5)).unwrap();
        pool.spawn(SpawnRequest::new("fail", 0.25)).unwrap();
        pool.run_all();
        pool.spawn(SpawnRequest::new("later", 0.25)).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.total_agents, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.allocated_budget, 40.0);
        assert_eq!(stats.parent_budget, 40.0);
    }

    #[test]
    fn test_from_config() {
        let config = PoolConfig {
            max_concurrent: 0,
            agent_timeout_secs: 12,
            validate_fractions: false,
        };
        let pool = AgentPool::from_config(1.0, echo, &config);
        assert_eq!(pool.max_concurrent(), 1);
        assert_eq!(pool.agent_timeout(), Duration::from_secs(12));
        assert!(pool.spawn(SpawnRequest::new("t", 2.0)).is_ok());
    }
}
