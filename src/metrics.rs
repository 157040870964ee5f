//! Prometheus metrics for the firewall and the agent pool

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};

lazy_static! {
    /// Counter: firewall verdicts by outcome and direction
    pub static ref VERDICTS: CounterVec = register_counter_vec!(
        "swarmgate_verdicts_total",
        "Firewall verdicts by outcome and direction",
        &["outcome", "direction"]
    )
    .expect("Failed to create verdicts metric");

    /// Counter: fenced system blocks replaced by the sanitizer
    pub static ref REDACTIONS: Counter = register_counter!(
        "swarmgate_redactions_total",
        "System blocks redacted from agent output"
    )
    .expect("Failed to create redactions metric");

    /// Counter: agents reaching a terminal state, by status
    pub static ref AGENTS_FINISHED: CounterVec = register_counter_vec!(
        "swarmgate_agents_finished_total",
        "Agents reaching a terminal state by status",
        &["status"]
    )
    .expect("Failed to create agents_finished metric");

    /// Histogram: wall-clock time from dispatch to terminal state (seconds)
    pub static ref AGENT_DURATION: Histogram = register_histogram!(
        "swarmgate_agent_duration_seconds",
        "Agent wall-clock duration",
        vec![0.1, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]
    )
    .expect("Failed to create agent_duration metric");

    /// Gauge: agents currently dispatched and not yet resolved
    pub static ref RUNNING_AGENTS: Gauge = register_gauge!(
        "swarmgate_running_agents",
        "Agents currently running"
    )
    .expect("Failed to create running_agents metric");
}

/// Record a firewall verdict
pub fn record_verdict(outcome: &str, direction: &str) {
    VERDICTS.with_label_values(&[outcome, direction]).inc();
}

/// Record one redacted system block
pub fn record_redactions(count: usize) {
    REDACTIONS.inc_by(count as f64);
}

/// Record an agent reaching a terminal state
pub fn record_agent_finished(status: &str, duration_secs: f64) {
    AGENTS_FINISHED.with_label_values(&[status]).inc();
    AGENT_DURATION.observe(duration_secs);
}

/// Adjust the running agent gauge
pub fn add_running_agents(delta: i64) {
    RUNNING_AGENTS.add(delta as f64);
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> crate::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::SwarmGateError::Other(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::SwarmGateError::Other(format!("Metrics are not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        record_verdict("block", "in");
        record_redactions(2);
        record_agent_finished("completed", 1.5);
        add_running_agents(1);
        add_running_agents(-1);

        let output = encode_metrics().unwrap();
        assert!(output.contains("swarmgate_verdicts_total"));
        assert!(output.contains("swarmgate_agents_finished_total"));
    }
}
