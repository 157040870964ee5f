//! SwarmGate - Content Firewall and Agent Pool for Delegated AI Work
//!
//! SwarmGate sits between an agent orchestrator and the agents it delegates to.
//! Every piece of content crossing that boundary is screened by an ordered rule
//! table, and child agents run under a bounded scheduler with per-agent budgets
//! and deadlines.
//!
//! # Architecture
//!
//! - **firewall**: Rule engine, shipped policy, and output sanitizer
//! - **swarm**: Agent lifecycle, budget allocation, and the batch scheduler
//! - **config**: YAML configuration and validation
//! - **metrics**: Prometheus counters for verdicts and agent outcomes
//! - **logging**: tracing subscriber setup

// Core modules
pub mod config;
pub mod error;
pub mod firewall;
pub mod swarm;

// Observability
pub mod logging;
pub mod metrics;

// Re-exports
pub use error::{Result, SwarmGateError};
