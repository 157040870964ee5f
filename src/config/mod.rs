//! Configuration system
//!
//! Loads ~/.config/swarmgate/config.yaml with support for:
//! - Agent pool limits (batch size, per-agent timeout, fraction validation)
//! - Firewall settings (oversize limit, extra rules, default policy toggle)

mod swarmgate_config;
pub mod validation;

pub use swarmgate_config::{FirewallConfig, PoolConfig, SwarmGateConfig};
pub use validation::{validate_config, validate_config_result, ValidationError};
