//! SwarmGate configuration file handling
//!
//! Loads and manages the ~/.config/swarmgate/config.yaml file.

use crate::firewall::{RuleSpec, MAX_OUTPUT_SIZE};
use crate::swarm::{AGENT_TIMEOUT, MAX_CONCURRENT};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Agent pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Agents run concurrently per batch
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Wall-clock limit per agent, in seconds
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,

    /// Reject spawn fractions outside (0, 1]
    #[serde(default = "default_validate_fractions")]
    pub validate_fractions: bool,
}

fn default_max_concurrent() -> usize {
    MAX_CONCURRENT
}

fn default_agent_timeout_secs() -> u64 {
    AGENT_TIMEOUT.as_secs()
}

fn default_validate_fractions() -> bool {
    true
}

impl PoolConfig {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            agent_timeout_secs: default_agent_timeout_secs(),
            validate_fractions: default_validate_fractions(),
        }
    }
}

/// Content firewall settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallConfig {
    /// Texts longer than this many characters are blocked outright
    #[serde(default = "default_max_output_size")]
    pub max_output_size: usize,

    /// Append the shipped policy after the configured rules
    #[serde(default = "default_use_default_policy")]
    pub use_default_policy: bool,

    /// Extra rules, evaluated before the shipped policy
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_max_output_size() -> usize {
    MAX_OUTPUT_SIZE
}

fn default_use_default_policy() -> bool {
    true
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            max_output_size: default_max_output_size(),
            use_default_policy: default_use_default_policy(),
            rules: Vec::new(),
        }
    }
}

/// SwarmGate configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmGateConfig {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub firewall: FirewallConfig,
}

impl SwarmGateConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the default path (~/.config/swarmgate/config.yaml)
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::SwarmGateError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading SwarmGate configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            max_concurrent = config.pool.max_concurrent,
            agent_timeout_secs = config.pool.agent_timeout_secs,
            custom_rules = config.firewall.rules.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving SwarmGate configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/swarmgate/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("swarmgate");
        path.push("config.yaml");
        path
    }
}
