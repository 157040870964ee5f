//! Configuration validation
//!
//! Validates SwarmGate configuration for correctness:
//! - Pool limits are non-zero
//! - Rule patterns compile
//! - Rule names are unique
//! - The firewall ends up with at least one rule

use super::swarmgate_config::SwarmGateConfig;
use crate::SwarmGateError;
use regex::Regex;
use std::collections::HashSet;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a SwarmGate configuration, collecting every problem
pub fn validate_config(config: &SwarmGateConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.pool.max_concurrent == 0 {
        errors.push(ValidationError::new(
            "pool.max_concurrent",
            "Must be greater than 0",
        ));
    }

    if config.pool.agent_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "pool.agent_timeout_secs",
            "Must be greater than 0",
        ));
    }

    if config.firewall.max_output_size == 0 {
        errors.push(ValidationError::new(
            "firewall.max_output_size",
            "Must be greater than 0",
        ));
    }

    if config.firewall.rules.is_empty() && !config.firewall.use_default_policy {
        errors.push(ValidationError::new(
            "firewall.rules",
            "No rules configured and the default policy is disabled",
        ));
    }

    let mut seen_names = HashSet::new();
    for (index, rule) in config.firewall.rules.iter().enumerate() {
        let field = format!("firewall.rules[{}]", index);

        if rule.name.is_empty() {
            errors.push(ValidationError::new(&field, "Rule name cannot be empty"));
        } else if !seen_names.insert(rule.name.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("Duplicate rule name: {}", rule.name),
            ));
        }

        if let Err(e) = Regex::new(&rule.pattern) {
            errors.push(ValidationError::new(
                &field,
                format!("Invalid pattern '{}': {}", rule.pattern, e),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &SwarmGateConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        SwarmGateError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
