//! Budget allocation for child agents

use crate::{Result, SwarmGateError};

/// Child budget as a fraction of the parent's
///
/// Pure arithmetic; no range checks. See [`allocate_checked`] for the
/// validating variant used by the pool.
pub fn allocate(parent_budget: f64, fraction: f64) -> f64 {
    parent_budget * fraction
}

/// Child budget with the fraction restricted to `(0, 1]`
///
/// Also rejects a non-positive or non-finite parent budget, so the returned
/// budget is always positive.
pub fn allocate_checked(parent_budget: f64, fraction: f64) -> Result<f64> {
    // Negated comparison also catches NaN
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(SwarmGateError::InvalidFraction(fraction));
    }
    if !(parent_budget.is_finite() && parent_budget > 0.0) {
        return Err(SwarmGateError::Swarm(format!(
            "Parent budget must be positive, got {}",
            parent_budget
        )));
    }
    Ok(allocate(parent_budget, fraction))
}
