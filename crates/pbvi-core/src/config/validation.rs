//! Semantic validation for configuration files.
//!
//! Values that parse fine can still make the solver loop forever or return
//! nothing useful (zero sampling rounds, negative tolerances); those are
//! rejected here before any work starts.

use thiserror::Error;

use super::{PbviConfig, RunConfig, SolverConfig};

/// Errors that can occur during semantic validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be at least 1 (got {value})")]
    ZeroCount { field: String, value: usize },

    #[error("dedup_tolerance must be finite and non-negative (got {value})")]
    DedupTolerance { value: f64 },

    #[error("budget must be positive when set (got {value})")]
    Budget { value: f64 },
}

/// Validate a full configuration.
pub fn validate_config(config: &PbviConfig) -> Result<(), ValidationError> {
    validate_solver(&config.solver)?;
    validate_run(&config.run)
}

fn validate_solver(solver: &SolverConfig) -> Result<(), ValidationError> {
    require_positive("solver.max_belief_points", solver.max_belief_points)?;
    require_positive("solver.trials_per_round", solver.trials_per_round)?;
    require_positive("solver.max_rounds", solver.max_rounds)?;
    if !solver.dedup_tolerance.is_finite() || solver.dedup_tolerance < 0.0 {
        return Err(ValidationError::DedupTolerance {
            value: solver.dedup_tolerance,
        });
    }
    Ok(())
}

fn validate_run(run: &RunConfig) -> Result<(), ValidationError> {
    require_positive("run.simulations", run.simulations)?;
    if let Some(budget) = run.budget {
        if budget.is_nan() || budget <= 0.0 {
            return Err(ValidationError::Budget { value: budget });
        }
    }
    Ok(())
}

fn require_positive(field: &str, value: usize) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::ZeroCount {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&PbviConfig::default()), Ok(()));
    }

    #[test]
    fn zero_counts_rejected() {
        let mut config = PbviConfig::default();
        config.solver.trials_per_round = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::ZeroCount { field, .. }) if field == "solver.trials_per_round"
        ));

        let mut config = PbviConfig::default();
        config.run.simulations = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn tolerance_and_budget_rejected() {
        let mut config = PbviConfig::default();
        config.solver.dedup_tolerance = -1e-9;
        assert!(validate_config(&config).is_err());
        config.solver.dedup_tolerance = f64::NAN;
        assert!(validate_config(&config).is_err());

        let mut config = PbviConfig::default();
        config.run.budget = Some(0.0);
        assert!(validate_config(&config).is_err());
        config.run.budget = Some(5.0);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn horizon_zero_is_allowed() {
        let mut config = PbviConfig::default();
        config.solver.horizon = 0;
        assert!(validate_config(&config).is_ok());
    }
}
