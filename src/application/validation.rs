//! Option range validation.
//!
//! Every tunable is validated before any executor call is made; an
//! invalid range or combination fails fast with a structured, typed
//! error the CLI can render as JSON.

use serde::Serialize;
use thiserror::Error;

use super::batch_runner::BatchOptions;
use super::governance::GovernanceOptions;

/// Inclusive bounds for the batch and governance tunables.
pub const PARALLEL_RANGE: (u32, u32) = (1, 20);
pub const AGENT_BUDGET_RANGE: (u32, u32) = (1, 500);
pub const AGING_FACTOR_RANGE: (u64, u64) = (0, 100);
pub const RETRY_ROUNDS_RANGE: (u32, u32) = (0, 5);
pub const RETRY_MAX_ROUNDS_RANGE: (u32, u32) = (1, 20);
pub const GOVERNANCE_MAX_ROUNDS_RANGE: (u32, u32) = (1, 20);
pub const MAX_MINUTES_RANGE: (u64, u64) = (1, 1440);
pub const PLATEAU_ROUNDS_RANGE: (u32, u32) = (0, 10);
pub const GATE_SUB_SPECS_RANGE: (u32, u32) = (1, 10_000);

/// Structured validation failure, reported before any work starts.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Invalid {field}: {value}. Must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Invalid {field}: {value}. Must be one of: {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: &'static str,
    },

    #[error("Invalid option combination: {reason}")]
    InvalidCombination { reason: String },
}

fn check_range_u32(
    field: &'static str,
    value: u32,
    (min, max): (u32, u32),
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value: u64::from(value),
            min: u64::from(min),
            max: u64::from(max),
        });
    }
    Ok(())
}

fn check_range_u64(
    field: &'static str,
    value: u64,
    (min, max): (u64, u64),
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

/// Validate a full set of batch options.
pub fn validate_batch_options(options: &BatchOptions) -> Result<(), ValidationError> {
    check_range_u32("parallel", options.parallel, PARALLEL_RANGE)?;
    if let Some(budget) = options.agent_budget {
        check_range_u32("agent_budget", budget, AGENT_BUDGET_RANGE)?;
    }
    check_range_u64("aging_factor", options.aging_factor, AGING_FACTOR_RANGE)?;
    check_range_u32("retry_rounds", options.retry.rounds, RETRY_ROUNDS_RANGE)?;

    if options.retry.until_complete {
        check_range_u32(
            "retry_max_rounds",
            options.retry.max_rounds,
            RETRY_MAX_ROUNDS_RANGE,
        )?;
    } else if options.retry.max_rounds != 0 {
        return Err(ValidationError::InvalidCombination {
            reason: "retry_max_rounds requires retry_until_complete".to_string(),
        });
    }

    if let Some(gate) = &options.gate {
        if let Some(budget) = gate.overrides.max_agent_budget {
            check_range_u32("max_agent_budget", budget, AGENT_BUDGET_RANGE)?;
        }
        if let Some(sub_specs) = gate.overrides.max_total_sub_specs {
            check_range_u32("max_total_sub_specs", sub_specs, GATE_SUB_SPECS_RANGE)?;
        }
        if let Some(minutes) = gate.overrides.max_elapsed_minutes {
            check_range_u64("max_elapsed_minutes", minutes, MAX_MINUTES_RANGE)?;
        }
    }

    Ok(())
}

/// Validate a full set of governance options.
pub fn validate_governance_options(options: &GovernanceOptions) -> Result<(), ValidationError> {
    check_range_u32(
        "max_rounds",
        options.max_rounds,
        GOVERNANCE_MAX_ROUNDS_RANGE,
    )?;
    check_range_u64("max_minutes", options.max_minutes, MAX_MINUTES_RANGE)?;
    check_range_u32(
        "plateau_rounds",
        options.plateau_rounds,
        PLATEAU_ROUNDS_RANGE,
    )?;
    if let Some(index) = options.pinned_action {
        let table_len = crate::domain::models::REMEDIATION_ACTIONS.len();
        if index >= table_len {
            return Err(ValidationError::OutOfRange {
                field: "action",
                value: index as u64,
                min: 0,
                max: (table_len - 1) as u64,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::batch_runner::RetryOptions;
    use crate::domain::models::{GateOverrides, RemediationMode};

    #[test]
    fn test_defaults_are_valid() {
        validate_batch_options(&BatchOptions::default()).unwrap();
        validate_governance_options(&GovernanceOptions::default()).unwrap();
    }

    #[test]
    fn test_parallel_out_of_range() {
        let options = BatchOptions { parallel: 21, ..Default::default() };
        let err = validate_batch_options(&options).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "parallel", value: 21, .. }
        ));
    }

    #[test]
    fn test_agent_budget_bounds() {
        let options = BatchOptions { agent_budget: Some(501), ..Default::default() };
        assert!(validate_batch_options(&options).is_err());

        let options = BatchOptions { agent_budget: Some(500), ..Default::default() };
        validate_batch_options(&options).unwrap();
    }

    #[test]
    fn test_retry_max_rounds_requires_until_complete() {
        let options = BatchOptions {
            retry: RetryOptions {
                max_rounds: 5,
                until_complete: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_batch_options(&options).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCombination { .. }));
    }

    #[test]
    fn test_until_complete_max_rounds_bounds() {
        let options = BatchOptions {
            retry: RetryOptions {
                until_complete: true,
                max_rounds: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_batch_options(&options).is_err());

        let options = BatchOptions {
            retry: RetryOptions {
                until_complete: true,
                max_rounds: 20,
                ..Default::default()
            },
            ..Default::default()
        };
        validate_batch_options(&options).unwrap();
    }

    #[test]
    fn test_gate_threshold_bounds() {
        let options = BatchOptions {
            gate: Some(crate::application::batch_runner::GateOptions {
                overrides: GateOverrides {
                    max_elapsed_minutes: Some(0),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_batch_options(&options).is_err());
    }

    #[test]
    fn test_pinned_action_bounds() {
        let options = GovernanceOptions {
            mode: RemediationMode::RecoverCycle,
            pinned_action: Some(9),
            ..Default::default()
        };
        let err = validate_governance_options(&options).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "action", .. }));
    }

    #[test]
    fn test_error_serializes_as_structured_payload() {
        let err = ValidationError::OutOfRange {
            field: "parallel",
            value: 42,
            min: 1,
            max: 20,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "out_of_range");
        assert_eq!(json["field"], "parallel");
    }
}
