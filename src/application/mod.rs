//! Application layer - async orchestration of the control plane.

pub mod batch_runner;
pub mod governance;
pub mod round_runner;
pub mod validation;

pub use batch_runner::{BatchOptions, BatchRunner, GateOptions, RetryOptions};
pub use governance::{
    AnomalySignal, GovernanceController, GovernanceOptions, ReleaseGateCheck,
};
pub use round_runner::{RoundConfig, RoundRunner};
pub use validation::{validate_batch_options, validate_governance_options, ValidationError};
