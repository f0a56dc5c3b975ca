//! Domain models for the drover control plane.

pub mod config;
pub mod gate;
pub mod goal;
pub mod governance;
pub mod plan;
pub mod retry;
pub mod round;
pub mod summary;

pub use config::{BatchDefaults, DroverConfig, ExecutorConfig, GateProfileOverrides, LoggingConfig};
pub use gate::{
    GateActuals, GateChainResult, GateEvaluation, GateOverrides, GatePolicy, GateProfile,
    GateSource, RiskLevel,
};
pub use goal::{Goal, GoalStatus};
pub use governance::{
    GovernancePatch, GovernanceRound, GovernanceSession, GovernanceState, GovernanceTrigger,
    PolicySnapshot, ReleaseGateReport, RemediationAction, RemediationMode, StopReason,
    REMEDIATION_ACTIONS, SESSION_SCHEMA_VERSION,
};
pub use plan::{ComplexitySummary, ResourcePlan, SchedulingStrategy};
pub use retry::{RetryPlan, RetryStrategy};
pub use round::{GoalOutcome, OutcomeStatus, RateLimitTelemetry, RoundResult};
pub use summary::{
    migrate_summary, BatchRetryReport, BatchSummary, GateReport, GoalRecord, ResourcePlanReport,
    ResumeStrategy, SUMMARY_SCHEMA_VERSION,
};
