//! Batch summary document.
//!
//! The summary is the durable record of one batch invocation, persisted
//! atomically and consumed on resume. Persisted documents are versioned;
//! [`migrate_summary`] upgrades older documents before any controller
//! sees them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};

use super::gate::GateEvaluation;
use super::plan::ResourcePlan;
use super::retry::{RetryPlan, RetryStrategy};
use super::round::{OutcomeStatus, RoundResult};

/// Current schema version for persisted summaries.
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Which goals a resumed batch re-drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeStrategy {
    /// Re-run everything that is not `completed`
    Pending,
    /// Re-run only `failed` and `error` goals
    FailedOnly,
}

impl ResumeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::FailedOnly => "failed-only",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "failed-only" => Some(Self::FailedOnly),
            _ => None,
        }
    }

    /// Whether a persisted record should be re-driven under this strategy.
    pub fn selects(&self, status: OutcomeStatus) -> bool {
        match self {
            Self::Pending => status != OutcomeStatus::Completed,
            Self::FailedOnly => {
                matches!(status, OutcomeStatus::Failed | OutcomeStatus::Error)
            }
        }
    }
}

/// Final per-goal record in the summary document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub index: usize,
    pub goal: String,
    pub status: OutcomeStatus,
    pub master_spec: Option<String>,
    pub sub_spec_count: usize,
    pub error: Option<String>,
    /// Round at which this goal last ran (1 = initial round)
    pub batch_attempt: u32,
    #[serde(default)]
    pub wait_ticks: u64,
    #[serde(default)]
    pub base_priority: u32,
    #[serde(default = "default_goal_weight")]
    pub goal_weight: u32,
}

const fn default_goal_weight() -> u32 {
    1
}

/// Retry section of the summary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRetryReport {
    pub strategy: RetryStrategy,
    pub configured_rounds: u32,
    pub until_complete: bool,
    pub max_rounds: u32,
    pub performed_rounds: u32,
    pub exhausted: bool,
    pub rounds: Vec<RoundResult>,
}

impl BatchRetryReport {
    pub fn from_plan(plan: &RetryPlan) -> Self {
        Self {
            strategy: plan.strategy,
            configured_rounds: plan.configured_rounds,
            until_complete: plan.until_complete,
            max_rounds: plan.max_rounds,
            performed_rounds: plan.performed_rounds,
            exhausted: plan.exhausted,
            rounds: plan.history.clone(),
        }
    }
}

/// Resource-plan section, enriched with end-of-run scheduler telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlanReport {
    #[serde(flatten)]
    pub plan: ResourcePlan,
    #[serde(default)]
    pub starvation_wait_events: u64,
}

/// Gate section: every attempted evaluation in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub attempts: Vec<GateEvaluation>,
}

/// Durable record of one batch invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub schema_version: u32,
    pub mode: String,
    /// `completed` when every goal completed, else `incomplete`
    pub status: String,
    pub total_goals: usize,
    pub processed_goals: usize,
    pub completed_goals: usize,
    pub failed_goals: usize,
    pub results: Vec<GoalRecord>,
    pub resource_plan: ResourcePlanReport,
    pub batch_retry: BatchRetryReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_gate: Option<GateReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_gate_effective: Option<GateEvaluation>,
    /// Wall-clock duration of the invocation
    pub elapsed_ms: u64,
}

impl BatchSummary {
    pub fn is_complete(&self) -> bool {
        self.failed_goals == 0
    }
}

/// Upgrade a persisted summary document to the current schema.
///
/// Version 0 documents (no `schema_version` field) predate the scheduler
/// telemetry fields on goal records; those fields default during
/// deserialization, so the upgrade only stamps the version.
pub fn migrate_summary(mut value: Value) -> DomainResult<BatchSummary> {
    let version = value
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    if version > SUMMARY_SCHEMA_VERSION {
        return Err(DomainError::UnsupportedSchemaVersion {
            found: version,
            supported: SUMMARY_SCHEMA_VERSION,
        });
    }

    if version < SUMMARY_SCHEMA_VERSION {
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "schema_version".to_string(),
                Value::from(SUMMARY_SCHEMA_VERSION),
            );
        }
    }

    let summary: BatchSummary = serde_json::from_value(value)?;
    Ok(summary)
}
