//! Executor port - interface to the external goal executor.
//!
//! The executor turns one goal string into a completed or failed
//! specification artifact. Drover never inspects how the artifact is
//! produced; it only consumes the report.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// Options passed to the executor for one goal attempt.
///
/// This is a closed struct: every option the executor understands has a
/// named, typed field with a documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorOptions {
    /// Parallelism granted to this one goal (default 1)
    pub max_parallel: u32,
    /// Suppress executor progress output (default false)
    pub quiet: bool,
    /// Ask the executor to resume prior partial work for this goal
    /// (default false)
    pub resume: bool,
    /// 1-based attempt number, for executor-side bookkeeping (default 1)
    pub attempt: u32,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            quiet: false,
            resume: false,
            attempt: 1,
        }
    }
}

/// Terminal status the executor reports for a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    /// Planning finished but nothing was produced
    Planned,
    /// Preparation finished but execution never started
    Prepared,
}

impl ExecutionStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Artifact set produced for one goal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecPortfolio {
    /// Identifier of the master spec document
    pub master_spec: Option<String>,
    /// Identifiers of the produced sub-specs
    #[serde(default)]
    pub sub_specs: Vec<String>,
}

/// Rate-limit counters the executor observed while running a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitReport {
    pub signal_count: u32,
    pub total_backoff_ms: u64,
    pub last_launch_hold_ms: u64,
}

/// Executor-internal orchestration telemetry, surfaced when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationReport {
    #[serde(default)]
    pub rate_limit: RateLimitReport,
}

/// Full report for one goal attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub portfolio: SpecPortfolio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestration: Option<OrchestrationReport>,
}

/// Trait for goal executor implementations.
///
/// An implementation may reject a call outright (an `Err`); the round
/// runner converts that into an `error` outcome rather than letting it
/// escape the round.
#[async_trait]
pub trait GoalExecutor: Send + Sync {
    /// Get the executor type name.
    fn name(&self) -> &'static str;

    /// Execute one goal attempt to completion.
    async fn execute(
        &self,
        goal_text: &str,
        options: &ExecutorOptions,
    ) -> DomainResult<ExecutionReport>;
}
