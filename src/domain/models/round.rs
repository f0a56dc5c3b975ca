//! Round results and per-goal outcomes.
//!
//! A [`RoundResult`] is one entry in the ordered round history of a batch
//! invocation; it is never mutated after creation. Every [`GoalOutcome`]
//! inside it carries a terminal status.

use serde::{Deserialize, Serialize};

/// Terminal status of one goal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed,
    Failed,
    Stopped,
    /// The executor rejected the call (raised an error)
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    /// Whether this outcome needs to be re-driven by a retry round.
    pub fn needs_retry(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Immutable record of one goal attempt within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalOutcome {
    /// Original submission index of the goal
    pub goal_index: usize,
    /// Goal text as submitted
    pub goal_text: String,
    /// 1-based attempt number at which this outcome was produced
    pub attempt: u32,
    pub status: OutcomeStatus,
    /// Master spec artifact identifier, when the executor produced one
    pub master_spec: Option<String>,
    pub sub_spec_count: usize,
    /// Executor error message for `error` outcomes
    pub error: Option<String>,
    pub wait_ticks: u64,
    pub base_priority: u32,
    pub goal_weight: u32,
}

/// Rate-limit telemetry aggregated across a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitTelemetry {
    /// Total rate-limit signals reported by the executor
    pub signal_count: u32,
    /// Sum of backoff time across all goals, in milliseconds
    pub total_backoff_ms: u64,
    /// Largest single launch hold observed, in milliseconds
    pub last_launch_hold_ms: u64,
}

impl RateLimitTelemetry {
    /// Fold one goal's reported telemetry into the round aggregate.
    pub fn absorb(&mut self, signal_count: u32, total_backoff_ms: u64, launch_hold_ms: u64) {
        self.signal_count += signal_count;
        self.total_backoff_ms += total_backoff_ms;
        self.last_launch_hold_ms = self.last_launch_hold_ms.max(launch_hold_ms);
    }
}

/// One full scheduling pass over a goal set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// 1-based round number within the batch invocation
    pub round_number: u32,
    pub continue_on_error: bool,
    /// Parallelism applied this round (after any backpressure reduction)
    pub applied_parallel: u32,
    /// Agent budget applied this round, if any
    pub applied_budget: Option<u32>,
    pub outcomes: Vec<GoalOutcome>,
    pub rate_limit: RateLimitTelemetry,
    /// Ticks where a goal that would fit waited behind a blocked heavier one
    pub starvation_wait_events: u64,
    /// Set when rate-limit signals caused the next round's limits to drop
    pub adaptive_backpressure_applied: bool,
    pub next_round_parallel: Option<u32>,
    pub next_round_agent_budget: Option<u32>,
}

impl RoundResult {
    pub fn completed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.needs_retry()).count()
    }

    /// Goal indices that must be re-driven, preserving this round's order.
    pub fn retryable_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|o| o.status.needs_retry())
            .map(|o| o.goal_index)
            .collect()
    }

    pub fn total_sub_specs(&self) -> usize {
        self.outcomes.iter().map(|o| o.sub_spec_count).sum()
    }
}
