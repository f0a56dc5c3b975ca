//! Goal domain model.
//!
//! A goal is one unit of autonomous work submitted to the external executor,
//! expected to yield a specification artifact (one master spec plus zero or
//! more sub-specs).

use serde::{Deserialize, Serialize};

/// Status of a goal within a scheduling round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Goal is queued, waiting for an execution slot
    Pending,
    /// Goal's executor call is in flight
    Running,
    /// Executor produced a completed artifact
    Completed,
    /// Executor reported failure (or a non-completed terminal status)
    Failed,
    /// Dispatch was cancelled by a stop-on-error halt before the goal started
    Stopped,
}

impl Default for GoalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

/// One unit of autonomous work in a batch.
///
/// `text` and `complexity_weight` are immutable once computed; `status`,
/// `wait_ticks`, and `attempt` are mutated only by the scheduler and the
/// round runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Original position in the submitted goal list (stable tiebreak)
    pub index: usize,
    /// The goal statement handed to the executor
    pub text: String,
    /// Keyword-category complexity weight (floor 1)
    pub complexity_weight: u32,
    /// Strategy-assigned base priority
    pub base_priority: u32,
    /// Scheduling ticks this goal was skipped for a higher-priority one
    pub wait_ticks: u64,
    /// Current status
    pub status: GoalStatus,
    /// Attempt counter, incremented each time the executor is invoked
    pub attempt: u32,
}

impl Goal {
    /// Create a pending goal at the given submission index.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            complexity_weight: 1,
            base_priority: 0,
            wait_ticks: 0,
            status: GoalStatus::Pending,
            attempt: 0,
        }
    }

    /// Set the computed complexity weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.complexity_weight = weight.max(1);
        self
    }

    /// Priority after aging: `base_priority + aging_factor * wait_ticks`.
    pub fn adjusted_priority(&self, aging_factor: u64) -> u64 {
        u64::from(self.base_priority) + aging_factor * self.wait_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_goal_is_pending() {
        let goal = Goal::new(0, "Build the ingestion pipeline");
        assert_eq!(goal.status, GoalStatus::Pending);
        assert_eq!(goal.attempt, 0);
        assert_eq!(goal.complexity_weight, 1);
    }

    #[test]
    fn test_weight_floor_is_one() {
        let goal = Goal::new(0, "x").with_weight(0);
        assert_eq!(goal.complexity_weight, 1);
    }

    #[test]
    fn test_adjusted_priority_ages_with_wait_ticks() {
        let mut goal = Goal::new(0, "x");
        goal.base_priority = 3;
        goal.wait_ticks = 4;
        assert_eq!(goal.adjusted_priority(0), 3);
        assert_eq!(goal.adjusted_priority(2), 11);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!GoalStatus::Pending.is_terminal());
        assert!(!GoalStatus::Running.is_terminal());
        assert!(GoalStatus::Completed.is_terminal());
        assert!(GoalStatus::Failed.is_terminal());
        assert!(GoalStatus::Stopped.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            GoalStatus::Pending,
            GoalStatus::Running,
            GoalStatus::Completed,
            GoalStatus::Failed,
            GoalStatus::Stopped,
        ] {
            assert_eq!(GoalStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(GoalStatus::from_str("complete"), Some(GoalStatus::Completed));
        assert_eq!(GoalStatus::from_str("bogus"), None);
    }
}
