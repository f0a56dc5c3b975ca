//! Resource plan model.
//!
//! A [`ResourcePlan`] is computed once per round from the current policy
//! inputs and is immutable within that round. Governance patches cause a
//! recompute before the next round.

use serde::{Deserialize, Serialize};

/// Order in which a goal set is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingStrategy {
    /// Submission order
    Fifo,
    /// Heaviest complexity weight first
    ComplexFirst,
    /// Lightest complexity weight first
    ComplexLast,
    /// Criticality-keyword score first
    CriticalFirst,
}

impl Default for SchedulingStrategy {
    fn default() -> Self {
        Self::Fifo
    }
}

impl SchedulingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fifo => "fifo",
            Self::ComplexFirst => "complex-first",
            Self::ComplexLast => "complex-last",
            Self::CriticalFirst => "critical-first",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fifo" => Some(Self::Fifo),
            "complex-first" => Some(Self::ComplexFirst),
            "complex-last" => Some(Self::ComplexLast),
            "critical-first" => Some(Self::CriticalFirst),
            _ => None,
        }
    }
}

/// Min/max/average of the goal set's complexity weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySummary {
    pub min: u32,
    pub max: u32,
    pub avg: f64,
}

impl ComplexitySummary {
    /// Summarize a weight set. Empty input yields zeros.
    pub fn from_weights(weights: &[u32]) -> Self {
        if weights.is_empty() {
            return Self { min: 0, max: 0, avg: 0.0 };
        }
        let min = *weights.iter().min().unwrap_or(&0);
        let max = *weights.iter().max().unwrap_or(&0);
        let sum: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        #[allow(clippy::cast_precision_loss)]
        let avg = sum as f64 / weights.len() as f64;
        Self { min, max, avg }
    }
}

/// Concurrency and pacing plan for one scheduling round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlan {
    /// Abstract capacity bound on concurrent agent-equivalents, if set
    pub agent_budget: Option<u32>,
    /// Parallelism the caller asked for
    pub requested_parallel: u32,
    /// Simultaneous goal slots actually granted
    pub effective_parallel: u32,
    /// Per-goal executor parallelism cap; `None` when unconstrained
    pub per_goal_max_parallel: Option<u32>,
    pub scheduling_strategy: SchedulingStrategy,
    pub aging_factor: u64,
    /// Weight-sum admission is active (budget set and any weight > 1)
    pub weighted_scheduling_enabled: bool,
    /// Largest admissible prefix of the priority-ordered goal set
    pub max_concurrent_goals: u32,
    pub goal_complexity: ComplexitySummary,
}
