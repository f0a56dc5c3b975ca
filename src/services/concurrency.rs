//! Resource-budgeted concurrency control.
//!
//! Maps an abstract agent budget and a parallelism request to an effective
//! number of simultaneous execution slots, optionally weighted by per-goal
//! complexity. The controller is pure state: the round runner polls
//! [`AdmissionState`] on every goal-slot event; there are no timers and no
//! I/O here.

use std::collections::HashMap;

use crate::domain::models::{ComplexitySummary, ResourcePlan, SchedulingStrategy};

/// Computes a [`ResourcePlan`] from the current policy inputs.
pub struct ResourcePlanner;

impl ResourcePlanner {
    /// Plan one round's concurrency.
    ///
    /// `ordered_weights` must be in dispatch order (highest priority
    /// first); `max_concurrent_goals` is the largest admissible prefix of
    /// that ordering.
    pub fn plan(
        ordered_weights: &[u32],
        agent_budget: Option<u32>,
        requested_parallel: u32,
        strategy: SchedulingStrategy,
        aging_factor: u64,
    ) -> ResourcePlan {
        let effective_parallel = match agent_budget {
            Some(budget) => requested_parallel.min(budget).max(1),
            None => requested_parallel.max(1),
        };

        let per_goal_max_parallel =
            agent_budget.map(|budget| (budget / effective_parallel).max(1));

        let weighted_scheduling_enabled =
            agent_budget.is_some() && ordered_weights.iter().any(|w| *w > 1);

        let max_concurrent_goals = if weighted_scheduling_enabled {
            let budget = agent_budget.unwrap_or(u32::MAX);
            let mut sum = 0_u64;
            let mut admissible = 0_u32;
            for weight in ordered_weights {
                sum += u64::from(*weight);
                if sum > u64::from(budget) {
                    break;
                }
                admissible += 1;
            }
            admissible.clamp(1, effective_parallel)
        } else {
            effective_parallel.min(ordered_weights.len().try_into().unwrap_or(u32::MAX))
        };

        ResourcePlan {
            agent_budget,
            requested_parallel,
            effective_parallel,
            per_goal_max_parallel,
            scheduling_strategy: strategy,
            aging_factor,
            weighted_scheduling_enabled,
            max_concurrent_goals,
            goal_complexity: ComplexitySummary::from_weights(ordered_weights),
        }
    }
}

/// Slot accounting for one round.
///
/// Admission is incremental: a goal is dispatched only if the running
/// set's weight sum stays within the agent budget. A goal whose own
/// weight exceeds the budget is admitted when the running set is empty
/// (its charged weight is clamped to the budget), so the fleet cannot
/// deadlock on one oversized goal.
#[derive(Debug, Clone)]
pub struct AdmissionState {
    max_slots: u32,
    agent_budget: Option<u32>,
    weighted: bool,
    running: HashMap<usize, u32>,
    running_weight: u64,
}

impl AdmissionState {
    /// Build admission state from a computed plan.
    pub fn from_plan(plan: &ResourcePlan) -> Self {
        Self {
            max_slots: plan.effective_parallel,
            agent_budget: plan.agent_budget,
            weighted: plan.weighted_scheduling_enabled,
            running: HashMap::new(),
            running_weight: 0,
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn running_weight(&self) -> u64 {
        self.running_weight
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    /// Weight the budget would charge for this goal.
    fn charged_weight(&self, weight: u32) -> u32 {
        match self.agent_budget {
            Some(budget) if self.weighted => weight.min(budget),
            _ => weight,
        }
    }

    /// Whether a goal of this weight would fit the remaining budget right
    /// now, ignoring dispatch order.
    pub fn would_fit(&self, weight: u32) -> bool {
        if self.running.len() >= self.max_slots as usize {
            return false;
        }
        if !self.weighted {
            return true;
        }
        let budget = u64::from(self.agent_budget.unwrap_or(u32::MAX));
        if self.running.is_empty() {
            return true;
        }
        self.running_weight + u64::from(self.charged_weight(weight)) <= budget
    }

    /// Try to admit a goal; returns `false` when it must keep waiting.
    pub fn try_admit(&mut self, key: usize, weight: u32) -> bool {
        if !self.would_fit(weight) {
            return false;
        }
        let charged = self.charged_weight(weight);
        self.running.insert(key, charged);
        self.running_weight += u64::from(charged);
        true
    }

    /// Release a finished goal's slot and weight.
    pub fn release(&mut self, key: usize) {
        if let Some(weight) = self.running.remove(&key) {
            self.running_weight -= u64::from(weight);
        }
    }
}
