//! Priority/aging scheduler.
//!
//! Orders a goal set by strategy and aging, and accounts for wait ticks
//! and starvation. The scheduler is pure ordering plus annotation: it
//! performs no I/O and holds no ambient state. All mutable bookkeeping
//! lives in an explicit [`SchedulerState`] value owned by the caller, so
//! the admission rule stays unit-testable in isolation.

use serde::{Deserialize, Serialize};

use crate::domain::models::{Goal, GoalStatus, SchedulingStrategy};

use super::complexity;

/// Explicit scheduler bookkeeping, passed through each scheduling step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerState {
    /// Dispatch ticks performed so far
    pub ticks: u64,
    /// Ticks where a goal that would fit waited behind a blocked heavier one
    pub starvation_wait_events: u64,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    pub fn record_starvation_wait(&mut self) {
        self.starvation_wait_events += 1;
    }
}

/// Assign base priorities according to the scheduling strategy.
///
/// - `fifo`: all equal, so submission order wins.
/// - `complex-first`: heavier complexity weight sorts earlier.
/// - `complex-last`: lighter complexity weight sorts earlier.
/// - `critical-first`: criticality-keyword score sorts earlier.
pub fn assign_base_priorities(goals: &mut [Goal], strategy: SchedulingStrategy) {
    match strategy {
        SchedulingStrategy::Fifo => {
            for goal in goals.iter_mut() {
                goal.base_priority = 0;
            }
        }
        SchedulingStrategy::ComplexFirst => {
            for goal in goals.iter_mut() {
                goal.base_priority = goal.complexity_weight;
            }
        }
        SchedulingStrategy::ComplexLast => {
            let max_weight = goals.iter().map(|g| g.complexity_weight).max().unwrap_or(1);
            for goal in goals.iter_mut() {
                goal.base_priority = max_weight - goal.complexity_weight;
            }
        }
        SchedulingStrategy::CriticalFirst => {
            for goal in goals.iter_mut() {
                goal.base_priority = complexity::criticality_score(&goal.text);
            }
        }
    }
}

/// Dispatch order over the pending goals of `goals`.
///
/// Returns positions into `goals`, stable-sorted by descending adjusted
/// priority (`base + aging_factor * wait_ticks`) with the position itself
/// as tiebreak.
pub fn dispatch_order(goals: &[Goal], aging_factor: u64) -> Vec<usize> {
    let mut order: Vec<usize> = goals
        .iter()
        .enumerate()
        .filter(|(_, g)| g.status == GoalStatus::Pending)
        .map(|(pos, _)| pos)
        .collect();
    order.sort_by_key(|&pos| {
        (
            std::cmp::Reverse(goals[pos].adjusted_priority(aging_factor)),
            pos,
        )
    });
    order
}

/// Record one wait tick on every goal skipped this tick.
pub fn age_skipped(goals: &mut [Goal], skipped: &[usize]) {
    for &pos in skipped {
        goals[pos].wait_ticks += 1;
    }
}
