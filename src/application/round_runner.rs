//! Execution round runner.
//!
//! Runs one scheduling pass of a goal set through the external executor.
//! Concurrency is enforced by admission accounting, not by a fixed worker
//! pool: executor calls run as tasks in a `JoinSet`, and a new goal is
//! dispatched only when the admission state grants it a slot. A
//! stop-on-error halt cancels dispatch of not-yet-started goals but never
//! preempts calls already in flight.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Goal, GoalOutcome, GoalStatus, OutcomeStatus, RateLimitTelemetry, ResourcePlan, RoundResult,
};
use crate::domain::ports::{ExecutionReport, ExecutorOptions, GoalExecutor};
use crate::services::concurrency::AdmissionState;
use crate::services::scheduler::{self, SchedulerState};

/// Inputs for one round.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    /// 1-based round number within the batch invocation
    pub round_number: u32,
    pub continue_on_error: bool,
    pub plan: ResourcePlan,
    /// Pass `--quiet` through to the executor
    pub quiet: bool,
    /// Ask the executor to resume prior partial work
    pub resume: bool,
}

/// Runs scheduling passes against an executor.
pub struct RoundRunner {
    executor: Arc<dyn GoalExecutor>,
}

impl RoundRunner {
    pub fn new(executor: Arc<dyn GoalExecutor>) -> Self {
        Self { executor }
    }

    /// Run one round over `goals`, mutating their statuses and wait ticks.
    ///
    /// Every goal in the slice reaches a terminal status before this
    /// returns; executor rejections become `error` outcomes rather than
    /// escaping the round.
    pub async fn run(
        &self,
        goals: &mut [Goal],
        config: &RoundConfig,
        state: &mut SchedulerState,
    ) -> RoundResult {
        let starvation_at_start = state.starvation_wait_events;
        let mut admission = AdmissionState::from_plan(&config.plan);
        let mut join_set: JoinSet<(usize, DomainResult<ExecutionReport>)> = JoinSet::new();
        let mut outcomes: HashMap<usize, GoalOutcome> = HashMap::new();
        let mut rate_limit = RateLimitTelemetry::default();
        let mut halted = false;

        loop {
            if !halted {
                self.fill_slots(goals, config, state, &mut admission, &mut join_set);
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };
            // Executor tasks never panic themselves; a join error would
            // mean the task was aborted, which this runner never does.
            let Ok((pos, result)) = joined else {
                warn!(round = config.round_number, "executor task aborted");
                continue;
            };
            admission.release(pos);

            let outcome = build_outcome(&goals[pos], result, &mut rate_limit);
            goals[pos].status = match outcome.status {
                OutcomeStatus::Completed => GoalStatus::Completed,
                _ => GoalStatus::Failed,
            };

            if !config.continue_on_error && outcome.status != OutcomeStatus::Completed && !halted {
                halted = true;
                debug!(
                    round = config.round_number,
                    goal = outcome.goal_index,
                    "halting dispatch after non-completed outcome"
                );
                for (pos, goal) in goals.iter_mut().enumerate() {
                    if goal.status == GoalStatus::Pending {
                        goal.status = GoalStatus::Stopped;
                        outcomes.insert(pos, stopped_outcome(goal));
                    }
                }
            }

            outcomes.insert(pos, outcome);
        }

        let mut ordered: Vec<GoalOutcome> = Vec::with_capacity(goals.len());
        for pos in 0..goals.len() {
            if let Some(outcome) = outcomes.remove(&pos) {
                ordered.push(outcome);
            }
        }

        RoundResult {
            round_number: config.round_number,
            continue_on_error: config.continue_on_error,
            applied_parallel: config.plan.effective_parallel,
            applied_budget: config.plan.agent_budget,
            outcomes: ordered,
            rate_limit,
            starvation_wait_events: state.starvation_wait_events - starvation_at_start,
            adaptive_backpressure_applied: false,
            next_round_parallel: None,
            next_round_agent_budget: None,
        }
    }

    /// One dispatch tick: admit pending goals in scheduler order until the
    /// admission state refuses, then age whatever was skipped.
    fn fill_slots(
        &self,
        goals: &mut [Goal],
        config: &RoundConfig,
        state: &mut SchedulerState,
        admission: &mut AdmissionState,
        join_set: &mut JoinSet<(usize, DomainResult<ExecutionReport>)>,
    ) {
        let order = scheduler::dispatch_order(goals, config.plan.aging_factor);
        if order.is_empty() {
            return;
        }

        let mut admitted_any = false;
        let mut blocked_at: Option<usize> = None;

        for (rank, &pos) in order.iter().enumerate() {
            if admission.try_admit(pos, goals[pos].complexity_weight) {
                admitted_any = true;
                self.spawn_goal(goals, pos, config, join_set);
            } else {
                // Admission is strict priority order: nothing may bypass a
                // blocked higher-priority goal.
                blocked_at = Some(rank);
                break;
            }
        }

        // Starvation accounting: goals behind the blocked head that would
        // fit the remaining capacity are waiting on a heavier goal, not on
        // capacity itself.
        if let Some(rank) = blocked_at {
            if !admission.is_idle() {
                for &pos in &order[rank + 1..] {
                    if admission.would_fit(goals[pos].complexity_weight) {
                        state.record_starvation_wait();
                    }
                }
            }
        }

        // A tick happened if anything is in flight; skipped pending goals
        // accrue one wait tick each.
        if admitted_any || !admission.is_idle() {
            state.record_tick();
            let skipped: Vec<usize> = goals
                .iter()
                .enumerate()
                .filter(|(_, g)| g.status == GoalStatus::Pending)
                .map(|(pos, _)| pos)
                .collect();
            scheduler::age_skipped(goals, &skipped);
        }
    }

    fn spawn_goal(
        &self,
        goals: &mut [Goal],
        pos: usize,
        config: &RoundConfig,
        join_set: &mut JoinSet<(usize, DomainResult<ExecutionReport>)>,
    ) {
        let goal = &mut goals[pos];
        goal.status = GoalStatus::Running;
        goal.attempt += 1;

        let options = ExecutorOptions {
            max_parallel: config
                .plan
                .per_goal_max_parallel
                .unwrap_or_else(|| config.plan.requested_parallel.max(1)),
            quiet: config.quiet,
            resume: config.resume,
            attempt: goal.attempt,
        };
        let text = goal.text.clone();
        let executor = Arc::clone(&self.executor);

        debug!(
            goal = goal.index,
            attempt = goal.attempt,
            weight = goal.complexity_weight,
            "dispatching goal"
        );

        join_set.spawn(async move {
            let result = executor.execute(&text, &options).await;
            (pos, result)
        });
    }
}

fn build_outcome(
    goal: &Goal,
    result: DomainResult<ExecutionReport>,
    rate_limit: &mut RateLimitTelemetry,
) -> GoalOutcome {
    match result {
        Ok(report) => {
            if let Some(orchestration) = report.orchestration {
                rate_limit.absorb(
                    orchestration.rate_limit.signal_count,
                    orchestration.rate_limit.total_backoff_ms,
                    orchestration.rate_limit.last_launch_hold_ms,
                );
            }
            let status = if report.status.is_completed() {
                OutcomeStatus::Completed
            } else {
                OutcomeStatus::Failed
            };
            GoalOutcome {
                goal_index: goal.index,
                goal_text: goal.text.clone(),
                attempt: goal.attempt,
                status,
                master_spec: report.portfolio.master_spec,
                sub_spec_count: report.portfolio.sub_specs.len(),
                error: None,
                wait_ticks: goal.wait_ticks,
                base_priority: goal.base_priority,
                goal_weight: goal.complexity_weight,
            }
        }
        Err(err) => GoalOutcome {
            goal_index: goal.index,
            goal_text: goal.text.clone(),
            attempt: goal.attempt,
            status: OutcomeStatus::Error,
            master_spec: None,
            sub_spec_count: 0,
            error: Some(err.to_string()),
            wait_ticks: goal.wait_ticks,
            base_priority: goal.base_priority,
            goal_weight: goal.complexity_weight,
        },
    }
}

fn stopped_outcome(goal: &Goal) -> GoalOutcome {
    GoalOutcome {
        goal_index: goal.index,
        goal_text: goal.text.clone(),
        attempt: goal.attempt,
        status: OutcomeStatus::Stopped,
        master_spec: None,
        sub_spec_count: 0,
        error: None,
        wait_ticks: goal.wait_ticks,
        base_priority: goal.base_priority,
        goal_weight: goal.complexity_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::executor::mock::{MockExecutor, MockOutcome};
    use crate::domain::models::SchedulingStrategy;
    use crate::services::concurrency::ResourcePlanner;

    fn make_goals(texts: &[&str]) -> Vec<Goal> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Goal::new(i, *t).with_weight(crate::services::complexity::complexity_weight(t))
            })
            .collect()
    }

    fn config_for(goals: &[Goal], budget: Option<u32>, parallel: u32) -> RoundConfig {
        let weights: Vec<u32> = goals.iter().map(|g| g.complexity_weight).collect();
        RoundConfig {
            round_number: 1,
            continue_on_error: true,
            plan: ResourcePlanner::plan(&weights, budget, parallel, SchedulingStrategy::Fifo, 0),
            quiet: true,
            resume: false,
        }
    }

    #[tokio::test]
    async fn test_all_goals_reach_terminal_status() {
        let executor = Arc::new(MockExecutor::new());
        let runner = RoundRunner::new(executor);
        let mut goals = make_goals(&["alpha", "beta", "gamma"]);
        let config = config_for(&goals, None, 2);
        let mut state = SchedulerState::new();

        let result = runner.run(&mut goals, &config, &mut state).await;

        assert_eq!(result.outcomes.len(), 3);
        assert!(goals.iter().all(|g| g.status.is_terminal()));
        assert_eq!(result.completed_count(), 3);
    }

    #[tokio::test]
    async fn test_executor_rejection_becomes_error_outcome() {
        let executor = Arc::new(MockExecutor::new());
        executor
            .script("beta", vec![MockOutcome::reject("quota exceeded")])
            .await;
        let runner = RoundRunner::new(executor);
        let mut goals = make_goals(&["alpha", "beta"]);
        let config = config_for(&goals, None, 2);
        let mut state = SchedulerState::new();

        let result = runner.run(&mut goals, &config, &mut state).await;

        let beta = result.outcomes.iter().find(|o| o.goal_index == 1).unwrap();
        assert_eq!(beta.status, OutcomeStatus::Error);
        assert!(beta.error.as_deref().unwrap().contains("quota exceeded"));
        // The other goal is unaffected by the rejection.
        let alpha = result.outcomes.iter().find(|o| o.goal_index == 0).unwrap();
        assert_eq!(alpha.status, OutcomeStatus::Completed);
    }

    #[tokio::test]
    async fn test_stop_on_error_marks_rest_stopped() {
        let executor = Arc::new(MockExecutor::new());
        executor.script("alpha", vec![MockOutcome::failed()]).await;
        let runner = RoundRunner::new(executor);
        let mut goals = make_goals(&["alpha", "beta", "gamma"]);
        let mut config = config_for(&goals, None, 1);
        config.continue_on_error = false;
        let mut state = SchedulerState::new();

        let result = runner.run(&mut goals, &config, &mut state).await;

        assert_eq!(result.outcomes[0].status, OutcomeStatus::Failed);
        assert_eq!(result.outcomes[1].status, OutcomeStatus::Stopped);
        assert_eq!(result.outcomes[2].status, OutcomeStatus::Stopped);
        // Stopped goals were never attempted.
        assert_eq!(result.outcomes[1].attempt, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_telemetry_aggregates() {
        let executor = Arc::new(MockExecutor::new());
        executor
            .script("alpha", vec![MockOutcome::completed(1).with_rate_limit(2, 300, 120)])
            .await;
        executor
            .script("beta", vec![MockOutcome::completed(1).with_rate_limit(1, 200, 80)])
            .await;
        let runner = RoundRunner::new(executor);
        let mut goals = make_goals(&["alpha", "beta"]);
        let config = config_for(&goals, None, 2);
        let mut state = SchedulerState::new();

        let result = runner.run(&mut goals, &config, &mut state).await;

        assert_eq!(result.rate_limit.signal_count, 3);
        assert_eq!(result.rate_limit.total_backoff_ms, 500);
        assert_eq!(result.rate_limit.last_launch_hold_ms, 120);
    }

    #[tokio::test]
    async fn test_weighted_budget_serializes_heavy_goals() {
        let executor = Arc::new(MockExecutor::new());
        let runner = RoundRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);
        // "orchestrate the integration test pipeline" scores weight 3;
        // "write docs" floors at 1.
        let mut goals = make_goals(&["orchestrate the integration test pipeline", "write docs"]);
        let config = config_for(&goals, Some(2), 2);
        let mut state = SchedulerState::new();

        let result = runner.run(&mut goals, &config, &mut state).await;

        assert_eq!(result.completed_count(), 2);
        // The weight-3 goal occupied the whole budget: never two in flight.
        assert_eq!(executor.max_in_flight().await, 1);
        // The light goal had to wait at least one tick.
        let light = result.outcomes.iter().find(|o| o.goal_index == 1).unwrap();
        assert!(light.wait_ticks > 0);
    }
}
