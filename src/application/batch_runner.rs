//! Batch runner.
//!
//! Drives one batch invocation end to end: complexity scoring, resource
//! planning, the initial round, retry rounds under the configured policy,
//! gate evaluation, and assembly of the durable summary document.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    BatchRetryReport, BatchSummary, GateActuals, GateEvaluation, GateOverrides,
    GateProfile, GateProfileOverrides, GateReport, Goal, GoalOutcome, GoalRecord, OutcomeStatus,
    ResourcePlan, ResourcePlanReport, ResumeStrategy, RetryPlan, RetryStrategy, RiskLevel,
    SchedulingStrategy, SUMMARY_SCHEMA_VERSION,
};
use crate::domain::ports::GoalExecutor;
use crate::services::complexity;
use crate::services::concurrency::ResourcePlanner;
use crate::services::gate::ConvergenceGate;
use crate::services::retry;
use crate::services::scheduler::{self, SchedulerState};

use super::round_runner::{RoundConfig, RoundRunner};

/// Retry policy for one batch invocation.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub strategy: RetryStrategy,
    /// Additional rounds when `until_complete` is off (0-5)
    pub rounds: u32,
    pub until_complete: bool,
    /// Round ceiling when `until_complete` is on (1-20)
    pub max_rounds: u32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Adaptive,
            rounds: 1,
            until_complete: false,
            max_rounds: 0,
        }
    }
}

/// Gate policy inputs for one batch invocation.
#[derive(Debug, Clone)]
pub struct GateOptions {
    pub profile: GateProfile,
    /// Ordered fallback profiles tried after `profile`
    pub fallback: Vec<GateProfile>,
    /// Explicit CLI thresholds (highest precedence)
    pub overrides: GateOverrides,
    /// Per-profile configuration overrides (between defaults and CLI)
    pub config_overrides: GateProfileOverrides,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            profile: GateProfile::Standard,
            fallback: vec![],
            overrides: GateOverrides::default(),
            config_overrides: GateProfileOverrides::default(),
        }
    }
}

/// Tunables for one batch invocation.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrent goal slots requested (1-20)
    pub parallel: u32,
    /// Agent budget (1-500); absent means unbudgeted
    pub agent_budget: Option<u32>,
    pub strategy: SchedulingStrategy,
    /// Priority units per wait tick (0-100)
    pub aging_factor: u64,
    pub continue_on_error: bool,
    pub retry: RetryOptions,
    /// Gate evaluation after the run; absent skips the gate
    pub gate: Option<GateOptions>,
    /// Pass `--quiet` through to the executor
    pub quiet: bool,
    /// Mark executor calls as resuming prior partial work
    pub resume: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: 2,
            agent_budget: None,
            strategy: SchedulingStrategy::Fifo,
            aging_factor: 0,
            continue_on_error: true,
            retry: RetryOptions::default(),
            gate: None,
            quiet: false,
            resume: false,
        }
    }
}

/// Drives goal fleets through the executor to a durable summary.
pub struct BatchRunner {
    runner: RoundRunner,
}

impl BatchRunner {
    pub fn new(executor: Arc<dyn GoalExecutor>) -> Self {
        Self {
            runner: RoundRunner::new(executor),
        }
    }

    /// Run a fresh batch over the given goal texts.
    pub async fn run(
        &self,
        goal_texts: &[String],
        options: &BatchOptions,
    ) -> DomainResult<BatchSummary> {
        let goals = goal_texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                Goal::new(index, text.clone()).with_weight(complexity::complexity_weight(text))
            })
            .collect();
        self.run_goals(goals, Vec::new(), options).await
    }

    /// Re-drive a persisted summary under the given resume strategy.
    ///
    /// Selected goals are re-run; everything else is carried forward into
    /// the new summary unchanged.
    pub async fn resume(
        &self,
        prior: &BatchSummary,
        strategy: ResumeStrategy,
        options: &BatchOptions,
    ) -> DomainResult<BatchSummary> {
        let mut goals = Vec::new();
        let mut carried = Vec::new();
        for record in &prior.results {
            if strategy.selects(record.status) {
                goals.push(
                    Goal::new(record.index, record.goal.clone())
                        .with_weight(record.goal_weight),
                );
            } else {
                carried.push(record.clone());
            }
        }
        info!(
            strategy = strategy.as_str(),
            selected = goals.len(),
            carried = carried.len(),
            "resuming batch"
        );
        let mut resumed_options = options.clone();
        resumed_options.resume = true;
        self.run_goals(goals, carried, &resumed_options).await
    }

    /// Core loop shared by fresh runs and resumes.
    pub(crate) async fn run_goals(
        &self,
        mut goals: Vec<Goal>,
        carried: Vec<GoalRecord>,
        options: &BatchOptions,
    ) -> DomainResult<BatchSummary> {
        let started = Instant::now();
        let total_goals = goals.len() + carried.len();

        let mut retry_plan = RetryPlan::new(
            options.retry.strategy,
            options.retry.rounds,
            options.retry.until_complete,
            options.retry.max_rounds,
        );
        let mut sched_state = SchedulerState::new();

        // Latest outcome and the round it was produced in, per goal index.
        let mut latest: HashMap<usize, (GoalOutcome, u32)> = HashMap::new();

        let mut current_parallel = options.parallel;
        let mut current_budget = options.agent_budget;
        let mut initial_plan: Option<ResourcePlan> = None;
        let mut round_number: u32 = 1;

        while !goals.is_empty() {
            scheduler::assign_base_priorities(&mut goals, options.strategy);
            let plan = self.plan_round(&goals, current_budget, current_parallel, options);
            if initial_plan.is_none() {
                initial_plan = Some(plan.clone());
            }

            let continue_on_error = if round_number == 1 {
                options.continue_on_error
            } else {
                retry::retry_continue_on_error(options.retry.strategy, options.continue_on_error)
            };

            let config = RoundConfig {
                round_number,
                continue_on_error,
                plan,
                quiet: options.quiet,
                resume: options.resume,
            };

            info!(
                round = round_number,
                goals = goals.len(),
                parallel = config.plan.effective_parallel,
                budget = ?config.plan.agent_budget,
                "starting round"
            );

            let mut result = self.runner.run(&mut goals, &config, &mut sched_state).await;
            for outcome in &result.outcomes {
                latest.insert(outcome.goal_index, (outcome.clone(), round_number));
            }
            let failed_count = result.failed_count();

            // Adaptive backpressure: observed rate-limit pressure shrinks
            // the next round's limits before re-entering planning.
            if options.retry.strategy == RetryStrategy::Adaptive {
                if let Some((next_parallel, next_budget)) = retry::backpressure_reduction(
                    &result.rate_limit,
                    current_parallel,
                    current_budget,
                ) {
                    warn!(
                        signals = result.rate_limit.signal_count,
                        next_parallel,
                        next_budget = ?next_budget,
                        "rate-limit pressure observed, reducing next round limits"
                    );
                    result.adaptive_backpressure_applied = true;
                    result.next_round_parallel = Some(next_parallel);
                    result.next_round_agent_budget = next_budget;
                    current_parallel = next_parallel;
                    current_budget = next_budget;
                }
            }

            let retryable = result.retryable_indices();
            retry_plan.record_round(result);

            if !retry_plan.should_run_again(failed_count) {
                retry_plan.finalize(failed_count);
                break;
            }
            retry_plan.note_retry_round();

            // Only non-completed goals are resubmitted, in this round's
            // outcome order; attempts and wait ticks carry forward.
            let by_index: HashMap<usize, Goal> =
                goals.into_iter().map(|g| (g.index, g)).collect();
            goals = retryable
                .iter()
                .filter_map(|index| by_index.get(index))
                .map(|g| {
                    let mut goal = g.clone();
                    goal.status = crate::domain::models::GoalStatus::Pending;
                    goal
                })
                .collect();
            round_number += 1;
        }

        let elapsed = started.elapsed();
        let summary = self.build_summary(
            total_goals,
            carried,
            &latest,
            initial_plan,
            retry_plan,
            &sched_state,
            options,
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        );
        Ok(summary)
    }

    fn plan_round(
        &self,
        goals: &[Goal],
        budget: Option<u32>,
        parallel: u32,
        options: &BatchOptions,
    ) -> ResourcePlan {
        // Weights in dispatch order, so the admissible prefix reflects
        // what the scheduler will actually try first.
        let order = scheduler::dispatch_order(goals, options.aging_factor);
        let ordered_weights: Vec<u32> =
            order.iter().map(|&pos| goals[pos].complexity_weight).collect();
        ResourcePlanner::plan(
            &ordered_weights,
            budget,
            parallel,
            options.strategy,
            options.aging_factor,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_summary(
        &self,
        total_goals: usize,
        carried: Vec<GoalRecord>,
        latest: &HashMap<usize, (GoalOutcome, u32)>,
        initial_plan: Option<ResourcePlan>,
        retry_plan: RetryPlan,
        sched_state: &SchedulerState,
        options: &BatchOptions,
        elapsed_ms: u64,
    ) -> BatchSummary {
        let mut results: Vec<GoalRecord> = carried;
        for (outcome, round) in latest.values() {
            results.push(GoalRecord {
                index: outcome.goal_index,
                goal: outcome.goal_text.clone(),
                status: outcome.status,
                master_spec: outcome.master_spec.clone(),
                sub_spec_count: outcome.sub_spec_count,
                error: outcome.error.clone(),
                batch_attempt: *round,
                wait_ticks: outcome.wait_ticks,
                base_priority: outcome.base_priority,
                goal_weight: outcome.goal_weight,
            });
        }
        results.sort_by_key(|r| r.index);

        let completed_goals = results
            .iter()
            .filter(|r| r.status == OutcomeStatus::Completed)
            .count();
        let failed_goals = results.len() - completed_goals;
        let processed_goals = results
            .iter()
            .filter(|r| r.status != OutcomeStatus::Stopped)
            .count();

        let plan = initial_plan.unwrap_or_else(|| {
            ResourcePlanner::plan(&[], options.agent_budget, options.parallel, options.strategy, options.aging_factor)
        });

        let mut summary = BatchSummary {
            schema_version: SUMMARY_SCHEMA_VERSION,
            mode: "batch".to_string(),
            status: if failed_goals == 0 { "completed" } else { "incomplete" }.to_string(),
            total_goals,
            processed_goals,
            completed_goals,
            failed_goals,
            results,
            resource_plan: ResourcePlanReport {
                plan,
                starvation_wait_events: sched_state.starvation_wait_events,
            },
            batch_retry: BatchRetryReport::from_plan(&retry_plan),
            program_gate: None,
            program_gate_effective: None,
            elapsed_ms,
        };

        if let Some(gate_options) = &options.gate {
            let actuals = self.gate_actuals(&summary, options);
            let (report, effective) = evaluate_gate(gate_options, actuals);
            summary.program_gate = Some(report);
            summary.program_gate_effective = Some(effective);
        }

        summary
    }

    /// Aggregate actuals for the gate, measured from the finished run.
    fn gate_actuals(&self, summary: &BatchSummary, options: &BatchOptions) -> GateActuals {
        let saw_rate_limits = summary
            .batch_retry
            .rounds
            .iter()
            .any(|r| r.rate_limit.signal_count > 0);
        let risk_level = if summary.batch_retry.exhausted {
            RiskLevel::Critical
        } else if summary.failed_goals > 0 {
            RiskLevel::High
        } else if summary.batch_retry.performed_rounds > 0 || saw_rate_limits {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let total_sub_specs: usize = summary.results.iter().map(|r| r.sub_spec_count).sum();

        GateActuals {
            risk_level,
            agent_budget: options.agent_budget.unwrap_or(options.parallel),
            total_sub_specs: u32::try_from(total_sub_specs).unwrap_or(u32::MAX),
            elapsed_minutes: summary.elapsed_ms / 60_000,
        }
    }
}

/// Evaluate the configured gate (single policy or fallback chain).
pub fn evaluate_gate(
    options: &GateOptions,
    actuals: GateActuals,
) -> (GateReport, GateEvaluation) {
    let layers_for = |profile: GateProfile| {
        vec![options.config_overrides.for_profile(profile), options.overrides]
    };

    if options.fallback.is_empty() {
        let policy = crate::domain::models::GatePolicy::resolve(
            options.profile,
            &layers_for(options.profile),
        );
        let evaluation = ConvergenceGate::evaluate(policy, actuals);
        (
            GateReport { attempts: vec![evaluation.clone()] },
            evaluation,
        )
    } else {
        let mut profiles = vec![options.profile];
        profiles.extend(options.fallback.iter().copied());
        match ConvergenceGate::evaluate_chain(&profiles, layers_for, actuals) {
            Some(chain) => (GateReport { attempts: chain.attempts }, chain.effective),
            // The chain always has at least the primary profile; fall back
            // to a plain evaluation if it were ever empty.
            None => {
                let policy = crate::domain::models::GatePolicy::resolve(
                    options.profile,
                    &layers_for(options.profile),
                );
                let evaluation = ConvergenceGate::evaluate(policy, actuals);
                (
                    GateReport { attempts: vec![evaluation.clone()] },
                    evaluation,
                )
            }
        }
    }
}
