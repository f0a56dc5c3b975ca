//! Governance close-loop controller.
//!
//! The outer control loop: on a failed convergence gate it derives a
//! remediation patch (budget/strategy/parallelism change), re-drives the
//! batch pipeline, re-evaluates the gate, and repeats until the gate
//! stabilizes, the round/time budget runs out, or an external release
//! gate blocks further patching. The session is persisted after every
//! round so a process restart can resume at the next round.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    BatchSummary, GateEvaluation, GovernancePatch, GovernanceRound, GovernanceSession,
    GovernanceState, GovernanceTrigger, PolicySnapshot, ReleaseGateReport, RemediationAction,
    RemediationMode, ResumeStrategy, RetryStrategy, RiskLevel, StopReason, REMEDIATION_ACTIONS,
};
use crate::domain::ports::{DocumentStore, GoalExecutor};

use super::batch_runner::{BatchOptions, BatchRunner};

/// External release-gate precondition consulted before each round.
#[async_trait]
pub trait ReleaseGateCheck: Send + Sync {
    async fn check(&self) -> DomainResult<ReleaseGateReport>;
}

/// External anomaly signal (e.g. a rate-limit spike detector).
#[async_trait]
pub trait AnomalySignal: Send + Sync {
    async fn anomaly_failed(&self) -> bool;
}

/// Tunables for one governance invocation.
#[derive(Debug, Clone)]
pub struct GovernanceOptions {
    /// Risk ceiling folded into the gate policy
    pub target_risk: RiskLevel,
    /// Remediation round ceiling (1-20)
    pub max_rounds: u32,
    /// Wall-clock budget in minutes (1-1440)
    pub max_minutes: u64,
    /// Stop after this many rounds with an unchanged gate reason set;
    /// 0 disables plateau detection
    pub plateau_rounds: u32,
    pub mode: RemediationMode,
    /// Pin the recover-cycle action instead of auto-selecting
    pub pinned_action: Option<usize>,
    pub session_file: PathBuf,
    /// Accept a resumed session whose policy conflicts with the caller's
    pub allow_policy_drift: bool,
}

impl Default for GovernanceOptions {
    fn default() -> Self {
        Self {
            target_risk: RiskLevel::Medium,
            max_rounds: 3,
            max_minutes: 60,
            plateau_rounds: 3,
            mode: RemediationMode::ProgramReplay,
            pinned_action: None,
            session_file: PathBuf::from(".drover/governance-session.json"),
            allow_policy_drift: false,
        }
    }
}

/// The outer governance state machine.
pub struct GovernanceController {
    batch: BatchRunner,
    store: Arc<dyn DocumentStore>,
    release_gate: Option<Arc<dyn ReleaseGateCheck>>,
    anomaly: Option<Arc<dyn AnomalySignal>>,
}

impl GovernanceController {
    pub fn new(executor: Arc<dyn GoalExecutor>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            batch: BatchRunner::new(executor),
            store,
            release_gate: None,
            anomaly: None,
        }
    }

    /// Attach an external release-gate precondition.
    pub fn with_release_gate(mut self, gate: Arc<dyn ReleaseGateCheck>) -> Self {
        self.release_gate = Some(gate);
        self
    }

    /// Attach an external anomaly signal.
    pub fn with_anomaly_signal(mut self, signal: Arc<dyn AnomalySignal>) -> Self {
        self.anomaly = Some(signal);
        self
    }

    /// Run a fresh governance session to a terminal state.
    pub async fn run(
        &self,
        goal_texts: &[String],
        batch_options: &BatchOptions,
        options: &GovernanceOptions,
    ) -> DomainResult<GovernanceSession> {
        let mut current = with_governance_gate(batch_options, options);
        let mut session = GovernanceSession::new(snapshot_of(&current, options));
        session.state = GovernanceState::Running;

        info!(session = %session.id, "starting governance session");

        // Baseline run: not counted as a governance round.
        let summary = self.batch.run(goal_texts, &current).await?;
        let gate = effective_gate(&summary)?;
        self.store.save_session(&options.session_file, &session).await?;

        if gate.passed {
            session.finish(GovernanceState::Converged, StopReason::Converged);
            self.store.save_session(&options.session_file, &session).await?;
            return Ok(session);
        }

        self.drive_rounds(
            &mut session,
            goal_texts,
            &mut current,
            options,
            summary,
            gate.reasons,
        )
        .await?;
        Ok(session)
    }

    /// Resume a persisted session, enforcing the drift guard.
    pub async fn resume(
        &self,
        goal_texts: &[String],
        batch_options: &BatchOptions,
        options: &GovernanceOptions,
    ) -> DomainResult<GovernanceSession> {
        let prior = self.store.load_session(&options.session_file).await?;
        let mut current = with_governance_gate(batch_options, options);
        let requested = snapshot_of(&current, options);
        check_policy_drift(&prior, &requested, options.allow_policy_drift)?;

        let mut session = GovernanceSession::resumed(&prior);
        session.state = GovernanceState::Running;
        info!(
            session = %session.id,
            resumed_from = %prior.id,
            performed = session.performed_rounds,
            "resuming governance session"
        );

        if session.performed_rounds >= options.max_rounds {
            session.finish(GovernanceState::Exhausted, StopReason::MaxRoundsExhausted);
            self.store.save_session(&options.session_file, &session).await?;
            return Ok(session);
        }

        // Re-establish the baseline from a fresh run; the prior summary is
        // not carried across process restarts.
        let summary = self.batch.run(goal_texts, &current).await?;
        let gate = effective_gate(&summary)?;
        if gate.passed {
            session.finish(GovernanceState::Converged, StopReason::Converged);
            self.store.save_session(&options.session_file, &session).await?;
            return Ok(session);
        }

        self.drive_rounds(
            &mut session,
            goal_texts,
            &mut current,
            options,
            summary,
            gate.reasons,
        )
        .await?;
        Ok(session)
    }

    /// Remediation rounds until converged, exhausted, blocked, or plateaued.
    async fn drive_rounds(
        &self,
        session: &mut GovernanceSession,
        goal_texts: &[String],
        current: &mut BatchOptions,
        options: &GovernanceOptions,
        mut last_summary: BatchSummary,
        mut prior_reasons: Vec<String>,
    ) -> DomainResult<()> {
        let started = Instant::now();
        let mut plateau_count: u32 = 0;

        while session.performed_rounds < options.max_rounds {
            let round_index = session.performed_rounds + 1;

            if started.elapsed().as_secs() / 60 >= options.max_minutes {
                warn!(round = round_index, "governance time budget exceeded");
                session.finish(GovernanceState::Exhausted, StopReason::MaxRoundsExhausted);
                self.store.save_session(&options.session_file, session).await?;
                return Ok(());
            }

            if let Some(release_gate) = &self.release_gate {
                let report = release_gate.check().await?;
                if report.blocked {
                    warn!(
                        round = round_index,
                        reasons = report.reasons.len(),
                        "release gate blocked, halting governance loop"
                    );
                    session.release_gate_report = Some(report);
                    session.finish(GovernanceState::Blocked, StopReason::ReleaseGateBlocked);
                    self.store.save_session(&options.session_file, session).await?;
                    return Ok(());
                }
            }

            let anomaly_failed = match &self.anomaly {
                Some(signal) => signal.anomaly_failed().await,
                None => false,
            };
            let trigger = GovernanceTrigger {
                anomaly_failed,
                gate_reasons: prior_reasons.clone(),
            };

            let (patch, action_index, patch_reasons) =
                derive_patch(&trigger, current, options.mode, options.pinned_action);
            apply_patch(current, &patch);

            info!(
                round = round_index,
                mode = ?options.mode,
                action = ?action_index,
                "applying remediation patch"
            );

            let summary = match options.mode {
                RemediationMode::ProgramReplay => self.batch.run(goal_texts, current).await?,
                RemediationMode::RecoverCycle => {
                    self.batch
                        .resume(&last_summary, ResumeStrategy::Pending, current)
                        .await?
                }
            };
            let gate = effective_gate(&summary)?;

            session.record_round(GovernanceRound {
                round_index,
                trigger,
                applied_patch: patch,
                execution_mode: options.mode,
                selected_action_index: action_index,
                patch_reasons,
                gate_after: gate.clone(),
                recorded_at: Utc::now(),
            });
            self.store.save_session(&options.session_file, session).await?;

            if gate.passed {
                session.finish(GovernanceState::Converged, StopReason::Converged);
                self.store.save_session(&options.session_file, session).await?;
                return Ok(());
            }

            if options.plateau_rounds > 0 {
                if gate.reasons == prior_reasons {
                    plateau_count += 1;
                    if plateau_count >= options.plateau_rounds {
                        warn!(
                            rounds = plateau_count,
                            "gate reasons plateaued, stopping early"
                        );
                        session.finish(GovernanceState::Exhausted, StopReason::Plateau);
                        self.store.save_session(&options.session_file, session).await?;
                        return Ok(());
                    }
                } else {
                    plateau_count = 0;
                }
            }

            prior_reasons = gate.reasons;
            last_summary = summary;
        }

        session.finish(GovernanceState::Exhausted, StopReason::MaxRoundsExhausted);
        self.store.save_session(&options.session_file, session).await?;
        Ok(())
    }
}

/// Fold the governance target risk into the batch's gate options.
fn with_governance_gate(batch_options: &BatchOptions, options: &GovernanceOptions) -> BatchOptions {
    let mut current = batch_options.clone();
    let mut gate = current.gate.take().unwrap_or_default();
    if gate.overrides.max_risk_level.is_none() {
        gate.overrides.max_risk_level = Some(options.target_risk);
    }
    current.gate = Some(gate);
    current
}

fn snapshot_of(batch_options: &BatchOptions, options: &GovernanceOptions) -> PolicySnapshot {
    let gate_profile = batch_options
        .gate
        .as_ref()
        .map_or_else(Default::default, |g| g.profile);
    PolicySnapshot {
        target_risk: options.target_risk,
        max_rounds: options.max_rounds,
        max_minutes: options.max_minutes,
        gate_profile,
        scheduling_strategy: batch_options.strategy,
        retry_strategy: batch_options.retry.strategy,
        agent_budget: batch_options.agent_budget,
        batch_parallel: batch_options.parallel,
    }
}

/// Reject resumed sessions whose policy silently diverges.
fn check_policy_drift(
    prior: &GovernanceSession,
    requested: &PolicySnapshot,
    allow_drift: bool,
) -> DomainResult<()> {
    let persisted = &prior.policy;
    let drift: Option<(&str, String, String)> = if persisted.target_risk != requested.target_risk {
        Some((
            "target_risk",
            persisted.target_risk.as_str().to_string(),
            requested.target_risk.as_str().to_string(),
        ))
    } else if persisted.gate_profile != requested.gate_profile {
        Some((
            "gate_profile",
            persisted.gate_profile.as_str().to_string(),
            requested.gate_profile.as_str().to_string(),
        ))
    } else if persisted.scheduling_strategy != requested.scheduling_strategy {
        Some((
            "scheduling_strategy",
            persisted.scheduling_strategy.as_str().to_string(),
            requested.scheduling_strategy.as_str().to_string(),
        ))
    } else if persisted.retry_strategy != requested.retry_strategy {
        Some((
            "retry_strategy",
            persisted.retry_strategy.as_str().to_string(),
            requested.retry_strategy.as_str().to_string(),
        ))
    } else if persisted.agent_budget != requested.agent_budget {
        Some((
            "agent_budget",
            format!("{:?}", persisted.agent_budget),
            format!("{:?}", requested.agent_budget),
        ))
    } else if persisted.batch_parallel != requested.batch_parallel {
        Some((
            "batch_parallel",
            persisted.batch_parallel.to_string(),
            requested.batch_parallel.to_string(),
        ))
    } else {
        None
    };

    match drift {
        Some((field, persisted_value, requested_value)) if !allow_drift => {
            Err(DomainError::PolicyDrift {
                session: prior.id,
                field: field.to_string(),
                persisted: persisted_value,
                requested: requested_value,
            })
        }
        Some((field, ..)) => {
            warn!(field, "policy drift explicitly overridden");
            Ok(())
        }
        None => Ok(()),
    }
}

fn effective_gate(summary: &BatchSummary) -> DomainResult<GateEvaluation> {
    summary.program_gate_effective.clone().ok_or_else(|| {
        DomainError::ValidationFailed("governance requires a gate-evaluated batch".to_string())
    })
}

/// Derive the remediation for one round.
///
/// Returns the parameter patch, the selected recover-cycle action index
/// (when applicable), and one reason string per patched parameter.
fn derive_patch(
    trigger: &GovernanceTrigger,
    current: &BatchOptions,
    mode: RemediationMode,
    pinned_action: Option<usize>,
) -> (GovernancePatch, Option<usize>, Vec<String>) {
    let mentions = |needle: &str| trigger.gate_reasons.iter().any(|r| r.contains(needle));

    match mode {
        RemediationMode::ProgramReplay => {
            let mut patch = GovernancePatch::default();
            let mut reasons = Vec::new();

            if mentions("agent_budget") {
                if let Some(budget) = current.agent_budget {
                    let next = budget.saturating_sub(1).max(1);
                    if next < budget {
                        patch.agent_budget = Some(next);
                        reasons.push(format!("agent_budget violation: {budget} -> {next}"));
                    }
                }
            }
            if trigger.anomaly_failed || mentions("elapsed_minutes") {
                let next = current.parallel.saturating_sub(1).max(1);
                if next < current.parallel {
                    patch.batch_parallel = Some(next);
                    reasons.push(format!(
                        "pacing pressure: parallel {} -> {next}",
                        current.parallel
                    ));
                }
            }
            if (mentions("risk_level") || mentions("total_sub_specs"))
                && current.retry.strategy == RetryStrategy::Adaptive
            {
                patch.retry_strategy = Some(RetryStrategy::Strict);
                reasons.push("risk pressure: retry strategy adaptive -> strict".to_string());
            }

            if patch.is_empty() {
                // Generic fallback: slow the fleet down.
                let next = current.parallel.saturating_sub(1).max(1);
                if next < current.parallel {
                    patch.batch_parallel = Some(next);
                    reasons.push(format!(
                        "no targeted remediation: parallel {} -> {next}",
                        current.parallel
                    ));
                } else {
                    reasons.push("no applicable remediation".to_string());
                }
            }

            (patch, None, reasons)
        }
        RemediationMode::RecoverCycle => {
            let index = pinned_action
                .filter(|i| *i < REMEDIATION_ACTIONS.len())
                .unwrap_or_else(|| auto_select_action(trigger, current));
            let action = REMEDIATION_ACTIONS[index];
            let mut patch = GovernancePatch::default();
            let mut reasons = Vec::new();
            match action {
                RemediationAction::ReduceAgentBudget => {
                    if let Some(budget) = current.agent_budget {
                        let next = budget.saturating_sub(1).max(1);
                        patch.agent_budget = Some(next);
                        reasons.push(format!("recover-cycle: agent budget {budget} -> {next}"));
                    } else {
                        reasons.push("recover-cycle: no agent budget to reduce".to_string());
                    }
                }
                RemediationAction::ReduceParallel => {
                    let next = current.parallel.saturating_sub(1).max(1);
                    patch.batch_parallel = Some(next);
                    reasons.push(format!(
                        "recover-cycle: parallel {} -> {next}",
                        current.parallel
                    ));
                }
                RemediationAction::StrictRetry => {
                    patch.retry_strategy = Some(RetryStrategy::Strict);
                    reasons.push("recover-cycle: retry strategy -> strict".to_string());
                }
            }
            (patch, Some(index), reasons)
        }
    }
}

/// First action applicable to the trigger, by table order.
fn auto_select_action(trigger: &GovernanceTrigger, current: &BatchOptions) -> usize {
    let mentions = |needle: &str| trigger.gate_reasons.iter().any(|r| r.contains(needle));

    if mentions("agent_budget") && current.agent_budget.is_some_and(|b| b > 1) {
        return 0; // reduce-agent-budget
    }
    if (trigger.anomaly_failed || mentions("elapsed_minutes")) && current.parallel > 1 {
        return 1; // reduce-parallel
    }
    if (mentions("risk_level") || mentions("total_sub_specs"))
        && current.retry.strategy == RetryStrategy::Adaptive
    {
        return 2; // strict-retry
    }
    // Fall back to the first action that can still change anything.
    if current.agent_budget.is_some_and(|b| b > 1) {
        0
    } else if current.parallel > 1 {
        1
    } else {
        2
    }
}

fn apply_patch(current: &mut BatchOptions, patch: &GovernancePatch) {
    if let Some(budget) = patch.agent_budget {
        current.agent_budget = Some(budget);
    }
    if let Some(parallel) = patch.batch_parallel {
        current.parallel = parallel;
    }
    if let Some(strategy) = patch.retry_strategy {
        current.retry.strategy = strategy;
    }
}
