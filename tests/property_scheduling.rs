//! Property tests for the concurrency controller and the gate.

use proptest::prelude::*;

use drover::domain::models::{GateActuals, GatePolicy, GateProfile, RiskLevel, SchedulingStrategy};
use drover::services::concurrency::{AdmissionState, ResourcePlanner};
use drover::services::gate::ConvergenceGate;

fn risk_strategy() -> impl Strategy<Value = RiskLevel> {
    prop_oneof![
        Just(RiskLevel::Low),
        Just(RiskLevel::Medium),
        Just(RiskLevel::High),
        Just(RiskLevel::Critical),
    ]
}

proptest! {
    /// `effective_parallel <= min(P, B)` whenever a budget is set, and the
    /// per-goal parallelism floor is always at least one.
    #[test]
    fn effective_parallel_bounded_by_request_and_budget(
        requested in 1u32..=20,
        budget in 1u32..=500,
        weights in proptest::collection::vec(1u32..=5, 1..=16),
    ) {
        let plan = ResourcePlanner::plan(
            &weights,
            Some(budget),
            requested,
            SchedulingStrategy::Fifo,
            0,
        );
        prop_assert!(plan.effective_parallel <= requested.min(budget));
        prop_assert!(plan.per_goal_max_parallel.unwrap() >= 1);
        prop_assert!(plan.max_concurrent_goals >= 1);
    }

    /// The running-set weight sum never exceeds the agent budget at any
    /// instant, for any admission/release interleaving.
    #[test]
    fn running_weight_never_exceeds_budget(
        budget in 1u32..=10,
        weights in proptest::collection::vec(1u32..=6, 1..=24),
        release_order in proptest::collection::vec(0usize..24, 0..48),
    ) {
        let plan = ResourcePlanner::plan(
            &weights,
            Some(budget),
            20,
            SchedulingStrategy::Fifo,
            0,
        );
        let mut admission = AdmissionState::from_plan(&plan);
        let mut pending: Vec<usize> = (0..weights.len()).collect();
        let mut running: Vec<usize> = Vec::new();
        let mut releases = release_order.into_iter();

        loop {
            // Admit in order until blocked.
            while let Some(&key) = pending.first() {
                if admission.try_admit(key, weights[key]) {
                    pending.remove(0);
                    running.push(key);
                    prop_assert!(admission.running_weight() <= u64::from(budget));
                } else {
                    break;
                }
            }
            if running.is_empty() {
                prop_assert!(pending.is_empty());
                break;
            }
            // Release one running goal (arbitrary choice).
            let pick = releases.next().unwrap_or(0) % running.len();
            let key = running.swap_remove(pick);
            admission.release(key);
            prop_assert!(admission.running_weight() <= u64::from(budget));
        }
    }

    /// Tightening any single threshold while holding actuals fixed can
    /// only turn a passing gate into a failing one, never the reverse.
    #[test]
    fn gate_tightening_is_monotone(
        risk in risk_strategy(),
        actual_budget in 0u32..=16,
        sub_specs in 0u32..=64,
        minutes in 0u64..=180,
        policy_budget in 1u32..=16,
        tightened_by in 1u32..=8,
    ) {
        let base = GatePolicy {
            max_agent_budget: policy_budget,
            ..GateProfile::Standard.defaults()
        };
        let actuals = GateActuals {
            risk_level: risk,
            agent_budget: actual_budget,
            total_sub_specs: sub_specs,
            elapsed_minutes: minutes,
        };
        let loose = ConvergenceGate::evaluate(base, actuals);
        let tight = ConvergenceGate::evaluate(
            GatePolicy {
                max_agent_budget: policy_budget.saturating_sub(tightened_by).max(1),
                ..base
            },
            actuals,
        );
        // passed implies the loose policy passed too.
        prop_assert!(!tight.passed || loose.passed);
        prop_assert_eq!(loose.passed, loose.reasons.is_empty());
        prop_assert_eq!(tight.passed, tight.reasons.is_empty());
    }

    /// The chain's effective evaluation is the first passing attempt, or
    /// the last attempted one when none pass.
    #[test]
    fn fallback_chain_effective_rule(
        risk in risk_strategy(),
        actual_budget in 0u32..=16,
        sub_specs in 0u32..=64,
        minutes in 0u64..=180,
    ) {
        let actuals = GateActuals {
            risk_level: risk,
            agent_budget: actual_budget,
            total_sub_specs: sub_specs,
            elapsed_minutes: minutes,
        };
        let profiles = [GateProfile::Strict, GateProfile::Standard, GateProfile::Lenient];
        let chain = ConvergenceGate::evaluate_chain(&profiles, |_| vec![], actuals).unwrap();

        match chain.attempts.iter().find(|a| a.passed) {
            Some(first_pass) => {
                prop_assert!(chain.effective.passed);
                prop_assert_eq!(first_pass.policy.profile, chain.effective.policy.profile);
                // Evaluation stops at the first pass.
                prop_assert!(chain.attempts.last().unwrap().passed);
            }
            None => {
                prop_assert!(!chain.effective.passed);
                prop_assert_eq!(
                    chain.attempts.last().unwrap().policy.profile,
                    chain.effective.policy.profile
                );
                prop_assert_eq!(chain.attempts.len(), profiles.len());
            }
        }
    }
}
