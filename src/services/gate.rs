//! Convergence gate evaluation.
//!
//! Decides whether a completed run is acceptable against policy
//! thresholds. Each configured threshold is checked independently and
//! contributes one reason string when violated; a gate failure is a
//! normal evaluation outcome, never an error.

use tracing::debug;

use crate::domain::models::{
    GateActuals, GateChainResult, GateEvaluation, GateOverrides, GatePolicy, GateProfile,
    GateSource,
};

/// Evaluator for gate policies and fallback chains.
pub struct ConvergenceGate;

impl ConvergenceGate {
    /// Evaluate one policy against the actuals.
    pub fn evaluate(policy: GatePolicy, actuals: GateActuals) -> GateEvaluation {
        Self::evaluate_with_source(policy, actuals, GateSource::Primary)
    }

    fn evaluate_with_source(
        policy: GatePolicy,
        actuals: GateActuals,
        source: GateSource,
    ) -> GateEvaluation {
        let mut reasons = Vec::new();

        if actuals.risk_level > policy.max_risk_level {
            reasons.push(format!(
                "risk_level {} exceeds max {}",
                actuals.risk_level.as_str(),
                policy.max_risk_level.as_str()
            ));
        }
        if actuals.agent_budget > policy.max_agent_budget {
            reasons.push(format!(
                "agent_budget {} exceeds max {}",
                actuals.agent_budget, policy.max_agent_budget
            ));
        }
        if actuals.total_sub_specs > policy.max_total_sub_specs {
            reasons.push(format!(
                "total_sub_specs {} exceeds max {}",
                actuals.total_sub_specs, policy.max_total_sub_specs
            ));
        }
        if actuals.elapsed_minutes > policy.max_elapsed_minutes {
            reasons.push(format!(
                "elapsed_minutes {} exceeds max {}",
                actuals.elapsed_minutes, policy.max_elapsed_minutes
            ));
        }

        debug!(
            profile = policy.profile.as_str(),
            passed = reasons.is_empty(),
            violations = reasons.len(),
            "gate evaluated"
        );

        GateEvaluation {
            passed: reasons.is_empty(),
            policy,
            actual: actuals,
            reasons,
            source,
        }
    }

    /// Evaluate an ordered profile chain against the same actuals.
    ///
    /// Profiles are tried in order until one passes. The effective
    /// evaluation is the first passing attempt, or the last attempted one
    /// when none pass; it is always tagged `fallback-chain`.
    pub fn evaluate_chain(
        profiles: &[GateProfile],
        overrides_per_profile: impl Fn(GateProfile) -> Vec<GateOverrides>,
        actuals: GateActuals,
    ) -> Option<GateChainResult> {
        let mut attempts: Vec<GateEvaluation> = Vec::new();
        for profile in profiles {
            let policy = GatePolicy::resolve(*profile, &overrides_per_profile(*profile));
            let evaluation =
                Self::evaluate_with_source(policy, actuals, GateSource::FallbackChain);
            let passed = evaluation.passed;
            attempts.push(evaluation);
            if passed {
                break;
            }
        }
        let effective = attempts.iter().find(|e| e.passed).or(attempts.last())?.clone();
        Some(GateChainResult { attempts, effective })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RiskLevel;

    fn actuals(risk: RiskLevel, budget: u32, sub_specs: u32, minutes: u64) -> GateActuals {
        GateActuals {
            risk_level: risk,
            agent_budget: budget,
            total_sub_specs: sub_specs,
            elapsed_minutes: minutes,
        }
    }

    #[test]
    fn test_passing_gate_has_no_reasons() {
        let policy = GateProfile::Standard.defaults();
        let eval = ConvergenceGate::evaluate(policy, actuals(RiskLevel::Low, 2, 10, 15));
        assert!(eval.passed);
        assert!(eval.reasons.is_empty());
        assert_eq!(eval.source, GateSource::Primary);
    }

    #[test]
    fn test_each_violation_contributes_one_reason() {
        let policy = GateProfile::Strict.defaults();
        // Violates risk (medium > low), budget (4 > 2), and sub-specs (20 > 12).
        let eval = ConvergenceGate::evaluate(policy, actuals(RiskLevel::Medium, 4, 20, 15));
        assert!(!eval.passed);
        assert_eq!(eval.reasons.len(), 3);
        assert!(eval.reasons.iter().any(|r| r.contains("risk_level")));
        assert!(eval.reasons.iter().any(|r| r.contains("agent_budget")));
        assert!(eval.reasons.iter().any(|r| r.contains("total_sub_specs")));
    }

    #[test]
    fn test_budget_violation_names_agent_budget() {
        let policy = GatePolicy {
            max_agent_budget: 2,
            ..GateProfile::Lenient.defaults()
        };
        let eval = ConvergenceGate::evaluate(policy, actuals(RiskLevel::Low, 4, 1, 1));
        assert!(!eval.passed);
        assert!(eval.reasons.iter().any(|r| r.contains("agent_budget")));
    }

    #[test]
    fn test_passed_iff_reasons_empty() {
        let policy = GateProfile::Standard.defaults();
        for risk in [RiskLevel::Low, RiskLevel::Critical] {
            let eval = ConvergenceGate::evaluate(policy, actuals(risk, 1, 1, 1));
            assert_eq!(eval.passed, eval.reasons.is_empty());
        }
    }

    #[test]
    fn test_chain_stops_at_first_pass() {
        let chain = ConvergenceGate::evaluate_chain(
            &[GateProfile::Strict, GateProfile::Standard, GateProfile::Lenient],
            |_| vec![],
            actuals(RiskLevel::Medium, 4, 20, 15),
        )
        .unwrap();
        // Strict fails, standard passes, lenient is never attempted.
        assert_eq!(chain.attempts.len(), 2);
        assert!(chain.effective.passed);
        assert_eq!(chain.effective.policy.profile, GateProfile::Standard);
        assert_eq!(chain.effective.source, GateSource::FallbackChain);
    }

    #[test]
    fn test_chain_effective_is_last_when_none_pass() {
        let chain = ConvergenceGate::evaluate_chain(
            &[GateProfile::Strict, GateProfile::Standard],
            |_| vec![],
            actuals(RiskLevel::Critical, 500, 999, 999),
        )
        .unwrap();
        assert_eq!(chain.attempts.len(), 2);
        assert!(!chain.effective.passed);
        assert_eq!(chain.effective.policy.profile, GateProfile::Standard);
    }

    #[test]
    fn test_chain_empty_profiles_yields_none() {
        assert!(ConvergenceGate::evaluate_chain(
            &[],
            |_| vec![],
            actuals(RiskLevel::Low, 1, 1, 1)
        )
        .is_none());
    }

    #[test]
    fn test_tightening_one_threshold_never_unfails() {
        let base = GateProfile::Standard.defaults();
        let a = actuals(RiskLevel::Low, 3, 10, 15);
        let loose = ConvergenceGate::evaluate(base, a);
        let tightened = ConvergenceGate::evaluate(
            GatePolicy {
                max_agent_budget: base.max_agent_budget - 2,
                ..base
            },
            a,
        );
        // Tightening can only add reasons.
        assert!(tightened.reasons.len() >= loose.reasons.len());
    }
}
