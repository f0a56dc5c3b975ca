//! Governance session models.
//!
//! The governance controller repeatedly patches and re-runs the batch
//! pipeline until its convergence gate stabilizes or a round/time budget is
//! exhausted. Each round's trigger, patch, and resulting gate land in an
//! append-only history inside a persisted [`GovernanceSession`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::gate::{GateEvaluation, GateProfile, RiskLevel};
use super::plan::SchedulingStrategy;
use super::retry::RetryStrategy;

/// Governance controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceState {
    Idle,
    Running,
    Converged,
    Exhausted,
    Blocked,
}

impl GovernanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
            Self::Blocked => "blocked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted | Self::Blocked)
    }
}

/// Why a governance loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Converged,
    MaxRoundsExhausted,
    ReleaseGateBlocked,
    /// Gate reasons were unchanged for the configured number of rounds
    Plateau,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::MaxRoundsExhausted => "max-rounds-exhausted",
            Self::ReleaseGateBlocked => "release-gate-blocked",
            Self::Plateau => "plateau",
        }
    }
}

/// How a remediation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemediationMode {
    /// Re-run the whole program with patched parameters
    ProgramReplay,
    /// Apply one indexed remediation action to the unresolved subset only
    RecoverCycle,
}

/// The fixed, ordered remediation action table for recover-cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemediationAction {
    ReduceAgentBudget,
    ReduceParallel,
    StrictRetry,
}

/// Ordered action table; `selected_action_index` indexes into this.
pub const REMEDIATION_ACTIONS: [RemediationAction; 3] = [
    RemediationAction::ReduceAgentBudget,
    RemediationAction::ReduceParallel,
    RemediationAction::StrictRetry,
];

/// Signals that drove a round's remediation choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceTrigger {
    /// External anomaly signal (e.g. a rate-limit spike) fired
    pub anomaly_failed: bool,
    /// Gate reasons from the prior evaluation
    pub gate_reasons: Vec<String>,
}

/// Parameter changes applied before a round's re-run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernancePatch {
    pub agent_budget: Option<u32>,
    pub batch_parallel: Option<u32>,
    pub retry_strategy: Option<RetryStrategy>,
}

impl GovernancePatch {
    pub fn is_empty(&self) -> bool {
        self.agent_budget.is_none()
            && self.batch_parallel.is_none()
            && self.retry_strategy.is_none()
    }
}

/// Append-only history entry for one governance round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceRound {
    /// 1-based round index
    pub round_index: u32,
    pub trigger: GovernanceTrigger,
    pub applied_patch: GovernancePatch,
    pub execution_mode: RemediationMode,
    /// Index into [`REMEDIATION_ACTIONS`] for recover-cycles
    pub selected_action_index: Option<usize>,
    /// Why each patched parameter was changed
    pub patch_reasons: Vec<String>,
    pub gate_after: GateEvaluation,
    pub recorded_at: DateTime<Utc>,
}

/// Policy inputs frozen at session creation; resumed callers must match
/// these (or pass an explicit drift override).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub target_risk: RiskLevel,
    pub max_rounds: u32,
    pub max_minutes: u64,
    pub gate_profile: GateProfile,
    pub scheduling_strategy: SchedulingStrategy,
    pub retry_strategy: RetryStrategy,
    pub agent_budget: Option<u32>,
    pub batch_parallel: u32,
}

/// Current schema version for persisted governance sessions.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Persisted governance session, written after every round for resume.
///
/// The document keys follow the external interface: the policy snapshot
/// flattens into the root, the state serializes as `status`, and the
/// round history as `rounds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSession {
    pub id: Uuid,
    pub schema_version: u32,
    pub mode: String,
    #[serde(flatten)]
    pub policy: PolicySnapshot,
    #[serde(rename = "status")]
    pub state: GovernanceState,
    pub performed_rounds: u32,
    pub converged: bool,
    pub stop_reason: Option<StopReason>,
    #[serde(rename = "rounds")]
    pub history: Vec<GovernanceRound>,
    /// Populated when an external release gate blocked the loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_gate_report: Option<ReleaseGateReport>,
    pub resumed_from_governance_session: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GovernanceSession {
    /// Create a fresh session in the idle state.
    pub fn new(policy: PolicySnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            schema_version: SESSION_SCHEMA_VERSION,
            mode: "governance".to_string(),
            policy,
            state: GovernanceState::Idle,
            performed_rounds: 0,
            converged: false,
            stop_reason: None,
            history: Vec::new(),
            release_gate_report: None,
            resumed_from_governance_session: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derive a continuation of a persisted session under a new id.
    pub fn resumed(prior: &GovernanceSession) -> Self {
        let mut session = prior.clone();
        session.resumed_from_governance_session = Some(prior.id);
        session.id = Uuid::new_v4();
        session.state = GovernanceState::Idle;
        session.updated_at = Utc::now();
        session
    }

    /// Append a round and bump counters.
    pub fn record_round(&mut self, round: GovernanceRound) {
        self.performed_rounds += 1;
        self.history.push(round);
        self.updated_at = Utc::now();
    }

    /// Move to a terminal state with the given stop reason.
    pub fn finish(&mut self, state: GovernanceState, reason: StopReason) {
        self.state = state;
        self.converged = state == GovernanceState::Converged;
        self.stop_reason = Some(reason);
        self.updated_at = Utc::now();
    }
}

/// Report from the external release-gate precondition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseGateReport {
    pub blocked: bool,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::gate::GateProfile;

    fn snapshot() -> PolicySnapshot {
        PolicySnapshot {
            target_risk: RiskLevel::Medium,
            max_rounds: 3,
            max_minutes: 60,
            gate_profile: GateProfile::Standard,
            scheduling_strategy: SchedulingStrategy::Fifo,
            retry_strategy: RetryStrategy::Adaptive,
            agent_budget: Some(2),
            batch_parallel: 2,
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = GovernanceSession::new(snapshot());
        assert_eq!(session.state, GovernanceState::Idle);
        assert_eq!(session.performed_rounds, 0);
        assert!(!session.converged);
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_finish_converged_sets_flag() {
        let mut session = GovernanceSession::new(snapshot());
        session.finish(GovernanceState::Converged, StopReason::Converged);
        assert!(session.converged);
        assert_eq!(session.stop_reason, Some(StopReason::Converged));
        assert!(session.state.is_terminal());
    }

    #[test]
    fn test_resumed_session_links_to_prior() {
        let prior = GovernanceSession::new(snapshot());
        let resumed = GovernanceSession::resumed(&prior);
        assert_eq!(resumed.resumed_from_governance_session, Some(prior.id));
        assert_ne!(resumed.id, prior.id);
        assert_eq!(resumed.performed_rounds, prior.performed_rounds);
    }

    #[test]
    fn test_session_document_keys() {
        let session = GovernanceSession::new(snapshot());
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["mode"], "governance");
        assert_eq!(json["status"], "idle");
        // Policy snapshot flattens into the document root.
        assert_eq!(json["target_risk"], "medium");
        assert_eq!(json["max_rounds"], 3);
        assert!(json["rounds"].as_array().unwrap().is_empty());

        let restored: GovernanceSession = serde_json::from_value(json).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_stop_reason_wire_format() {
        assert_eq!(
            serde_json::to_string(&StopReason::MaxRoundsExhausted).unwrap(),
            "\"max-rounds-exhausted\""
        );
        assert_eq!(
            serde_json::to_string(&StopReason::ReleaseGateBlocked).unwrap(),
            "\"release-gate-blocked\""
        );
    }
}
