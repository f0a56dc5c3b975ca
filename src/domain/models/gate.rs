//! Convergence gate policy and evaluation models.
//!
//! A [`GatePolicy`] is resolved from explicit thresholds layered over a
//! named profile's defaults and is immutable once resolved for an
//! evaluation. A fallback chain is an ordered list of profiles evaluated
//! against the same actuals until one passes.

use serde::{Deserialize, Serialize};

/// Aggregate risk classification of a finished run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Named preset supplying default gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateProfile {
    Strict,
    Standard,
    Lenient,
}

impl Default for GateProfile {
    fn default() -> Self {
        Self::Standard
    }
}

impl GateProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Standard => "standard",
            Self::Lenient => "lenient",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "standard" => Some(Self::Standard),
            "lenient" => Some(Self::Lenient),
            _ => None,
        }
    }

    /// Default thresholds supplied by this profile.
    pub fn defaults(&self) -> GatePolicy {
        match self {
            Self::Strict => GatePolicy {
                profile: *self,
                max_risk_level: RiskLevel::Low,
                max_agent_budget: 2,
                max_total_sub_specs: 12,
                max_elapsed_minutes: 30,
            },
            Self::Standard => GatePolicy {
                profile: *self,
                max_risk_level: RiskLevel::Medium,
                max_agent_budget: 4,
                max_total_sub_specs: 24,
                max_elapsed_minutes: 60,
            },
            Self::Lenient => GatePolicy {
                profile: *self,
                max_risk_level: RiskLevel::High,
                max_agent_budget: 8,
                max_total_sub_specs: 48,
                max_elapsed_minutes: 120,
            },
        }
    }
}

/// Explicitly supplied thresholds that override profile defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOverrides {
    pub max_risk_level: Option<RiskLevel>,
    pub max_agent_budget: Option<u32>,
    pub max_total_sub_specs: Option<u32>,
    pub max_elapsed_minutes: Option<u64>,
}

impl GateOverrides {
    pub fn is_empty(&self) -> bool {
        self.max_risk_level.is_none()
            && self.max_agent_budget.is_none()
            && self.max_total_sub_specs.is_none()
            && self.max_elapsed_minutes.is_none()
    }
}

/// Fully resolved gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    pub profile: GateProfile,
    pub max_risk_level: RiskLevel,
    pub max_agent_budget: u32,
    pub max_total_sub_specs: u32,
    pub max_elapsed_minutes: u64,
}

impl GatePolicy {
    /// Layer explicit thresholds over a profile's defaults.
    ///
    /// Override layers apply lowest-precedence first; any threshold the
    /// caller supplied explicitly wins over configuration, which wins over
    /// the profile default.
    pub fn resolve(profile: GateProfile, layers: &[GateOverrides]) -> Self {
        let mut policy = profile.defaults();
        for layer in layers {
            if let Some(risk) = layer.max_risk_level {
                policy.max_risk_level = risk;
            }
            if let Some(budget) = layer.max_agent_budget {
                policy.max_agent_budget = budget;
            }
            if let Some(sub_specs) = layer.max_total_sub_specs {
                policy.max_total_sub_specs = sub_specs;
            }
            if let Some(minutes) = layer.max_elapsed_minutes {
                policy.max_elapsed_minutes = minutes;
            }
        }
        policy
    }
}

/// Measured aggregates of a finished run, compared against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateActuals {
    pub risk_level: RiskLevel,
    pub agent_budget: u32,
    pub total_sub_specs: u32,
    pub elapsed_minutes: u64,
}

/// Where an evaluation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateSource {
    Primary,
    FallbackChain,
}

/// Result of checking one policy against one set of actuals.
///
/// Invariant: `passed == reasons.is_empty()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvaluation {
    pub passed: bool,
    pub policy: GatePolicy,
    pub actual: GateActuals,
    pub reasons: Vec<String>,
    pub source: GateSource,
}

/// Outcome of evaluating an ordered profile chain against one set of actuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateChainResult {
    /// Every attempted evaluation, in chain order
    pub attempts: Vec<GateEvaluation>,
    /// First passing attempt, or the last attempted one if none pass
    pub effective: GateEvaluation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_profile_defaults_tighten_with_strictness() {
        let strict = GateProfile::Strict.defaults();
        let standard = GateProfile::Standard.defaults();
        let lenient = GateProfile::Lenient.defaults();
        assert!(strict.max_agent_budget < standard.max_agent_budget);
        assert!(standard.max_agent_budget < lenient.max_agent_budget);
        assert!(strict.max_risk_level < lenient.max_risk_level);
    }

    #[test]
    fn test_resolve_applies_overrides_over_defaults() {
        let overrides = GateOverrides {
            max_agent_budget: Some(2),
            ..Default::default()
        };
        let policy = GatePolicy::resolve(GateProfile::Standard, &[overrides]);
        assert_eq!(policy.max_agent_budget, 2);
        // Untouched thresholds keep the profile defaults.
        assert_eq!(policy.max_risk_level, RiskLevel::Medium);
        assert_eq!(policy.max_total_sub_specs, 24);
    }

    #[test]
    fn test_resolve_later_layers_win() {
        let config = GateOverrides {
            max_agent_budget: Some(6),
            max_elapsed_minutes: Some(90),
            ..Default::default()
        };
        let cli = GateOverrides {
            max_agent_budget: Some(2),
            ..Default::default()
        };
        let policy = GatePolicy::resolve(GateProfile::Standard, &[config, cli]);
        assert_eq!(policy.max_agent_budget, 2);
        assert_eq!(policy.max_elapsed_minutes, 90);
    }

    #[test]
    fn test_risk_level_round_trip() {
        for level in [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            assert_eq!(RiskLevel::from_str(level.as_str()), Some(level));
        }
    }
}
