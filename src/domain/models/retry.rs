//! Retry plan model.
//!
//! The [`RetryPlan`] is owned by the retry controller for the lifetime of
//! one batch invocation. Round results are appended to its history and
//! never mutated afterwards.

use serde::{Deserialize, Serialize};

use super::round::RoundResult;

/// How failed work is re-driven across rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Later rounds drain all remaining failures (`continue_on_error`
    /// forced on) and limits adapt to observed rate-limit pressure.
    Adaptive,
    /// The caller's stop-on-error setting is honored on every round.
    Strict,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Adaptive
    }
}

impl RetryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Strict => "strict",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "adaptive" => Some(Self::Adaptive),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Retry state for one batch invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPlan {
    pub strategy: RetryStrategy,
    /// Additional rounds granted when `until_complete` is off
    pub configured_rounds: u32,
    pub until_complete: bool,
    /// Round ceiling when `until_complete` is on
    pub max_rounds: u32,
    /// Retry rounds actually executed (the initial round is not counted)
    pub performed_rounds: u32,
    /// Failures remained when the round allowance ran out
    pub exhausted: bool,
    pub history: Vec<RoundResult>,
}

impl RetryPlan {
    pub fn new(
        strategy: RetryStrategy,
        configured_rounds: u32,
        until_complete: bool,
        max_rounds: u32,
    ) -> Self {
        Self {
            strategy,
            configured_rounds,
            until_complete,
            max_rounds,
            performed_rounds: 0,
            exhausted: false,
            history: Vec::new(),
        }
    }

    /// Retry rounds still allowed by the configuration.
    fn round_allowance(&self) -> u32 {
        if self.until_complete {
            self.max_rounds
        } else {
            self.configured_rounds
        }
    }

    /// Whether another retry round should run given the current failure count.
    pub fn should_run_again(&self, failed_count: usize) -> bool {
        failed_count > 0 && self.performed_rounds < self.round_allowance()
    }

    /// Record a completed round into the history.
    pub fn record_round(&mut self, result: RoundResult) {
        self.history.push(result);
    }

    /// Count one performed retry round.
    pub fn note_retry_round(&mut self) {
        self.performed_rounds += 1;
    }

    /// Set the exhaustion flag from the final failure count.
    pub fn finalize(&mut self, failed_count: usize) {
        self.exhausted = failed_count > 0 && self.performed_rounds == self.round_allowance();
    }
}
