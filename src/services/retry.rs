//! Retry round policy.
//!
//! Pure decision helpers for the retry controller: whether a round's
//! stop-on-error setting is overridden, and how observed rate-limit
//! pressure reduces the next round's limits.

use crate::domain::models::{RateLimitTelemetry, RetryStrategy};

/// Effective `continue_on_error` for a retry round.
///
/// Under `adaptive`, rounds after the first always continue on error so
/// every remaining failure is drained even when the initial run was
/// stop-on-error. Under `strict`, the caller's original value is honored
/// on every round.
pub fn retry_continue_on_error(strategy: RetryStrategy, original: bool) -> bool {
    match strategy {
        RetryStrategy::Adaptive => true,
        RetryStrategy::Strict => original,
    }
}

/// Reduced limits for the round after one that saw rate-limit signals.
///
/// Parallelism and agent budget each drop by one, floored at 1. Returns
/// `None` when no signals were observed (limits carry over unchanged).
pub fn backpressure_reduction(
    rate_limit: &RateLimitTelemetry,
    parallel: u32,
    agent_budget: Option<u32>,
) -> Option<(u32, Option<u32>)> {
    if rate_limit.signal_count == 0 {
        return None;
    }
    let next_parallel = parallel.saturating_sub(1).max(1);
    let next_budget = agent_budget.map(|b| b.saturating_sub(1).max(1));
    Some((next_parallel, next_budget))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_forces_continue_on_error() {
        assert!(retry_continue_on_error(RetryStrategy::Adaptive, false));
        assert!(retry_continue_on_error(RetryStrategy::Adaptive, true));
    }

    #[test]
    fn test_strict_honors_caller_value() {
        assert!(!retry_continue_on_error(RetryStrategy::Strict, false));
        assert!(retry_continue_on_error(RetryStrategy::Strict, true));
    }

    #[test]
    fn test_no_signals_no_reduction() {
        let telemetry = RateLimitTelemetry::default();
        assert!(backpressure_reduction(&telemetry, 4, Some(3)).is_none());
    }

    #[test]
    fn test_signals_reduce_both_limits() {
        let telemetry = RateLimitTelemetry {
            signal_count: 2,
            total_backoff_ms: 500,
            last_launch_hold_ms: 100,
        };
        let (parallel, budget) = backpressure_reduction(&telemetry, 4, Some(3)).unwrap();
        assert_eq!(parallel, 3);
        assert_eq!(budget, Some(2));
    }

    #[test]
    fn test_reduction_floors_at_one() {
        let telemetry = RateLimitTelemetry {
            signal_count: 1,
            ..Default::default()
        };
        let (parallel, budget) = backpressure_reduction(&telemetry, 1, Some(1)).unwrap();
        assert_eq!(parallel, 1);
        assert_eq!(budget, Some(1));
    }

    #[test]
    fn test_reduction_without_budget() {
        let telemetry = RateLimitTelemetry {
            signal_count: 1,
            ..Default::default()
        };
        let (parallel, budget) = backpressure_reduction(&telemetry, 3, None).unwrap();
        assert_eq!(parallel, 2);
        assert_eq!(budget, None);
    }
}
