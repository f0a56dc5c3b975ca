//! End-to-end batch orchestration tests against the mock executor.

use std::sync::Arc;

use drover::adapters::executor::{MockExecutor, MockOutcome};
use drover::application::{BatchOptions, BatchRunner, RetryOptions};
use drover::domain::models::{OutcomeStatus, ResumeStrategy, RetryStrategy};
use drover::domain::ports::GoalExecutor;
use drover::JsonFileStore;
use drover::DocumentStore;

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Four light goals with two slots: exactly two executor calls in flight
/// at any time, and every goal reaches a terminal status.
#[tokio::test]
async fn test_two_slots_bound_in_flight_calls() {
    let executor = Arc::new(MockExecutor::new());
    let batch = BatchRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);

    let options = BatchOptions {
        parallel: 2,
        ..Default::default()
    };
    let summary = batch
        .run(&texts(&["one", "two", "three", "four"]), &options)
        .await
        .unwrap();

    assert_eq!(summary.total_goals, 4);
    assert_eq!(summary.completed_goals, 4);
    assert!(summary
        .results
        .iter()
        .all(|r| r.status == OutcomeStatus::Completed));
    assert_eq!(executor.max_in_flight().await, 2);
}

/// A weight-3 goal under an agent budget of 2 occupies the whole budget
/// and runs alone; the light goal queues behind it.
#[tokio::test]
async fn test_heavy_goal_occupies_whole_budget() {
    let executor = Arc::new(MockExecutor::new());
    let batch = BatchRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);

    let options = BatchOptions {
        parallel: 2,
        agent_budget: Some(2),
        ..Default::default()
    };
    // Scores orchestration + integration + quality = weight 3.
    let heavy = "orchestrate the integration test pipeline";
    let light = "write the user guide";
    let summary = batch.run(&texts(&[heavy, light]), &options).await.unwrap();

    let plan = &summary.resource_plan.plan;
    assert!(plan.weighted_scheduling_enabled);
    assert_eq!(plan.max_concurrent_goals, 1);
    assert_eq!(plan.goal_complexity.max, 3);

    assert_eq!(summary.completed_goals, 2);
    assert_eq!(executor.max_in_flight().await, 1);

    let light_record = summary.results.iter().find(|r| r.index == 1).unwrap();
    assert!(light_record.wait_ticks > 0);
}

/// One bounded retry round drains a transient failure; the goal that
/// completed on the first attempt is never re-submitted.
#[tokio::test]
async fn test_single_retry_round_drains_transient_failure() {
    let executor = Arc::new(MockExecutor::new());
    executor.succeed_after_failures("first goal", 1).await;
    let batch = BatchRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);

    let options = BatchOptions {
        retry: RetryOptions {
            rounds: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let summary = batch
        .run(&texts(&["first goal", "second goal"]), &options)
        .await
        .unwrap();

    assert_eq!(summary.failed_goals, 0);
    assert_eq!(summary.batch_retry.performed_rounds, 1);

    let first = summary.results.iter().find(|r| r.index == 0).unwrap();
    assert_eq!(first.batch_attempt, 2);
    let second = summary.results.iter().find(|r| r.index == 1).unwrap();
    assert_eq!(second.batch_attempt, 1);

    // 2 initial calls + 1 retry; the completed goal was carried forward.
    assert_eq!(executor.call_count().await, 3);
}

/// Under strict retry with stop-on-error, goals halted behind a repeat
/// failure stay stopped and are never executed.
#[tokio::test]
async fn test_strict_stop_on_error_keeps_rest_stopped() {
    let executor = Arc::new(MockExecutor::new());
    executor
        .script("bad goal", vec![MockOutcome::failed(), MockOutcome::failed()])
        .await;
    let batch = BatchRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);

    let options = BatchOptions {
        parallel: 1,
        continue_on_error: false,
        retry: RetryOptions {
            strategy: RetryStrategy::Strict,
            rounds: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let summary = batch
        .run(&texts(&["bad goal", "second", "third"]), &options)
        .await
        .unwrap();

    assert_eq!(summary.status, "incomplete");
    let second = summary.results.iter().find(|r| r.index == 1).unwrap();
    let third = summary.results.iter().find(|r| r.index == 2).unwrap();
    assert_eq!(second.status, OutcomeStatus::Stopped);
    assert_eq!(third.status, OutcomeStatus::Stopped);

    // Only the failing goal was ever submitted: once per round.
    assert_eq!(executor.call_count().await, 2);
}

/// Under adaptive retry the second round continues on error, so every
/// goal is eventually attempted even after a stop-on-error first round.
#[tokio::test]
async fn test_adaptive_drains_all_goals_after_halt() {
    let executor = Arc::new(MockExecutor::new());
    executor
        .script("bad goal", vec![MockOutcome::failed(), MockOutcome::failed()])
        .await;
    let batch = BatchRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);

    let options = BatchOptions {
        parallel: 1,
        continue_on_error: false,
        retry: RetryOptions {
            strategy: RetryStrategy::Adaptive,
            rounds: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let summary = batch
        .run(&texts(&["bad goal", "second", "third"]), &options)
        .await
        .unwrap();

    let second = summary.results.iter().find(|r| r.index == 1).unwrap();
    let third = summary.results.iter().find(|r| r.index == 2).unwrap();
    assert_eq!(second.status, OutcomeStatus::Completed);
    assert_eq!(third.status, OutcomeStatus::Completed);
    assert_eq!(summary.failed_goals, 1);

    // Round 1: the failing goal only. Round 2: all three remaining.
    assert_eq!(executor.call_count().await, 4);
}

/// A persisted summary can be resumed with `failed-only`, re-running
/// failures and errors while carrying completed work forward untouched.
#[tokio::test]
async fn test_persisted_summary_resume_failed_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batch-summary.json");
    let store = JsonFileStore::new();

    let executor = Arc::new(MockExecutor::new());
    executor
        .script(
            "flaky goal",
            vec![MockOutcome::failed(), MockOutcome::completed(2)],
        )
        .await;
    executor
        .script(
            "rejected goal",
            vec![MockOutcome::reject("executor offline"), MockOutcome::completed(1)],
        )
        .await;
    let batch = BatchRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);

    let options = BatchOptions {
        retry: RetryOptions {
            rounds: 0,
            ..Default::default()
        },
        ..Default::default()
    };

    let first = batch
        .run(&texts(&["flaky goal", "steady goal", "rejected goal"]), &options)
        .await
        .unwrap();
    assert_eq!(first.failed_goals, 2);
    store.save_summary(&path, &first).await.unwrap();

    let loaded = store.load_summary(&path).await.unwrap();
    assert_eq!(loaded, first);

    let resumed = batch
        .resume(&loaded, ResumeStrategy::FailedOnly, &options)
        .await
        .unwrap();
    assert_eq!(resumed.total_goals, 3);
    assert_eq!(resumed.failed_goals, 0);

    // The steady goal was not re-run: 3 initial + 2 resumed calls.
    assert_eq!(executor.call_count().await, 5);
}

/// Rate-limit signals in one round shrink the next round's applied
/// parallelism and budget, floored at one.
#[tokio::test]
async fn test_rate_limit_pressure_reduces_next_round() {
    let executor = Arc::new(MockExecutor::new());
    executor
        .script(
            "pressured goal",
            vec![
                MockOutcome::failed().with_rate_limit(3, 1200, 250),
                MockOutcome::completed(1),
            ],
        )
        .await;
    let batch = BatchRunner::new(Arc::clone(&executor) as Arc<dyn GoalExecutor>);

    let options = BatchOptions {
        parallel: 2,
        agent_budget: Some(2),
        ..Default::default()
    };
    let summary = batch.run(&texts(&["pressured goal"]), &options).await.unwrap();

    let rounds = &summary.batch_retry.rounds;
    assert_eq!(rounds.len(), 2);
    assert!(rounds[0].adaptive_backpressure_applied);
    assert_eq!(rounds[0].rate_limit.signal_count, 3);
    assert_eq!(rounds[0].next_round_parallel, Some(1));
    assert_eq!(rounds[0].next_round_agent_budget, Some(1));
    assert_eq!(rounds[1].applied_parallel, 1);
    assert_eq!(rounds[1].applied_budget, Some(1));
}
