//! Mock executor for testing.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{
    ExecutionReport, ExecutionStatus, ExecutorOptions, GoalExecutor, OrchestrationReport,
    RateLimitReport, SpecPortfolio,
};

/// One scripted executor response.
#[derive(Debug, Clone)]
pub struct MockOutcome {
    status: ExecutionStatus,
    sub_specs: usize,
    rate_limit: Option<RateLimitReport>,
    /// When set, the call is rejected with this message instead of
    /// returning a report.
    reject: Option<String>,
}

impl MockOutcome {
    /// A completed artifact with the given sub-spec count.
    pub fn completed(sub_specs: usize) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            sub_specs,
            rate_limit: None,
            reject: None,
        }
    }

    /// A failed execution report.
    pub fn failed() -> Self {
        Self {
            status: ExecutionStatus::Failed,
            sub_specs: 0,
            rate_limit: None,
            reject: None,
        }
    }

    /// An outright rejection (the executor raises an error).
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            sub_specs: 0,
            rate_limit: None,
            reject: Some(message.into()),
        }
    }

    /// Attach rate-limit telemetry to the report.
    pub fn with_rate_limit(mut self, signals: u32, backoff_ms: u64, hold_ms: u64) -> Self {
        self.rate_limit = Some(RateLimitReport {
            signal_count: signals,
            total_backoff_ms: backoff_ms,
            last_launch_hold_ms: hold_ms,
        });
        self
    }
}

/// Scriptable goal executor that tracks in-flight concurrency.
///
/// Responses are scripted per goal text and consumed in order; once a
/// goal's script is exhausted (or was never set) the default outcome is
/// returned. A short sleep inside `execute` keeps concurrent calls
/// observable to the in-flight probe.
pub struct MockExecutor {
    scripts: RwLock<HashMap<String, VecDeque<MockOutcome>>>,
    default_outcome: MockOutcome,
    delay: Duration,
    probe: Arc<Mutex<FlightProbe>>,
}

#[derive(Debug, Default)]
struct FlightProbe {
    in_flight: usize,
    max_in_flight: usize,
    calls: usize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            default_outcome: MockOutcome::completed(1),
            delay: Duration::from_millis(5),
            probe: Arc::new(Mutex::new(FlightProbe::default())),
        }
    }

    /// Replace the default outcome used for unscripted goals.
    pub fn with_default_outcome(mut self, outcome: MockOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Set the simulated per-call duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Script the ordered outcomes for one goal text.
    pub async fn script(&self, goal_text: impl Into<String>, outcomes: Vec<MockOutcome>) {
        let mut scripts = self.scripts.write().await;
        scripts.insert(goal_text.into(), outcomes.into());
    }

    /// Script a goal to fail `failures` times and then complete.
    pub async fn succeed_after_failures(&self, goal_text: impl Into<String>, failures: usize) {
        let mut outcomes: Vec<MockOutcome> = (0..failures).map(|_| MockOutcome::failed()).collect();
        outcomes.push(MockOutcome::completed(1));
        self.script(goal_text, outcomes).await;
    }

    /// Highest number of calls that were ever in flight simultaneously.
    pub async fn max_in_flight(&self) -> usize {
        self.probe.lock().await.max_in_flight
    }

    /// Total executor calls made.
    pub async fn call_count(&self) -> usize {
        self.probe.lock().await.calls
    }

    async fn next_outcome(&self, goal_text: &str) -> MockOutcome {
        let mut scripts = self.scripts.write().await;
        scripts
            .get_mut(goal_text)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GoalExecutor for MockExecutor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn execute(
        &self,
        goal_text: &str,
        _options: &ExecutorOptions,
    ) -> DomainResult<ExecutionReport> {
        {
            let mut probe = self.probe.lock().await;
            probe.calls += 1;
            probe.in_flight += 1;
            probe.max_in_flight = probe.max_in_flight.max(probe.in_flight);
        }

        tokio::time::sleep(self.delay).await;
        let outcome = self.next_outcome(goal_text).await;

        {
            let mut probe = self.probe.lock().await;
            probe.in_flight -= 1;
        }

        if let Some(message) = outcome.reject {
            return Err(DomainError::ExecutorFailed(message));
        }

        let portfolio = if outcome.status.is_completed() {
            SpecPortfolio {
                master_spec: Some(format!("spec:{}", short_slug(goal_text))),
                sub_specs: (0..outcome.sub_specs)
                    .map(|i| format!("spec:{}/{i}", short_slug(goal_text)))
                    .collect(),
            }
        } else {
            SpecPortfolio::default()
        };

        Ok(ExecutionReport {
            status: outcome.status,
            portfolio,
            orchestration: outcome
                .rate_limit
                .map(|rate_limit| OrchestrationReport { rate_limit }),
        })
    }
}

fn short_slug(text: &str) -> String {
    text.chars()
        .take(24)
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}
