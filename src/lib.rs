//! Drover - Autonomous Batch Orchestrator
//!
//! Drover drives a fleet of long-running goal executions (each goal
//! produces a specification artifact through an external executor) to
//! completion under resource, risk, and time constraints, without human
//! intervention between rounds.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): Pure models, ports, and errors
//! - **Service Layer** (`services`): Scheduler, admission control, gate
//!   evaluation, retry policy (all pure)
//! - **Application Layer** (`application`): Round/batch runners and the
//!   governance close-loop
//! - **Adapters** (`adapters`): Goal executor implementations
//! - **Infrastructure Layer** (`infrastructure`): Configuration and
//!   persistence
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use drover::adapters::executor::MockExecutor;
//! use drover::application::{BatchOptions, BatchRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let batch = BatchRunner::new(Arc::new(MockExecutor::new()));
//!     let summary = batch
//!         .run(&["draft the orchestration spec".into()], &BatchOptions::default())
//!         .await?;
//!     println!("{} goals completed", summary.completed_goals);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{
    BatchOptions, BatchRunner, GateOptions, GovernanceController, GovernanceOptions,
    RetryOptions, ValidationError,
};
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    BatchSummary, DroverConfig, GateEvaluation, GatePolicy, GateProfile, Goal, GoalStatus,
    GovernanceSession, GovernanceState, ResourcePlan, ResumeStrategy, RetryPlan, RetryStrategy,
    RiskLevel, RoundResult, SchedulingStrategy, StopReason,
};
pub use domain::ports::{DocumentStore, ExecutorOptions, GoalExecutor};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::store::JsonFileStore;
