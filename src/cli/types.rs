//! CLI type definitions.
//!
//! This module contains clap command structures that define the CLI
//! interface. Enum-valued flags are taken as strings and validated before
//! any executor call, so bad input fails fast with a structured error.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "drover")]
#[command(about = "Drover - Autonomous Batch Orchestrator", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Batch goal execution
    #[command(subcommand)]
    Batch(BatchCommands),

    /// Governance close-loop control
    #[command(subcommand)]
    Governance(GovernanceCommands),

    /// Convergence gate evaluation
    #[command(subcommand)]
    Gate(GateCommands),
}

/// Shared batch tuning flags.
#[derive(Args, Debug, Clone)]
pub struct BatchTuningArgs {
    /// Concurrent goal slots (1-20)
    #[arg(short, long)]
    pub parallel: Option<u32>,

    /// Agent budget bounding concurrent work (1-500)
    #[arg(long)]
    pub agent_budget: Option<u32>,

    /// Scheduling strategy: fifo, complex-first, complex-last, critical-first
    #[arg(long)]
    pub strategy: Option<String>,

    /// Priority units added per wait tick (0-100)
    #[arg(long)]
    pub aging_factor: Option<u64>,

    /// Additional retry rounds (0-5)
    #[arg(long)]
    pub retry_rounds: Option<u32>,

    /// Retry strategy: adaptive, strict
    #[arg(long)]
    pub retry_strategy: Option<String>,

    /// Keep retrying until every goal completes
    #[arg(long)]
    pub retry_until_complete: bool,

    /// Retry round ceiling (1-20), requires --retry-until-complete
    #[arg(long, default_value_t = 0)]
    pub retry_max_rounds: u32,

    /// Halt dispatch on the first non-completed goal
    #[arg(long)]
    pub stop_on_error: bool,

    /// Suppress executor progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the executor binary path
    #[arg(long)]
    pub executor: Option<String>,
}

/// Shared gate threshold flags.
#[derive(Args, Debug, Clone)]
pub struct GateThresholdArgs {
    /// Gate profile: strict, standard, lenient
    #[arg(long)]
    pub gate_profile: Option<String>,

    /// Ordered fallback profiles tried after the primary (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub gate_fallback: Vec<String>,

    /// Risk ceiling: low, medium, high, critical
    #[arg(long)]
    pub max_risk_level: Option<String>,

    /// Agent-budget ceiling (1-500)
    #[arg(long)]
    pub max_agent_budget: Option<u32>,

    /// Total sub-spec ceiling (1-10000)
    #[arg(long)]
    pub max_total_sub_specs: Option<u32>,

    /// Elapsed-minutes ceiling (1-1440)
    #[arg(long)]
    pub max_elapsed_minutes: Option<u64>,
}

impl GateThresholdArgs {
    /// Whether any gate flag was supplied.
    pub fn any_present(&self) -> bool {
        self.gate_profile.is_some()
            || !self.gate_fallback.is_empty()
            || self.max_risk_level.is_some()
            || self.max_agent_budget.is_some()
            || self.max_total_sub_specs.is_some()
            || self.max_elapsed_minutes.is_some()
    }
}

#[derive(Subcommand)]
pub enum BatchCommands {
    /// Run a batch of goals through the executor
    Run(BatchRunArgs),
}

#[derive(Args, Debug)]
pub struct BatchRunArgs {
    /// Goal statements (positional)
    pub goals: Vec<String>,

    /// File with one goal per line (# comments and blanks skipped)
    #[arg(long)]
    pub goals_file: Option<PathBuf>,

    #[command(flatten)]
    pub tuning: BatchTuningArgs,

    #[command(flatten)]
    pub gate: GateThresholdArgs,

    /// Resume a persisted summary: pending, failed-only
    #[arg(long)]
    pub resume: Option<String>,

    /// Summary document path
    #[arg(long, default_value = ".drover/batch-summary.json")]
    pub summary_file: PathBuf,
}

#[derive(Subcommand)]
pub enum GovernanceCommands {
    /// Run the governance close-loop until the gate stabilizes
    Run(GovernanceRunArgs),
}

#[derive(Args, Debug)]
pub struct GovernanceRunArgs {
    /// Goal statements (positional)
    pub goals: Vec<String>,

    /// File with one goal per line (# comments and blanks skipped)
    #[arg(long)]
    pub goals_file: Option<PathBuf>,

    #[command(flatten)]
    pub tuning: BatchTuningArgs,

    #[command(flatten)]
    pub gate: GateThresholdArgs,

    /// Risk ceiling folded into the gate: low, medium, high, critical
    #[arg(long, default_value = "medium")]
    pub target_risk: String,

    /// Remediation round ceiling (1-20)
    #[arg(long, default_value_t = 3)]
    pub max_rounds: u32,

    /// Wall-clock budget in minutes (1-1440)
    #[arg(long, default_value_t = 60)]
    pub max_minutes: u64,

    /// Rounds with an unchanged reason set before stopping (0 disables)
    #[arg(long, default_value_t = 3)]
    pub plateau_rounds: u32,

    /// Apply remediation to the unresolved subset only
    #[arg(long)]
    pub recover_cycle: bool,

    /// Pin the recover-cycle remediation action index
    #[arg(long)]
    pub action: Option<usize>,

    /// Session document path
    #[arg(long, default_value = ".drover/governance-session.json")]
    pub session_file: PathBuf,

    /// Resume the persisted session instead of starting fresh
    #[arg(long)]
    pub resume_session: bool,

    /// Accept policy drift on resume
    #[arg(long)]
    pub allow_policy_drift: bool,
}

#[derive(Subcommand)]
pub enum GateCommands {
    /// Evaluate a gate policy against explicit actuals
    Eval(GateEvalArgs),
}

#[derive(Args, Debug)]
pub struct GateEvalArgs {
    /// Measured risk level: low, medium, high, critical
    #[arg(long, default_value = "low")]
    pub risk_level: String,

    /// Measured agent budget
    #[arg(long, default_value_t = 1)]
    pub agent_budget: u32,

    /// Measured total sub-spec count
    #[arg(long, default_value_t = 0)]
    pub total_sub_specs: u32,

    /// Measured elapsed minutes
    #[arg(long, default_value_t = 0)]
    pub elapsed_minutes: u64,

    #[command(flatten)]
    pub gate: GateThresholdArgs,
}
