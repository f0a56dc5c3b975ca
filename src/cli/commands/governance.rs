//! Governance CLI command.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::adapters::executor::CommandExecutor;
use crate::application::governance::{GovernanceController, GovernanceOptions};
use crate::application::validation::{validate_batch_options, validate_governance_options};
use crate::cli::display;
use crate::cli::types::{GovernanceCommands, GovernanceRunArgs};
use crate::domain::models::{GovernanceState, RemediationMode};
use crate::domain::ports::GoalExecutor;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::store::JsonFileStore;

use super::{build_batch_options, collect_goals, parse_risk_level};

/// Process exit code for the command.
pub async fn execute(command: GovernanceCommands, json: bool) -> Result<i32> {
    match command {
        GovernanceCommands::Run(args) => run(args, json).await,
    }
}

async fn run(args: GovernanceRunArgs, json: bool) -> Result<i32> {
    let mut config = ConfigLoader::load()?;
    if let Some(binary) = &args.tuning.executor {
        config.executor.binary_path = binary.clone();
    }

    let batch_options = build_batch_options(&args.tuning, &args.gate, &config)?;
    validate_batch_options(&batch_options)?;

    let options = GovernanceOptions {
        target_risk: parse_risk_level(&args.target_risk)?,
        max_rounds: args.max_rounds,
        max_minutes: args.max_minutes,
        plateau_rounds: args.plateau_rounds,
        mode: if args.recover_cycle {
            RemediationMode::RecoverCycle
        } else {
            RemediationMode::ProgramReplay
        },
        pinned_action: args.action,
        session_file: args.session_file.clone(),
        allow_policy_drift: args.allow_policy_drift,
    };
    validate_governance_options(&options)?;

    let goals = collect_goals(&args.goals, args.goals_file.as_ref())?;
    let executor: Arc<dyn GoalExecutor> =
        Arc::new(CommandExecutor::new(config.executor.clone()));
    let controller =
        GovernanceController::new(executor, Arc::new(JsonFileStore::new()));

    info!(
        goals = goals.len(),
        resume = args.resume_session,
        "running governance loop"
    );

    let session = if args.resume_session {
        controller.resume(&goals, &batch_options, &options).await?
    } else {
        controller.run(&goals, &batch_options, &options).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        display::print_session(&session);
        println!("Session written to {}", options.session_file.display());
    }

    Ok(i32::from(session.state != GovernanceState::Converged))
}
