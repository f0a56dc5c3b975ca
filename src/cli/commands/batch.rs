//! Batch CLI command.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::executor::CommandExecutor;
use crate::application::batch_runner::BatchRunner;
use crate::application::validation::validate_batch_options;
use crate::cli::display;
use crate::cli::types::{BatchCommands, BatchRunArgs};
use crate::domain::ports::{DocumentStore, GoalExecutor};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::store::JsonFileStore;

use super::{build_batch_options, collect_goals, parse_resume_strategy};

/// Process exit code for the command.
pub async fn execute(command: BatchCommands, json: bool) -> Result<i32> {
    match command {
        BatchCommands::Run(args) => run(args, json).await,
    }
}

async fn run(args: BatchRunArgs, json: bool) -> Result<i32> {
    let mut config = ConfigLoader::load()?;
    if let Some(binary) = &args.tuning.executor {
        config.executor.binary_path = binary.clone();
    }

    // Everything is validated before the first executor call.
    let options = build_batch_options(&args.tuning, &args.gate, &config)?;
    validate_batch_options(&options)?;

    let executor: Arc<dyn GoalExecutor> =
        Arc::new(CommandExecutor::new(config.executor.clone()));
    let batch = BatchRunner::new(executor);
    let store = JsonFileStore::new();

    let summary = if let Some(resume) = &args.resume {
        let strategy = parse_resume_strategy(resume)?;
        let prior = store
            .load_summary(&args.summary_file)
            .await
            .with_context(|| {
                format!("Failed to load summary {}", args.summary_file.display())
            })?;
        batch.resume(&prior, strategy, &options).await?
    } else {
        let goals = collect_goals(&args.goals, args.goals_file.as_ref())?;
        info!(goals = goals.len(), "running batch");
        batch.run(&goals, &options).await?
    };

    store.save_summary(&args.summary_file, &summary).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        display::print_summary(&summary);
        println!("Summary written to {}", args.summary_file.display());
    }

    let gate_failed = summary
        .program_gate_effective
        .as_ref()
        .is_some_and(|gate| !gate.passed);
    Ok(i32::from(summary.failed_goals > 0 || gate_failed))
}
