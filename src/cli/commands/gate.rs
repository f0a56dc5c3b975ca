//! Gate evaluation CLI command.

use anyhow::Result;

use crate::application::batch_runner::evaluate_gate;
use crate::application::validation::validate_batch_options;
use crate::application::BatchOptions;
use crate::cli::display::table::gate_table;
use crate::cli::types::{GateCommands, GateEvalArgs};
use crate::domain::models::GateActuals;
use crate::infrastructure::config::ConfigLoader;

use super::{build_gate_options, parse_risk_level};

/// Process exit code for the command.
pub async fn execute(command: GateCommands, json: bool) -> Result<i32> {
    match command {
        GateCommands::Eval(args) => eval(args, json),
    }
}

fn eval(args: GateEvalArgs, json: bool) -> Result<i32> {
    let config = ConfigLoader::load()?;
    let gate_options = build_gate_options(&args.gate, &config)?.unwrap_or_else(|| {
        crate::application::GateOptions {
            config_overrides: config.gate_profiles.clone(),
            ..Default::default()
        }
    });

    // Reuse the batch-side range checks for the threshold flags.
    let probe = BatchOptions {
        gate: Some(gate_options.clone()),
        ..Default::default()
    };
    validate_batch_options(&probe)?;

    let actuals = GateActuals {
        risk_level: parse_risk_level(&args.risk_level)?,
        agent_budget: args.agent_budget,
        total_sub_specs: args.total_sub_specs,
        elapsed_minutes: args.elapsed_minutes,
    };

    let (report, effective) = evaluate_gate(&gate_options, actuals);

    if json {
        let payload = serde_json::json!({
            "program_gate": report,
            "program_gate_effective": effective,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for attempt in &report.attempts {
            println!(
                "[{}] {}",
                attempt.policy.profile.as_str(),
                if attempt.passed { "passed" } else { "failed" }
            );
        }
        println!("{}", gate_table(&effective));
        for reason in &effective.reasons {
            println!("  - {reason}");
        }
    }

    Ok(i32::from(!effective.passed))
}
