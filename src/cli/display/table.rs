//! Table rendering for human-readable output.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::domain::models::{
    BatchSummary, GateEvaluation, GoalRecord, GovernanceSession, RoundResult,
};

/// Render the per-goal results of a summary.
pub fn goal_table(records: &[GoalRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "#", "Goal", "Status", "Attempt", "Sub-specs", "Waits", "Weight",
        ]);
    for record in records {
        table.add_row(vec![
            Cell::new(record.index),
            Cell::new(truncate(&record.goal, 48)),
            Cell::new(record.status.as_str()),
            Cell::new(record.batch_attempt),
            Cell::new(record.sub_spec_count),
            Cell::new(record.wait_ticks),
            Cell::new(record.goal_weight),
        ]);
    }
    table
}

/// Render the round history of a summary.
pub fn round_table(rounds: &[RoundResult]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Round",
        "Parallel",
        "Budget",
        "Completed",
        "Failed",
        "RL signals",
        "Backpressure",
    ]);
    for round in rounds {
        table.add_row(vec![
            Cell::new(round.round_number),
            Cell::new(round.applied_parallel),
            Cell::new(
                round
                    .applied_budget
                    .map_or_else(|| "-".to_string(), |b| b.to_string()),
            ),
            Cell::new(round.completed_count()),
            Cell::new(round.failed_count()),
            Cell::new(round.rate_limit.signal_count),
            Cell::new(if round.adaptive_backpressure_applied { "yes" } else { "no" }),
        ]);
    }
    table
}

/// Render one gate evaluation.
pub fn gate_table(evaluation: &GateEvaluation) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Threshold", "Limit", "Actual"]);
    table.add_row(vec![
        Cell::new("risk_level"),
        Cell::new(evaluation.policy.max_risk_level.as_str()),
        Cell::new(evaluation.actual.risk_level.as_str()),
    ]);
    table.add_row(vec![
        Cell::new("agent_budget"),
        Cell::new(evaluation.policy.max_agent_budget),
        Cell::new(evaluation.actual.agent_budget),
    ]);
    table.add_row(vec![
        Cell::new("total_sub_specs"),
        Cell::new(evaluation.policy.max_total_sub_specs),
        Cell::new(evaluation.actual.total_sub_specs),
    ]);
    table.add_row(vec![
        Cell::new("elapsed_minutes"),
        Cell::new(evaluation.policy.max_elapsed_minutes),
        Cell::new(evaluation.actual.elapsed_minutes),
    ]);
    table
}

/// Render a full batch summary to stdout.
pub fn print_summary(summary: &BatchSummary) {
    println!(
        "Batch {}: {}/{} completed, {} failed ({} rounds)",
        summary.status,
        summary.completed_goals,
        summary.total_goals,
        summary.failed_goals,
        summary.batch_retry.rounds.len(),
    );
    println!("{}", goal_table(&summary.results));
    if summary.batch_retry.rounds.len() > 1 {
        println!("{}", round_table(&summary.batch_retry.rounds));
    }
    if let Some(gate) = &summary.program_gate_effective {
        println!(
            "Gate [{}]: {}",
            gate.policy.profile.as_str(),
            if gate.passed { "passed" } else { "failed" }
        );
        println!("{}", gate_table(gate));
        for reason in &gate.reasons {
            println!("  - {reason}");
        }
    }
}

/// Render a governance session to stdout.
pub fn print_session(session: &GovernanceSession) {
    println!(
        "Governance session {}: {} after {} round(s){}",
        session.id,
        session.state.as_str(),
        session.performed_rounds,
        session
            .stop_reason
            .map_or_else(String::new, |r| format!(" ({})", r.as_str())),
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Round", "Mode", "Action", "Patch", "Gate", "Reasons",
    ]);
    for round in &session.history {
        let patch = [
            round
                .applied_patch
                .agent_budget
                .map(|b| format!("budget={b}")),
            round
                .applied_patch
                .batch_parallel
                .map(|p| format!("parallel={p}")),
            round
                .applied_patch
                .retry_strategy
                .map(|s| format!("retry={}", s.as_str())),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
        table.add_row(vec![
            Cell::new(round.round_index),
            Cell::new(format!("{:?}", round.execution_mode)),
            Cell::new(
                round
                    .selected_action_index
                    .map_or_else(|| "-".to_string(), |i| i.to_string()),
            ),
            Cell::new(if patch.is_empty() { "-".to_string() } else { patch }),
            Cell::new(if round.gate_after.passed { "passed" } else { "failed" }),
            Cell::new(round.gate_after.reasons.join("; ")),
        ]);
    }
    println!("{table}");

    if let Some(report) = &session.release_gate_report {
        println!("Release gate blocked:");
        for reason in &report.reasons {
            println!("  - {reason}");
        }
        for recommendation in &report.recommendations {
            println!("  => {recommendation}");
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
