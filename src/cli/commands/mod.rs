//! CLI command handlers.

pub mod batch;
pub mod gate;
pub mod governance;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::batch_runner::{BatchOptions, GateOptions, RetryOptions};
use crate::application::validation::ValidationError;
use crate::domain::models::{
    DroverConfig, GateOverrides, GateProfile, ResumeStrategy, RetryStrategy, RiskLevel,
    SchedulingStrategy,
};

use super::types::{BatchTuningArgs, GateThresholdArgs};

/// Parse an enum-valued flag, producing a structured validation error.
fn parse_enum<T>(
    field: &'static str,
    value: &str,
    allowed: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ValidationError> {
    parse(value).ok_or_else(|| ValidationError::InvalidEnum {
        field,
        value: value.to_string(),
        allowed,
    })
}

pub(crate) fn parse_scheduling_strategy(value: &str) -> Result<SchedulingStrategy, ValidationError> {
    parse_enum(
        "strategy",
        value,
        "fifo, complex-first, complex-last, critical-first",
        SchedulingStrategy::from_str,
    )
}

pub(crate) fn parse_retry_strategy(value: &str) -> Result<RetryStrategy, ValidationError> {
    parse_enum("retry_strategy", value, "adaptive, strict", RetryStrategy::from_str)
}

pub(crate) fn parse_gate_profile(value: &str) -> Result<GateProfile, ValidationError> {
    parse_enum(
        "gate_profile",
        value,
        "strict, standard, lenient",
        GateProfile::from_str,
    )
}

pub(crate) fn parse_risk_level(value: &str) -> Result<RiskLevel, ValidationError> {
    parse_enum(
        "risk_level",
        value,
        "low, medium, high, critical",
        RiskLevel::from_str,
    )
}

pub(crate) fn parse_resume_strategy(value: &str) -> Result<ResumeStrategy, ValidationError> {
    parse_enum(
        "resume",
        value,
        "pending, failed-only",
        ResumeStrategy::from_str,
    )
}

/// Build gate options from CLI flags and configuration overrides.
pub(crate) fn build_gate_options(
    args: &GateThresholdArgs,
    config: &DroverConfig,
) -> Result<Option<GateOptions>, ValidationError> {
    if !args.any_present() {
        return Ok(None);
    }

    let profile = match &args.gate_profile {
        Some(value) => parse_gate_profile(value)?,
        None => GateProfile::default(),
    };
    let mut fallback = Vec::new();
    for value in &args.gate_fallback {
        fallback.push(parse_gate_profile(value)?);
    }
    let max_risk_level = match &args.max_risk_level {
        Some(value) => Some(parse_risk_level(value)?),
        None => None,
    };

    Ok(Some(GateOptions {
        profile,
        fallback,
        overrides: GateOverrides {
            max_risk_level,
            max_agent_budget: args.max_agent_budget,
            max_total_sub_specs: args.max_total_sub_specs,
            max_elapsed_minutes: args.max_elapsed_minutes,
        },
        config_overrides: config.gate_profiles.clone(),
    }))
}

/// Merge CLI tuning flags over configuration defaults.
pub(crate) fn build_batch_options(
    tuning: &BatchTuningArgs,
    gate: &GateThresholdArgs,
    config: &DroverConfig,
) -> Result<BatchOptions, ValidationError> {
    let strategy = match &tuning.strategy {
        Some(value) => parse_scheduling_strategy(value)?,
        None => config.defaults.strategy,
    };
    let retry_strategy = match &tuning.retry_strategy {
        Some(value) => parse_retry_strategy(value)?,
        None => config.defaults.retry_strategy,
    };

    Ok(BatchOptions {
        parallel: tuning.parallel.unwrap_or(config.defaults.parallel),
        agent_budget: tuning.agent_budget.or(config.defaults.agent_budget),
        strategy,
        aging_factor: tuning.aging_factor.unwrap_or(config.defaults.aging_factor),
        continue_on_error: if tuning.stop_on_error {
            false
        } else {
            config.defaults.continue_on_error
        },
        retry: RetryOptions {
            strategy: retry_strategy,
            rounds: tuning.retry_rounds.unwrap_or(config.defaults.retry_rounds),
            until_complete: tuning.retry_until_complete,
            max_rounds: tuning.retry_max_rounds,
        },
        gate: build_gate_options(gate, config)?,
        quiet: tuning.quiet,
        resume: false,
    })
}

/// Collect goals from positional arguments and an optional goals file.
pub(crate) fn collect_goals(
    positional: &[String],
    goals_file: Option<&PathBuf>,
) -> Result<Vec<String>> {
    let mut goals: Vec<String> = positional
        .iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();

    if let Some(path) = goals_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read goals file {}", path.display()))?;
        for line in raw.lines() {
            let line = line.trim();
            if !line.is_empty() && !line.starts_with('#') {
                goals.push(line.to_string());
            }
        }
    }

    anyhow::ensure!(!goals.is_empty(), "No goals supplied");
    Ok(goals)
}
