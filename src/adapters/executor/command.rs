//! Command-line executor adapter.
//!
//! Spawns a configured external executor binary once per goal attempt and
//! parses the JSON execution report it prints to stdout. A non-zero exit
//! status or an unparseable report is surfaced as an executor rejection,
//! which the round runner converts into an `error` outcome.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ExecutorConfig;
use crate::domain::ports::{ExecutionReport, ExecutorOptions, GoalExecutor};

/// Executor that shells out to an external binary per goal.
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Build CLI arguments for one goal attempt.
    fn build_args(&self, goal_text: &str, options: &ExecutorOptions) -> Vec<String> {
        let mut args = self.config.extra_args.clone();

        args.push("--max-parallel".to_string());
        args.push(options.max_parallel.to_string());

        args.push("--attempt".to_string());
        args.push(options.attempt.to_string());

        if options.quiet || self.config.quiet {
            args.push("--quiet".to_string());
        }
        if options.resume {
            args.push("--resume".to_string());
        }

        // The goal itself, last.
        args.push("--goal".to_string());
        args.push(goal_text.to_string());

        args
    }
}

#[async_trait]
impl GoalExecutor for CommandExecutor {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn execute(
        &self,
        goal_text: &str,
        options: &ExecutorOptions,
    ) -> DomainResult<ExecutionReport> {
        let args = self.build_args(goal_text, options);
        debug!(binary = %self.config.binary_path, "invoking executor");

        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DomainError::ExecutorFailed(format!(
                    "failed to launch {}: {e}",
                    self.config.binary_path
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::ExecutorFailed(format!(
                "executor exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report: ExecutionReport = serde_json::from_str(stdout.trim()).map_err(|e| {
            DomainError::ExecutorFailed(format!("unparseable executor report: {e}"))
        })?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> CommandExecutor {
        CommandExecutor::new(ExecutorConfig {
            binary_path: "spec-executor".to_string(),
            extra_args: vec!["run".to_string()],
            quiet: false,
        })
    }

    #[test]
    fn test_args_carry_options() {
        let options = ExecutorOptions {
            max_parallel: 3,
            quiet: true,
            resume: true,
            attempt: 2,
        };
        let args = executor().build_args("build the adapter", &options);
        assert_eq!(args[0], "run");
        assert!(args.windows(2).any(|w| w == ["--max-parallel", "3"]));
        assert!(args.windows(2).any(|w| w == ["--attempt", "2"]));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(args.contains(&"--resume".to_string()));
        assert_eq!(args.last().unwrap(), "build the adapter");
    }

    #[test]
    fn test_quiet_flag_omitted_by_default() {
        let args = executor().build_args("goal", &ExecutorOptions::default());
        assert!(!args.contains(&"--quiet".to_string()));
        assert!(!args.contains(&"--resume".to_string()));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_rejection() {
        let executor = CommandExecutor::new(ExecutorConfig {
            binary_path: "/nonexistent/spec-executor".to_string(),
            extra_args: vec![],
            quiet: false,
        });
        let err = executor
            .execute("goal", &ExecutorOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ExecutorFailed(_)));
    }
}
