//! Drover configuration model.
//!
//! Loaded by the figment-based config loader with hierarchical merging;
//! every section has serde defaults so a missing config file is valid.

use serde::{Deserialize, Serialize};

use super::gate::GateOverrides;
use super::plan::SchedulingStrategy;
use super::retry::RetryStrategy;

/// Main configuration structure for drover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DroverConfig {
    /// External executor invocation settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Default batch tunables (CLI flags override)
    #[serde(default)]
    pub defaults: BatchDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-profile gate threshold overrides
    #[serde(default)]
    pub gate_profiles: GateProfileOverrides,
}

/// How the external goal executor is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Path to the executor binary
    #[serde(default = "default_executor_binary")]
    pub binary_path: String,

    /// Extra arguments prepended to every invocation
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Pass `--quiet` to the executor
    #[serde(default)]
    pub quiet: bool,
}

fn default_executor_binary() -> String {
    "spec-executor".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            binary_path: default_executor_binary(),
            extra_args: vec![],
            quiet: false,
        }
    }
}

/// Default batch tunables, overridable per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchDefaults {
    /// Concurrent goal slots requested (1-20)
    #[serde(default = "default_parallel")]
    pub parallel: u32,

    /// Agent budget; absent means unbudgeted
    #[serde(default)]
    pub agent_budget: Option<u32>,

    #[serde(default)]
    pub strategy: SchedulingStrategy,

    /// Priority units added per wait tick (0-100)
    #[serde(default)]
    pub aging_factor: u64,

    /// Additional retry rounds (0-5)
    #[serde(default = "default_retry_rounds")]
    pub retry_rounds: u32,

    #[serde(default)]
    pub retry_strategy: RetryStrategy,

    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
}

const fn default_parallel() -> u32 {
    2
}

const fn default_retry_rounds() -> u32 {
    1
}

const fn default_continue_on_error() -> bool {
    true
}

impl Default for BatchDefaults {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            agent_budget: None,
            strategy: SchedulingStrategy::default(),
            aging_factor: 0,
            retry_rounds: default_retry_rounds(),
            retry_strategy: RetryStrategy::default(),
            continue_on_error: default_continue_on_error(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One of: json, pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Optional per-profile threshold overrides from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GateProfileOverrides {
    #[serde(default)]
    pub strict: GateOverrides,
    #[serde(default)]
    pub standard: GateOverrides,
    #[serde(default)]
    pub lenient: GateOverrides,
}

impl GateProfileOverrides {
    /// Overrides configured for the named profile.
    pub fn for_profile(&self, profile: super::gate::GateProfile) -> GateOverrides {
        match profile {
            super::gate::GateProfile::Strict => self.strict,
            super::gate::GateProfile::Standard => self.standard,
            super::gate::GateProfile::Lenient => self.lenient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DroverConfig::default();
        assert_eq!(config.defaults.parallel, 2);
        assert_eq!(config.defaults.retry_rounds, 1);
        assert!(config.defaults.continue_on_error);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.executor.binary_path, "spec-executor");
    }

    #[test]
    fn test_config_deserializes_from_partial_yaml_shape() {
        let json = serde_json::json!({
            "defaults": { "parallel": 4 },
            "logging": { "level": "debug" }
        });
        let config: DroverConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.defaults.parallel, 4);
        assert_eq!(config.defaults.retry_rounds, 1);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
    }
}
