//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::DroverConfig;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid parallel default: {0}. Must be between 1 and 20")]
    InvalidParallel(u32),

    #[error("Invalid agent budget default: {0}. Must be between 1 and 500")]
    InvalidAgentBudget(u32),

    #[error("Invalid aging factor default: {0}. Must be between 0 and 100")]
    InvalidAgingFactor(u64),

    #[error("Invalid retry rounds default: {0}. Must be between 0 and 5")]
    InvalidRetryRounds(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Executor binary path cannot be empty")]
    EmptyExecutorBinary,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .drover/config.yaml (project config)
    /// 3. .drover/local.yaml (project local overrides, optional)
    /// 4. Environment variables (DROVER_* prefix, highest priority)
    pub fn load() -> Result<DroverConfig> {
        let config: DroverConfig = Figment::new()
            .merge(Serialized::defaults(DroverConfig::default()))
            .merge(Yaml::file(".drover/config.yaml"))
            .merge(Yaml::file(".drover/local.yaml"))
            .merge(Env::prefixed("DROVER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<DroverConfig> {
        let config: DroverConfig = Figment::new()
            .merge(Serialized::defaults(DroverConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &DroverConfig) -> Result<(), ConfigError> {
        if config.defaults.parallel == 0 || config.defaults.parallel > 20 {
            return Err(ConfigError::InvalidParallel(config.defaults.parallel));
        }
        if let Some(budget) = config.defaults.agent_budget {
            if budget == 0 || budget > 500 {
                return Err(ConfigError::InvalidAgentBudget(budget));
            }
        }
        if config.defaults.aging_factor > 100 {
            return Err(ConfigError::InvalidAgingFactor(config.defaults.aging_factor));
        }
        if config.defaults.retry_rounds > 5 {
            return Err(ConfigError::InvalidRetryRounds(config.defaults.retry_rounds));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
        match config.logging.format.as_str() {
            "json" | "pretty" => {}
            other => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        }

        if config.executor.binary_path.trim().is_empty() {
            return Err(ConfigError::EmptyExecutorBinary);
        }

        Ok(())
    }
}
