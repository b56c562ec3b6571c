use std::env;
use std::fmt;

use crate::workflows::coverage::evaluation::{EvaluationConfig, RetryPolicy};

/// Top-level runtime configuration for the evaluation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub telemetry: TelemetryConfig,
    pub matching: MatchRuntimeConfig,
}

impl EngineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let log_level = env::var("PRIORAUTH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let concurrency_limit = env::var("PRIORAUTH_CONCURRENCY_LIMIT")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit >= 1)
            .ok_or(ConfigError::InvalidConcurrencyLimit)?;

        let retry_attempts = env::var("PRIORAUTH_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .ok()
            .filter(|attempts| (1..=10).contains(attempts))
            .ok_or(ConfigError::InvalidRetryAttempts)?;

        let retry_base_delay_ms = env::var("PRIORAUTH_RETRY_BASE_DELAY_MS")
            .unwrap_or_else(|_| "200".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidRetryDelay)?;

        Ok(Self {
            telemetry: TelemetryConfig { log_level },
            matching: MatchRuntimeConfig {
                concurrency_limit,
                retry_attempts,
                retry_base_delay_ms,
            },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings controlling collaborator fan-out and retry behavior.
#[derive(Debug, Clone)]
pub struct MatchRuntimeConfig {
    pub concurrency_limit: usize,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl MatchRuntimeConfig {
    /// Evaluation dials with the configured fan-out width; threshold values
    /// keep their contract defaults.
    pub fn evaluation_config(&self) -> EvaluationConfig {
        EvaluationConfig {
            concurrency_limit: self.concurrency_limit,
            ..EvaluationConfig::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay_ms: self.retry_base_delay_ms,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidConcurrencyLimit,
    InvalidRetryAttempts,
    InvalidRetryDelay,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidConcurrencyLimit => {
                write!(f, "PRIORAUTH_CONCURRENCY_LIMIT must be an integer >= 1")
            }
            ConfigError::InvalidRetryAttempts => {
                write!(f, "PRIORAUTH_RETRY_ATTEMPTS must be an integer in 1..=10")
            }
            ConfigError::InvalidRetryDelay => {
                write!(f, "PRIORAUTH_RETRY_BASE_DELAY_MS must be a valid u64")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
