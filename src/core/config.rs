//! Executor configuration
//!
//! All sections default sensibly, so an empty JSON object is a valid config.

use super::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for an [`Executor`](super::executor::Executor)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Parameter binding rules
    #[serde(default)]
    pub bind: BindOptions,

    /// Statement logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ExecutorConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ExecutorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.bind.true_literal == self.bind.false_literal {
            return Err(super::error::DatabaseError::config(format!(
                "true_literal and false_literal must differ (both are '{}')",
                self.bind.true_literal
            )));
        }
        Ok(())
    }
}

/// How caller-supplied values are coerced when bound to parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Text stored for `true`; the backing store keeps flags in string columns
    pub true_literal: String,
    /// Text stored for `false`
    pub false_literal: String,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            true_literal: "True".to_string(),
            false_literal: "False".to_string(),
        }
    }
}

impl BindOptions {
    /// Canonical literal for a boolean
    pub fn literal(&self, value: bool) -> &str {
        if value {
            &self.true_literal
        } else {
            &self.false_literal
        }
    }
}

/// Statement logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Register a [`LoggingInterceptor`](super::interceptor::LoggingInterceptor) automatically
    pub enabled: bool,
    /// Statements slower than this are logged at warn level
    pub slow_query_threshold_ms: u64,
    /// Include bound parameter values in log output
    pub log_parameters: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slow_query_threshold_ms: 1000,
            log_parameters: false,
        }
    }
}

impl LoggingConfig {
    /// Slow-statement threshold as a duration
    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DatabaseError;

    #[test]
    fn test_empty_json_yields_defaults() {
        let config = ExecutorConfig::from_json("{}").unwrap();
        assert_eq!(config, ExecutorConfig::default());
        assert_eq!(config.bind.literal(true), "True");
        assert_eq!(config.bind.literal(false), "False");
        assert!(config.logging.enabled);
    }

    #[test]
    fn test_partial_sections() {
        let config = ExecutorConfig::from_json(
            r#"{ "bind": { "true_literal": "Y", "false_literal": "N" },
                 "logging": { "slow_query_threshold_ms": 250 } }"#,
        )
        .unwrap();
        assert_eq!(config.bind.literal(true), "Y");
        assert_eq!(
            config.logging.slow_query_threshold(),
            Duration::from_millis(250)
        );
        assert!(!config.logging.log_parameters);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ExecutorConfig::from_json(r#"{ "bind": { "true_literal": "X", "false_literal": "X" } }"#)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Config(_)));

        let err = ExecutorConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, DatabaseError::Config(_)));
    }
}
