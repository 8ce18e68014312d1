// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and non-zero timeouts.

use crate::diagnostic::ConfigError;
use crate::model::TetherConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TetherConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.agent.log_level
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.provider.session_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "provider.session_dir must not be empty".to_string(),
        });
    }

    if config.provider.connect_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.connect_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.provider.call_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.call_timeout_secs must be at least 1".to_string(),
        });
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TetherConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors_without_failing_fast() {
        let mut config = TetherConfig::default();
        config.agent.log_level = "loud".into();
        config.storage.database_path = " ".into();
        config.provider.connect_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_bot_token_is_rejected() {
        let mut config = TetherConfig::default();
        config.telegram.bot_token = Some("  ".into());
        assert!(validate_config(&config).is_err());
    }
}
