// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Tether.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tether configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TetherConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Identity provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "tether".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required for the Telegram channel adapter.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// User ids or usernames allowed to talk to the bot.
    /// Empty list rejects everyone (secure default).
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Directory holding per-user provider session artifacts.
    #[serde(default = "default_session_dir")]
    pub session_dir: String,

    /// Deadline for the initial connect call, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for every other provider call, in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            session_dir: default_session_dir(),
            connect_timeout_secs: default_connect_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

fn default_session_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("tether/sessions").display().to_string())
        .unwrap_or_else(|| "./sessions".to_string())
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_call_timeout_secs() -> u64 {
    25
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Whether to enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("tether/tether.db").display().to_string())
        .unwrap_or_else(|| "./tether.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = TetherConfig::default();
        assert_eq!(config.agent.name, "tether");
        assert_eq!(config.agent.log_level, "info");
        assert!(config.telegram.bot_token.is_none());
        assert!(config.telegram.allowed_users.is_empty());
        assert_eq!(config.provider.connect_timeout_secs, 30);
        assert_eq!(config.provider.call_timeout_secs, 25);
        assert!(config.storage.wal_mode);
        assert!(!config.storage.database_path.is_empty());
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let mut config = TetherConfig::default();
        config.telegram.bot_token = Some("123:abc".into());
        config.telegram.allowed_users = vec!["42".into(), "@someone".into()];

        let serialized = toml::to_string(&config).unwrap();
        let parsed: TetherConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(parsed.telegram.allowed_users.len(), 2);
    }
}
