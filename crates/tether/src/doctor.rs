// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether doctor` command implementation.
//!
//! Runs diagnostic checks against the environment to identify configuration
//! issues before `serve` is attempted.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use tether_config::model::TelegramConfig;
use tether_config::TetherConfig;
use tether_core::{HealthStatus, PluginAdapter, StorageAdapter, TetherError};
use tether_storage::SqliteStorage;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

/// Run the `tether doctor` command.
///
/// With `--plain`, disables colored output.
pub async fn run_doctor(config: &TetherConfig, plain: bool) -> Result<(), TetherError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_config(),
        check_database(config).await,
        check_session_dir(&config.provider.session_dir),
        check_telegram(&config.telegram),
    ];

    println!();
    println!("  tether doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;

    for result in &results {
        let duration_ms = result.duration.as_millis();
        let line = match result.status {
            CheckStatus::Pass => {
                if use_color {
                    use colored::Colorize;
                    format!(
                        "    {} {:<16} {} ({duration_ms}ms)",
                        "✓".green(),
                        result.name,
                        result.message
                    )
                } else {
                    format!(
                        "    [OK]   {:<16} {} ({duration_ms}ms)",
                        result.name, result.message
                    )
                }
            }
            CheckStatus::Warn => {
                warn_count += 1;
                if use_color {
                    use colored::Colorize;
                    format!(
                        "    {} {:<16} {} ({duration_ms}ms)",
                        "!".yellow(),
                        result.name,
                        result.message.yellow()
                    )
                } else {
                    format!(
                        "    [WARN] {:<16} {} ({duration_ms}ms)",
                        result.name, result.message
                    )
                }
            }
            CheckStatus::Fail => {
                fail_count += 1;
                if use_color {
                    use colored::Colorize;
                    format!(
                        "    {} {:<16} {} ({duration_ms}ms)",
                        "✗".red(),
                        result.name,
                        result.message.red()
                    )
                } else {
                    format!(
                        "    [FAIL] {:<16} {} ({duration_ms}ms)",
                        result.name, result.message
                    )
                }
            }
        };
        println!("{line}");
    }

    println!("  {}", "-".repeat(50));
    println!(
        "  {} checks, {} warnings, {} failures",
        results.len(),
        warn_count,
        fail_count
    );
    println!();

    if fail_count > 0 {
        return Err(TetherError::Config(format!(
            "{fail_count} diagnostic check(s) failed"
        )));
    }
    Ok(())
}

fn check_config() -> CheckResult {
    // Reaching doctor at all means load_and_validate succeeded.
    CheckResult {
        name: "config".into(),
        status: CheckStatus::Pass,
        message: "configuration valid".into(),
        duration: Duration::ZERO,
    }
}

async fn check_database(config: &TetherConfig) -> CheckResult {
    let start = Instant::now();
    let storage = SqliteStorage::new(config.storage.clone());

    let outcome = async {
        storage.initialize().await?;
        let health = storage.health_check().await?;
        storage.shutdown().await?;
        Ok::<HealthStatus, TetherError>(health)
    }
    .await;

    match outcome {
        Ok(HealthStatus::Healthy) => CheckResult {
            name: "database".into(),
            status: CheckStatus::Pass,
            message: format!("opened and migrated {}", config.storage.database_path),
            duration: start.elapsed(),
        },
        Ok(other) => CheckResult {
            name: "database".into(),
            status: CheckStatus::Warn,
            message: format!("health check reported {other:?}"),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name: "database".into(),
            status: CheckStatus::Fail,
            message: e.to_string(),
            duration: start.elapsed(),
        },
    }
}

fn check_session_dir(session_dir: &str) -> CheckResult {
    let start = Instant::now();
    let dir = std::path::Path::new(session_dir);
    let probe = dir.join(".doctor-probe");

    let outcome = std::fs::create_dir_all(dir)
        .and_then(|()| std::fs::write(&probe, b"probe"))
        .and_then(|()| std::fs::remove_file(&probe));

    match outcome {
        Ok(()) => CheckResult {
            name: "session_dir".into(),
            status: CheckStatus::Pass,
            message: format!("{session_dir} is writable"),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name: "session_dir".into(),
            status: CheckStatus::Fail,
            message: format!("{session_dir}: {e}"),
            duration: start.elapsed(),
        },
    }
}

fn check_telegram(config: &TelegramConfig) -> CheckResult {
    let start = Instant::now();
    match &config.bot_token {
        None => CheckResult {
            name: "telegram".into(),
            status: CheckStatus::Fail,
            message: "telegram.bot_token is not set".into(),
            duration: start.elapsed(),
        },
        Some(_) if config.allowed_users.is_empty() => CheckResult {
            name: "telegram".into(),
            status: CheckStatus::Warn,
            message: "allowed_users is empty; every sender will be rejected".into(),
            duration: start.elapsed(),
        },
        Some(_) => CheckResult {
            name: "telegram".into(),
            status: CheckStatus::Pass,
            message: format!("token set, {} allowed user(s)", config.allowed_users.len()),
            duration: start.elapsed(),
        },
    }
}
