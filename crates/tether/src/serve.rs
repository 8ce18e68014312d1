// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tether serve` command implementation: adapter wiring and the main loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tether_agent::{recording, shutdown, AgentDeps, AgentLoop};
use tether_auth::SessionRegistry;
use tether_config::TetherConfig;
use tether_core::{ConversationChannel, IdentityProvider, StorageAdapter, TetherError};
use tether_storage::SqliteStorage;

use crate::provider::UnconfiguredProvider;

/// Wires storage, provider, registry, and the channel adapter, then runs the
/// agent loop until a shutdown signal arrives.
pub async fn run_serve(config: TetherConfig) -> Result<(), TetherError> {
    info!(agent_name = config.agent.name.as_str(), "starting tether");
    recording::describe_metrics();

    let storage: Arc<dyn StorageAdapter> = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let provider: Arc<dyn IdentityProvider> =
        Arc::new(UnconfiguredProvider::new(config.provider.session_dir.clone()));
    let registry = Arc::new(SessionRegistry::new(
        provider,
        Duration::from_secs(config.provider.connect_timeout_secs),
        Duration::from_secs(config.provider.call_timeout_secs),
    ));

    let channel = build_channel(&config).await?;

    let deps = Arc::new(AgentDeps::new(storage, registry));
    let mut agent = AgentLoop::new(channel, deps);

    let cancel = shutdown::install_signal_handler();
    agent.run(cancel).await
}

#[cfg(feature = "telegram")]
async fn build_channel(config: &TetherConfig) -> Result<Arc<dyn ConversationChannel>, TetherError> {
    let mut channel = tether_telegram::TelegramChannel::new(config.telegram.clone())?;
    channel.connect().await?;
    Ok(Arc::new(channel))
}

#[cfg(not(feature = "telegram"))]
async fn build_channel(_config: &TetherConfig) -> Result<Arc<dyn ConversationChannel>, TetherError> {
    Err(TetherError::Config(
        "no channel adapter is compiled into this build (enable the `telegram` feature)".into(),
    ))
}
