// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless menu actions that run against the live provider connection.
//!
//! Every provider call here is bounded by the registry's call deadline. A
//! fatal provider failure closes the user's handle; the user is told to sign
//! in again.

use tracing::{info, warn};

use tether_auth::{bounded, Prompt};
use tether_core::{Keyboard, ProviderError, TetherError, UserId};

use crate::AgentDeps;

/// Messages inspected per purge; only the user's own are deleted.
pub const PURGE_LIMIT: usize = 100;

/// Input a pending menu action is waiting for.
pub enum ActionState {
    /// "Send message": waiting for the recipient.
    AwaitSendTarget,
    /// "Send message": recipient known, waiting for the text.
    AwaitSendText { target: String },
    /// "Purge chat": waiting for the chat to purge.
    AwaitPurgeTarget,
}

/// The uniform reply for any action that needs a connection and has none.
pub(crate) fn not_authenticated() -> Vec<Prompt> {
    vec![Prompt::with_keyboard(
        "There is no connected account yet. Sign in first.",
        Keyboard::StartAuth,
    )]
}

/// Turns a classified provider failure into a reply, closing the handle when
/// the failure is fatal.
async fn provider_failure(
    deps: &AgentDeps,
    user: UserId,
    err: ProviderError,
    what: &str,
) -> Vec<Prompt> {
    warn!(%user, error = %err, "failed to {what}");
    if err.is_fatal() {
        deps.registry.close(user).await;
        vec![Prompt::with_keyboard(
            format!("Failed to {what}: {err}. The connection was closed; sign in again."),
            Keyboard::StartAuth,
        )]
    } else {
        vec![Prompt::text(format!("Failed to {what}: {err}."))]
    }
}

pub(crate) async fn account_info(
    deps: &AgentDeps,
    user: UserId,
) -> Result<Vec<Prompt>, TetherError> {
    let Some(conn) = deps.registry.get(user) else {
        return Ok(not_authenticated());
    };
    let result = {
        let guard = conn.lock().await;
        bounded(deps.registry.call_timeout(), guard.account_info()).await
    };
    match result {
        Ok(info) => {
            let username = info
                .username
                .map(|u| format!("@{u}"))
                .unwrap_or_else(|| "(no username)".to_string());
            Ok(vec![Prompt::with_keyboard(
                format!(
                    "Connected account:\n{} {}\nid {}",
                    info.first_name, username, info.id
                ),
                Keyboard::AccountActions,
            )])
        }
        Err(err) => Ok(provider_failure(deps, user, err, "fetch account info").await),
    }
}

pub(crate) async fn logout(deps: &AgentDeps, user: UserId) -> Result<Vec<Prompt>, TetherError> {
    match deps.registry.logout(user).await {
        Ok(true) => {
            info!(%user, "logged out");
            Ok(vec![Prompt::with_keyboard(
                "Logged out. The saved session was removed.",
                Keyboard::MainMenu,
            )])
        }
        Ok(false) => Ok(not_authenticated()),
        Err(err) => {
            warn!(%user, error = %err, "logout cleanup failed");
            Ok(vec![Prompt::text(format!(
                "Logged out, but cleanup reported an error: {err}."
            ))])
        }
    }
}

pub(crate) async fn send_message(
    deps: &AgentDeps,
    user: UserId,
    target: &str,
    text: &str,
) -> Result<Vec<Prompt>, TetherError> {
    let Some(conn) = deps.registry.get(user) else {
        return Ok(not_authenticated());
    };
    let result = {
        let guard = conn.lock().await;
        bounded(
            deps.registry.call_timeout(),
            guard.send_message(target, text),
        )
        .await
    };
    match result {
        Ok(()) => {
            info!(%user, target, "message sent");
            Ok(vec![Prompt::with_keyboard("Sent.", Keyboard::MainMenu)])
        }
        Err(err) => Ok(provider_failure(deps, user, err, "send the message").await),
    }
}

pub(crate) async fn purge(
    deps: &AgentDeps,
    user: UserId,
    chat: &str,
) -> Result<Vec<Prompt>, TetherError> {
    let Some(conn) = deps.registry.get(user) else {
        return Ok(not_authenticated());
    };
    let outcome = {
        let guard = conn.lock().await;
        match bounded(
            deps.registry.call_timeout(),
            guard.recent_own_messages(chat, PURGE_LIMIT),
        )
        .await
        {
            Ok(ids) if ids.is_empty() => Ok(None),
            Ok(ids) => bounded(
                deps.registry.call_timeout(),
                guard.delete_messages(chat, &ids),
            )
            .await
            .map(|()| Some(ids.len())),
            Err(err) => Err(err),
        }
    };
    match outcome {
        Ok(None) => Ok(vec![Prompt::with_keyboard(
            "Found none of your recent messages there; nothing deleted.",
            Keyboard::MainMenu,
        )]),
        Ok(Some(count)) => {
            info!(%user, chat, count, "purged own messages");
            Ok(vec![Prompt::with_keyboard(
                format!("Deleted {count} of your messages."),
                Keyboard::MainMenu,
            )])
        }
        Err(err) => Ok(provider_failure(deps, user, err, "purge the chat").await),
    }
}

pub(crate) async fn ghost_menu(deps: &AgentDeps, user: UserId) -> Result<Vec<Prompt>, TetherError> {
    let enabled = deps.storage.ghost_mode(user).await?;
    Ok(vec![Prompt::with_keyboard(
        format!("Ghost mode is {}.", if enabled { "on" } else { "off" }),
        Keyboard::GhostToggle { enabled },
    )])
}

pub(crate) async fn set_ghost(
    deps: &AgentDeps,
    user: UserId,
    enabled: bool,
) -> Result<Vec<Prompt>, TetherError> {
    deps.storage.set_ghost_mode(user, enabled).await?;
    info!(%user, enabled, "ghost mode updated");
    Ok(vec![Prompt::with_keyboard(
        format!("Ghost mode turned {}.", if enabled { "on" } else { "off" }),
        Keyboard::GhostToggle { enabled },
    )])
}
