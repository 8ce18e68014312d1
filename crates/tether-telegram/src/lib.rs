// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram conversation-channel adapter for Tether.
//!
//! Implements [`ConversationChannel`] over the Telegram Bot API via teloxide:
//! long polling, DM-only routing with an allow-list, and native rendering of
//! the abstract keyboards (reply keyboard for the main menu, inline keyboards
//! for option sets).

pub mod handler;
pub mod keyboard;

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tether_config::model::TelegramConfig;
use tether_core::{
    AdapterType, ConversationChannel, HealthStatus, InboundTurn, OutboundTurn, PluginAdapter,
    TetherError,
};

/// Telegram channel adapter implementing [`ConversationChannel`].
pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundTurn>>,
    inbound_tx: mpsc::Sender<InboundTurn>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, TetherError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            TetherError::Config("telegram.bot_token is required for the Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(TetherError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TetherError> {
        // Check if the bot token is valid by calling getMe.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), TetherError> {
        debug!("Telegram channel shutting down");
        // The polling handle is dropped with the adapter, which aborts the
        // task. For graceful shutdown the agent loop stops calling receive()
        // first.
        Ok(())
    }
}

#[async_trait]
impl ConversationChannel for TelegramChannel {
    async fn connect(&mut self) -> Result<(), TetherError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let allowed_users: Arc<Vec<String>> = Arc::new(self.config.allowed_users.clone());

        let msg_tx = self.inbound_tx.clone();
        let msg_allowed = allowed_users.clone();
        let message_branch = Update::filter_message().endpoint(move |msg: Message| {
            let tx = msg_tx.clone();
            let allowed = msg_allowed.clone();
            async move {
                // Filter: DMs only
                if !handler::is_dm(&msg) {
                    debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                    return respond(());
                }

                // Filter: allow-listed users only
                if !handler::is_allowed(msg.from.as_ref(), &allowed) {
                    debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
                    return respond(());
                }

                match handler::to_inbound_turn(&msg) {
                    Some(turn) => {
                        if tx.send(turn).await.is_err() {
                            warn!("inbound channel closed, dropping message");
                        }
                    }
                    None => {
                        debug!(msg_id = msg.id.0, "ignoring unsupported message type");
                    }
                }

                respond(())
            }
        });

        let cb_tx = self.inbound_tx.clone();
        let cb_allowed = allowed_users.clone();
        let callback_branch =
            Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let tx = cb_tx.clone();
                let allowed = cb_allowed.clone();
                async move {
                    // Stop the client-side spinner regardless of outcome.
                    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                        debug!(error = %e, "failed to answer callback query");
                    }

                    if !handler::is_allowed(Some(&q.from), &allowed) {
                        debug!(user_id = q.from.id.0, "ignoring unauthorized callback");
                        return respond(());
                    }

                    if let Some(turn) = handler::callback_to_turn(&q)
                        && tx.send(turn).await.is_err()
                    {
                        warn!("inbound channel closed, dropping callback");
                    }

                    respond(())
                }
            });

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let tree = dptree::entry()
                .branch(message_branch)
                .branch(callback_branch);

            Dispatcher::builder(bot, tree)
                .default_handler(|_| async {}) // Silently ignore other updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, turn: OutboundTurn) -> Result<(), TetherError> {
        let chat_id = parse_chat_id(&turn.chat_id)?;

        let mut request = self.bot.send_message(Recipient::Id(chat_id), &turn.text);
        if let Some(kb) = turn.keyboard {
            request = request.reply_markup(keyboard::render(kb));
        }
        request.await.map_err(|e| TetherError::Channel {
            message: format!("failed to send message: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(())
    }

    async fn receive(&self) -> Result<InboundTurn, TetherError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or(TetherError::ChannelClosed)
    }
}

fn parse_chat_id(raw: &str) -> Result<ChatId, TetherError> {
    raw.parse::<i64>().map(ChatId).map_err(|e| TetherError::Channel {
        message: format!("invalid chat_id {raw:?}: {e}"),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_bot_token() {
        let config = TelegramConfig {
            bot_token: None,
            allowed_users: vec![],
        };
        assert!(TelegramChannel::new(config).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        let config = TelegramConfig {
            bot_token: Some(String::new()),
            allowed_users: vec![],
        };
        assert!(TelegramChannel::new(config).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let config = TelegramConfig {
            bot_token: Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11".into()),
            allowed_users: vec!["user1".into()],
        };
        assert!(TelegramChannel::new(config).is_ok());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let config = TelegramConfig {
            bot_token: Some("test:token".into()),
            allowed_users: vec![],
        };
        let channel = TelegramChannel::new(config).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }

    #[test]
    fn parse_chat_id_accepts_integers_only() {
        assert_eq!(parse_chat_id("12345").unwrap(), ChatId(12345));
        assert_eq!(parse_chat_id("-100123").unwrap(), ChatId(-100123));
        assert!(parse_chat_id("telegram").is_err());
    }
}
