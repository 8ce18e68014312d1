// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation channel trait for the chat transport (Telegram, etc.).

use async_trait::async_trait;

use crate::error::TetherError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundTurn, OutboundTurn};

/// Adapter for the chat transport that carries the bot dialogue.
///
/// The channel delivers one tagged turn at a time per user and renders
/// abstract keyboards natively; everything above this trait is transport
/// agnostic.
#[async_trait]
pub trait ConversationChannel: PluginAdapter {
    /// Establishes the connection to the chat platform and starts polling.
    async fn connect(&mut self) -> Result<(), TetherError>;

    /// Delivers a response, rendering the attached keyboard if any.
    async fn send(&self, turn: OutboundTurn) -> Result<(), TetherError>;

    /// Receives the next inbound turn from any user.
    async fn receive(&self) -> Result<InboundTurn, TetherError>;
}
