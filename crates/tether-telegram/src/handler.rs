// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn routing, allow-list filtering, and content extraction.
//!
//! Determines whether an incoming Telegram update should be processed based
//! on the allow-list and chat type, then extracts it into a channel-agnostic
//! [`InboundTurn`].

use teloxide::prelude::*;
use teloxide::types::{ChatKind, User};

use tether_core::{InboundTurn, TurnContent, UserId};

/// Checks whether the sender is on the allow-list.
///
/// A sender passes if their user id (as string) or username matches any
/// entry. An empty allow-list rejects everyone (secure default). Updates
/// without a sender always return `false`.
pub fn is_allowed(from: Option<&User>, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return false;
    }

    let Some(user) = from else {
        return false;
    };

    let user_id_str = user.id.0.to_string();

    for allowed in allowed_users {
        // Match by user ID
        if *allowed == user_id_str {
            return true;
        }
        // Match by username (with or without @ prefix)
        if let Some(ref username) = user.username {
            let allowed_clean = allowed.strip_prefix('@').unwrap_or(allowed);
            if username.eq_ignore_ascii_case(allowed_clean) {
                return true;
            }
        }
    }

    false
}

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Converts a Telegram text message into an [`InboundTurn`].
///
/// Returns `None` for media and other unsupported message types; the bot
/// dialogue is text-only.
pub fn to_inbound_turn(msg: &Message) -> Option<InboundTurn> {
    let text = msg.text()?;
    let user = msg.from.as_ref()?;

    Some(InboundTurn {
        user: UserId(user.id.0 as i64),
        chat_id: msg.chat.id.0.to_string(),
        content: TurnContent::Text(text.to_string()),
    })
}

/// Converts an inline-button press into an [`InboundTurn`] selection.
///
/// Replies go to the chat the button lived in; when the original message is
/// no longer accessible the DM chat id equals the user id.
pub fn callback_to_turn(q: &CallbackQuery) -> Option<InboundTurn> {
    let data = q.data.as_ref()?;
    let chat_id = match &q.message {
        Some(m) => m.chat().id.0,
        None => q.from.id.0 as i64,
    };

    Some(InboundTurn {
        user: UserId(q.from.id.0 as i64),
        chat_id: chat_id.to_string(),
        content: TurnContent::Selection(data.clone()),
    })
}
