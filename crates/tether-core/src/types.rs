// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Tether framework.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque identifier for a chat participant; primary key for all per-user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Long-lived API identifier/secret pair for the identity provider.
///
/// Persisted per user on first successful parse and reused for every later
/// authentication attempt until explicitly overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
}

/// Medium through which a verification code was delivered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryChannel {
    Sms,
    Call,
    App,
    Unknown,
}

/// Result of a successful code-send or code-resend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSent {
    /// Opaque token identifying the pending code-send operation to the provider.
    pub delivery_token: String,
    pub channel: DeliveryChannel,
}

/// Account details of the authenticated secondary identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

/// Outcome of a sign-in attempt that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignIn {
    /// Sign-in complete; the connection is now authenticated.
    Authorized(AccountInfo),
    /// The account has two-step verification enabled; a password turn follows.
    PasswordNeeded,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
}

// --- Conversation turn types ---

/// Payload of one inbound conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnContent {
    /// Free text typed by the user (menu labels included).
    Text(String),
    /// Callback identifier of a selected inline option.
    Selection(String),
}

/// One user turn received from the conversation channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundTurn {
    pub user: UserId,
    /// Channel-level address replies go back to.
    pub chat_id: String,
    pub content: TurnContent,
}

/// A response to deliver through the conversation channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundTurn {
    pub chat_id: String,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutboundTurn {
    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(
        chat_id: impl Into<String>,
        text: impl Into<String>,
        keyboard: Keyboard,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Abstract option sets the channel adapter renders natively.
///
/// The dispatcher and state machine never deal in channel-specific markup;
/// they name one of these layouts and the adapter draws it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// The fixed main menu of selectable labels.
    MainMenu,
    /// Single inline option offering to start authentication.
    StartAuth,
    /// Inline options shown while a code is pending: resend and delivery
    /// channel re-selection.
    CodeOptions,
    /// Inline on/off toggle for ghost mode, rendered against the current flag.
    GhostToggle { enabled: bool },
    /// Inline options attached to the account info card (log out).
    AccountActions,
}

/// Callback ids and menu labels shared by the dispatcher and channel adapters.
///
/// The adapter renders these into native buttons; the dispatcher matches on
/// them when a turn comes back.
pub mod menu {
    pub const CB_AUTH_START: &str = "auth:start";
    pub const CB_RESEND: &str = "auth:resend";
    pub const CB_RESEND_SMS: &str = "auth:resend:sms";
    pub const CB_RESEND_CALL: &str = "auth:resend:call";
    pub const CB_GHOST_ON: &str = "ghost:on";
    pub const CB_GHOST_OFF: &str = "ghost:off";
    pub const CB_LOGOUT: &str = "account:logout";

    pub const LABEL_SIGN_IN: &str = "Sign in";
    pub const LABEL_ACCOUNT: &str = "Account";
    pub const LABEL_SEND: &str = "Send message";
    pub const LABEL_PURGE: &str = "Purge chat";
    pub const LABEL_GHOST: &str = "Ghost mode";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn delivery_channel_round_trips_through_strings() {
        for channel in [
            DeliveryChannel::Sms,
            DeliveryChannel::Call,
            DeliveryChannel::App,
            DeliveryChannel::Unknown,
        ] {
            let s = channel.to_string();
            assert_eq!(DeliveryChannel::from_str(&s).unwrap(), channel);
        }
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        for at in [AdapterType::Channel, AdapterType::Provider, AdapterType::Storage] {
            let s = at.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), at);
        }
    }

    #[test]
    fn user_id_displays_raw_integer() {
        assert_eq!(UserId(42).to_string(), "42");
    }

    #[test]
    fn credentials_serialize_round_trip() {
        let creds = Credentials {
            api_id: 12345,
            api_hash: "abcdef0123456789".into(),
        };
        let json = serde_json::to_string(&creds).unwrap();
        let parsed: Credentials = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, creds);
    }
}
