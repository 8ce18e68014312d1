// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Tether.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Tether adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Conversation channel errors (connection failure, message format, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The conversation channel has shut down; no further turns will arrive.
    #[error("conversation channel closed")]
    ChannelClosed,

    /// Identity provider errors, classified at the provider call boundary.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Classified outcome of a failed identity provider call.
///
/// Every provider implementation maps its library- or wire-level failures into
/// exactly one of these variants at the call boundary; nothing downstream
/// inspects provider-specific error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The verification code was rejected by the provider.
    #[error("the confirmation code is not valid")]
    InvalidCode,

    /// The verification code expired; a resend is required.
    #[error("the confirmation code has expired")]
    ExpiredCode,

    /// The provider rejected the phone number.
    #[error("the phone number was rejected by the provider")]
    InvalidPhone,

    /// The two-step password did not match.
    #[error("the two-step password is not correct")]
    WrongPassword,

    /// The account demands a password but has none configured.
    #[error("the account requires a password but none is set")]
    NoPasswordSet,

    /// The provider asked us to back off before retrying.
    #[error("rate limited, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The call did not complete within the configured deadline.
    #[error("provider call timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Transport-level failure (connection refused, reset, DNS, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// Anything the provider boundary could not classify.
    #[error("provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether this error aborts an authentication flow outright.
    ///
    /// Non-fatal variants are handled in place by the state machine
    /// (re-prompt, resend hint, or wait message); fatal variants return the
    /// conversation to idle and tear down any half-open connection.
    pub fn is_fatal(&self) -> bool {
        match self {
            ProviderError::InvalidCode
            | ProviderError::ExpiredCode
            | ProviderError::WrongPassword
            | ProviderError::RateLimited { .. } => false,
            ProviderError::InvalidPhone
            | ProviderError::NoPasswordSet
            | ProviderError::Timeout { .. }
            | ProviderError::Network(_)
            | ProviderError::Other(_) => true,
        }
    }
}
