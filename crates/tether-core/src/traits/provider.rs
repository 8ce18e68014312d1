// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity provider traits: the abstract capability surface of the external
//! messaging network the secondary account authenticates against.
//!
//! Implementations classify every library- or wire-level failure into a
//! [`ProviderError`] at this boundary; callers branch on the classified kind
//! and never see provider-specific error types.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{
    AccountInfo, CodeSent, Credentials, DeliveryChannel, SignIn, UserId,
};

/// Factory for live connections to the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Opens a connection for one user's secondary account.
    ///
    /// The returned connection is connected but not yet authorized unless a
    /// previously saved provider session artifact was still valid.
    async fn connect(
        &self,
        user: UserId,
        credentials: &Credentials,
        phone: &str,
    ) -> Result<Box<dyn ProviderConnection>, ProviderError>;

    /// Removes any on-disk session artifact for the user.
    ///
    /// Idempotent; called before every fresh connect so a stale session is
    /// never reused across a new authentication attempt.
    async fn drop_session(&self, user: UserId) -> Result<(), ProviderError>;
}

/// A live, stateful connection to the identity provider for one user.
///
/// Held exclusively by the session registry; all access is serialized per
/// user, so methods may take `&mut self` freely.
#[async_trait]
pub trait ProviderConnection: Send + Sync {
    /// Requests a verification code for the phone number.
    async fn send_code(&mut self, phone: &str) -> Result<CodeSent, ProviderError>;

    /// Re-issues the pending code-send, optionally preferring a different
    /// delivery channel. Returns a fresh delivery token.
    async fn resend_code(
        &mut self,
        phone: &str,
        delivery_token: &str,
        prefer: Option<DeliveryChannel>,
    ) -> Result<CodeSent, ProviderError>;

    /// Attempts sign-in with the code the user received.
    async fn sign_in(
        &mut self,
        phone: &str,
        delivery_token: &str,
        code: &str,
    ) -> Result<SignIn, ProviderError>;

    /// Verifies the second-factor password after [`SignIn::PasswordNeeded`].
    async fn verify_password(&mut self, password: &str) -> Result<AccountInfo, ProviderError>;

    /// Details of the authenticated account.
    async fn account_info(&self) -> Result<AccountInfo, ProviderError>;

    /// Whether the connection has completed authentication.
    fn is_authorized(&self) -> bool;

    /// Sends a text message from the secondary identity.
    async fn send_message(&self, chat: &str, text: &str) -> Result<(), ProviderError>;

    /// Ids of the most recent messages in `chat` authored by the secondary
    /// identity itself, newest first, at most `limit`.
    async fn recent_own_messages(
        &self,
        chat: &str,
        limit: usize,
    ) -> Result<Vec<i64>, ProviderError>;

    /// Deletes the given messages in `chat`.
    async fn delete_messages(&self, chat: &str, ids: &[i64]) -> Result<(), ProviderError>;

    /// Terminates the provider-side authorization.
    async fn log_out(&mut self) -> Result<(), ProviderError>;

    /// Closes the transport connection. Idempotent.
    async fn disconnect(&mut self) -> Result<(), ProviderError>;
}
