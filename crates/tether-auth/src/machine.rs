// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The multi-step authentication state machine.
//!
//! Each user's progress is a value of [`AuthState`]; every variant carries
//! exactly the data that step needs, so a stale field from an earlier attempt
//! cannot leak into a later one. The machine is pure orchestration: it owns no
//! connections (the registry does) and no durable data (storage does).

use std::sync::Arc;

use tracing::{info, warn};

use tether_core::{
    Credentials, DeliveryChannel, Keyboard, ProviderError, SignIn, StorageAdapter, TetherError,
    TurnContent, UserId,
};

use crate::code::{normalize_code, normalize_phone, parse_credentials};
use crate::registry::{bounded, SessionRegistry};

/// Strikes allowed for provider-rejected codes and wrong passwords alike.
pub const MAX_ATTEMPTS: u8 = 3;

pub use tether_core::menu::{CB_AUTH_START, CB_RESEND, CB_RESEND_CALL, CB_RESEND_SMS};

/// Where one user currently stands in the authentication flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Not authenticating. The user may still hold a live connection.
    Idle,
    /// Waiting for an `"<api_id> <api_hash>"` pair.
    AwaitingCredentials,
    /// Waiting for the phone number of the secondary account.
    AwaitingPhone { credentials: Credentials },
    /// A code is pending with the provider; waiting for the user to type it.
    AwaitingCode { session: AuthSession },
    /// Sign-in passed the code step; waiting for the two-step password.
    AwaitingPassword { session: AuthSession },
}

impl AuthState {
    /// Whether an authentication flow is in progress.
    pub fn in_progress(&self) -> bool {
        !matches!(self, AuthState::Idle)
    }
}

/// In-flight code-send bookkeeping carried by the code and password steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub phone: String,
    pub delivery_token: String,
    pub channel: DeliveryChannel,
    /// Provider-rejected attempts at the current step.
    pub attempts: u8,
}

/// One reply the dispatcher should deliver after a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

fn wait_prompt(retry_after: std::time::Duration) -> Prompt {
    Prompt::text(format!(
        "The provider is rate limiting this number. Wait about {} seconds and try again.",
        retry_after.as_secs().max(1)
    ))
}

fn aborted_prompt(reason: impl std::fmt::Display) -> Prompt {
    Prompt::text(format!(
        "Authentication failed: {reason}. Send /start to try again."
    ))
}

fn success_prompt(first_name: &str) -> Prompt {
    Prompt::with_keyboard(
        format!("Signed in as {first_name}. The account is now connected."),
        Keyboard::MainMenu,
    )
}

/// Drives [`AuthState`] transitions against storage and the session registry.
pub struct AuthMachine {
    storage: Arc<dyn StorageAdapter>,
    registry: Arc<SessionRegistry>,
}

impl AuthMachine {
    pub fn new(storage: Arc<dyn StorageAdapter>, registry: Arc<SessionRegistry>) -> Self {
        Self { storage, registry }
    }

    /// Starts (or restarts) the flow for a user.
    ///
    /// Saved credentials skip the credentials step entirely; the phone step is
    /// never skipped because the number selects which account to sign in.
    pub async fn begin(&self, user: UserId) -> Result<(AuthState, Vec<Prompt>), TetherError> {
        match self.storage.credentials(user).await? {
            Some(credentials) => Ok((
                AuthState::AwaitingPhone { credentials },
                vec![Prompt::text(
                    "Using your saved API credentials. Send the phone number of the account \
                     to connect (international format).",
                )],
            )),
            None => Ok((
                AuthState::AwaitingCredentials,
                vec![Prompt::text(
                    "Send your API credentials as one message: \"<api_id> <api_hash>\".",
                )],
            )),
        }
    }

    /// Feeds one user turn into the machine, returning the next state and the
    /// replies to deliver.
    ///
    /// Storage failures are fatal and propagate; provider failures are already
    /// classified and handled per kind.
    pub async fn on_turn(
        &self,
        user: UserId,
        state: AuthState,
        content: &TurnContent,
    ) -> Result<(AuthState, Vec<Prompt>), TetherError> {
        match (state, content) {
            (AuthState::AwaitingCredentials, TurnContent::Text(text)) => {
                self.on_credentials(user, text).await
            }
            (AuthState::AwaitingPhone { credentials }, TurnContent::Text(text)) => {
                self.on_phone(user, credentials, text).await
            }
            (AuthState::AwaitingCode { session }, TurnContent::Text(text)) => {
                self.on_code(user, session, text).await
            }
            (AuthState::AwaitingCode { session }, TurnContent::Selection(cb)) => {
                self.on_code_selection(user, session, cb).await
            }
            (AuthState::AwaitingPassword { session }, TurnContent::Text(text)) => {
                self.on_password(user, session, text).await
            }
            (state, _) => Ok((
                state,
                vec![Prompt::text("Please answer the pending question, or send /start to restart.")],
            )),
        }
    }

    async fn on_credentials(
        &self,
        user: UserId,
        text: &str,
    ) -> Result<(AuthState, Vec<Prompt>), TetherError> {
        let Some((api_id, api_hash)) = parse_credentials(text) else {
            return Ok((
                AuthState::AwaitingCredentials,
                vec![Prompt::text(
                    "That doesn't look right. Send exactly two values: a numeric api_id and \
                     an api_hash, separated by a space.",
                )],
            ));
        };
        let credentials = Credentials { api_id, api_hash };
        self.storage.put_credentials(user, &credentials).await?;
        info!(%user, "credentials saved");
        Ok((
            AuthState::AwaitingPhone { credentials },
            vec![Prompt::text(
                "Credentials saved. Now send the phone number of the account to connect \
                 (international format).",
            )],
        ))
    }

    async fn on_phone(
        &self,
        user: UserId,
        credentials: Credentials,
        text: &str,
    ) -> Result<(AuthState, Vec<Prompt>), TetherError> {
        let phone = normalize_phone(text);

        let conn = match self.registry.open(user, &credentials, &phone).await {
            Ok(conn) => conn,
            Err(ProviderError::RateLimited { retry_after }) => {
                return Ok((AuthState::Idle, vec![wait_prompt(retry_after)]));
            }
            Err(err) => {
                warn!(%user, error = %err, "connect failed");
                return Ok((AuthState::Idle, vec![aborted_prompt(err)]));
            }
        };

        let sent = {
            let mut guard = conn.lock().await;
            bounded(self.registry.call_timeout(), guard.send_code(&phone)).await
        };
        match sent {
            Ok(sent) => {
                info!(%user, channel = %sent.channel, "verification code sent");
                Ok((
                    AuthState::AwaitingCode {
                        session: AuthSession {
                            phone,
                            delivery_token: sent.delivery_token,
                            channel: sent.channel,
                            attempts: 0,
                        },
                    },
                    vec![Prompt::with_keyboard(
                        format!(
                            "A verification code was sent via {}. Type it here; you can add \
                             spaces or dashes between digits.",
                            sent.channel
                        ),
                        Keyboard::CodeOptions,
                    )],
                ))
            }
            Err(ProviderError::RateLimited { retry_after }) => {
                self.registry.close(user).await;
                Ok((AuthState::Idle, vec![wait_prompt(retry_after)]))
            }
            Err(err) => {
                warn!(%user, error = %err, "send_code failed");
                self.registry.close(user).await;
                Ok((AuthState::Idle, vec![aborted_prompt(err)]))
            }
        }
    }

    async fn on_code(
        &self,
        user: UserId,
        mut session: AuthSession,
        text: &str,
    ) -> Result<(AuthState, Vec<Prompt>), TetherError> {
        // Shape failures are local; they never consume a strike.
        let Some(code) = normalize_code(text) else {
            return Ok((
                AuthState::AwaitingCode { session },
                vec![Prompt::with_keyboard(
                    "A verification code is 4 to 10 letters or digits. Try again.",
                    Keyboard::CodeOptions,
                )],
            ));
        };

        let Some(conn) = self.registry.get(user) else {
            return Ok((
                AuthState::Idle,
                vec![Prompt::text(
                    "The sign-in session was lost. Send /start to begin again.",
                )],
            ));
        };

        let result = {
            let mut guard = conn.lock().await;
            bounded(
                self.registry.call_timeout(),
                guard.sign_in(&session.phone, &session.delivery_token, &code),
            )
            .await
        };
        match result {
            Ok(SignIn::Authorized(account)) => {
                info!(%user, account = account.id, "sign-in complete");
                Ok((AuthState::Idle, vec![success_prompt(&account.first_name)]))
            }
            Ok(SignIn::PasswordNeeded) => {
                session.attempts = 0;
                Ok((
                    AuthState::AwaitingPassword { session },
                    vec![Prompt::text(
                        "This account has two-step verification. Send its password.",
                    )],
                ))
            }
            Err(ProviderError::InvalidCode) => {
                session.attempts += 1;
                if session.attempts >= MAX_ATTEMPTS {
                    warn!(%user, "too many invalid codes, aborting");
                    self.registry.close(user).await;
                    Ok((
                        AuthState::Idle,
                        vec![aborted_prompt("too many invalid codes")],
                    ))
                } else {
                    let left = MAX_ATTEMPTS - session.attempts;
                    Ok((
                        AuthState::AwaitingCode { session },
                        vec![Prompt::with_keyboard(
                            format!("That code was wrong. {left} attempts left."),
                            Keyboard::CodeOptions,
                        )],
                    ))
                }
            }
            Err(ProviderError::ExpiredCode) => Ok((
                AuthState::AwaitingCode { session },
                vec![Prompt::with_keyboard(
                    "That code has expired. Request a new one below.",
                    Keyboard::CodeOptions,
                )],
            )),
            Err(ProviderError::RateLimited { retry_after }) => Ok((
                AuthState::AwaitingCode { session },
                vec![wait_prompt(retry_after)],
            )),
            Err(err) => {
                warn!(%user, error = %err, "sign_in failed");
                self.registry.close(user).await;
                Ok((AuthState::Idle, vec![aborted_prompt(err)]))
            }
        }
    }

    async fn on_code_selection(
        &self,
        user: UserId,
        mut session: AuthSession,
        callback: &str,
    ) -> Result<(AuthState, Vec<Prompt>), TetherError> {
        let prefer = match callback {
            CB_RESEND => None,
            CB_RESEND_SMS => Some(DeliveryChannel::Sms),
            CB_RESEND_CALL => Some(DeliveryChannel::Call),
            _ => {
                return Ok((
                    AuthState::AwaitingCode { session },
                    vec![Prompt::with_keyboard(
                        "Type the verification code, or request a new one below.",
                        Keyboard::CodeOptions,
                    )],
                ));
            }
        };

        let Some(conn) = self.registry.get(user) else {
            return Ok((
                AuthState::Idle,
                vec![Prompt::text(
                    "The sign-in session was lost. Send /start to begin again.",
                )],
            ));
        };

        let result = {
            let mut guard = conn.lock().await;
            bounded(
                self.registry.call_timeout(),
                guard.resend_code(&session.phone, &session.delivery_token, prefer),
            )
            .await
        };
        match result {
            Ok(sent) => {
                info!(%user, channel = %sent.channel, "verification code resent");
                session.delivery_token = sent.delivery_token;
                session.channel = sent.channel;
                Ok((
                    AuthState::AwaitingCode {
                        session: session.clone(),
                    },
                    vec![Prompt::with_keyboard(
                        format!("A new code was sent via {}.", session.channel),
                        Keyboard::CodeOptions,
                    )],
                ))
            }
            // A rate-limited resend keeps the pending code valid; the user can
            // still type the one already delivered.
            Err(ProviderError::RateLimited { retry_after }) => Ok((
                AuthState::AwaitingCode { session },
                vec![wait_prompt(retry_after)],
            )),
            Err(err) => {
                warn!(%user, error = %err, "resend_code failed");
                self.registry.close(user).await;
                Ok((AuthState::Idle, vec![aborted_prompt(err)]))
            }
        }
    }

    async fn on_password(
        &self,
        user: UserId,
        mut session: AuthSession,
        password: &str,
    ) -> Result<(AuthState, Vec<Prompt>), TetherError> {
        let Some(conn) = self.registry.get(user) else {
            return Ok((
                AuthState::Idle,
                vec![Prompt::text(
                    "The sign-in session was lost. Send /start to begin again.",
                )],
            ));
        };

        let result = {
            let mut guard = conn.lock().await;
            bounded(self.registry.call_timeout(), guard.verify_password(password)).await
        };
        match result {
            Ok(account) => {
                info!(%user, account = account.id, "two-step verification complete");
                Ok((AuthState::Idle, vec![success_prompt(&account.first_name)]))
            }
            Err(ProviderError::WrongPassword) => {
                session.attempts += 1;
                if session.attempts >= MAX_ATTEMPTS {
                    warn!(%user, "too many wrong passwords, aborting");
                    self.registry.close(user).await;
                    Ok((
                        AuthState::Idle,
                        vec![aborted_prompt("too many wrong passwords")],
                    ))
                } else {
                    let left = MAX_ATTEMPTS - session.attempts;
                    Ok((
                        AuthState::AwaitingPassword { session },
                        vec![Prompt::text(format!(
                            "Wrong password. {left} attempts left."
                        ))],
                    ))
                }
            }
            Err(err @ ProviderError::NoPasswordSet) => {
                // The provider contradicted its own PasswordNeeded answer;
                // nothing sensible to continue with.
                warn!(%user, "provider reported no password set after requesting one");
                self.registry.close(user).await;
                Ok((AuthState::Idle, vec![aborted_prompt(err)]))
            }
            Err(err) => {
                warn!(%user, error = %err, "verify_password failed");
                self.registry.close(user).await;
                Ok((AuthState::Idle, vec![aborted_prompt(err)]))
            }
        }
    }
}
