// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock identity provider for deterministic testing.
//!
//! `MockProvider` implements `IdentityProvider` with scripted outcomes per
//! operation, enabling fast, CI-runnable tests of the authentication state
//! machine and session registry without a live messaging network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tether_core::{
    AccountInfo, CodeSent, Credentials, DeliveryChannel, IdentityProvider, ProviderConnection,
    ProviderError, SignIn, UserId,
};

/// One scripted outcome for a provider operation.
///
/// When a queue is empty the mock falls back to a success default, so tests
/// only script the interesting turns.
pub enum Step<T> {
    /// Return this value.
    Return(T),
    /// Fail with this classified error.
    Fail(ProviderError),
    /// Never complete; used to exercise call deadlines.
    Hang,
}

impl<T> Step<T> {
    async fn resolve(self) -> Result<T, ProviderError> {
        match self {
            Step::Return(value) => Ok(value),
            Step::Fail(err) => Err(err),
            Step::Hang => futures::future::pending().await,
        }
    }
}

/// Scripted outcomes, popped front-first by the matching operation.
#[derive(Default)]
pub struct ProviderScript {
    pub connect: VecDeque<Step<()>>,
    pub send_code: VecDeque<Step<CodeSent>>,
    pub resend_code: VecDeque<Step<CodeSent>>,
    pub sign_in: VecDeque<Step<SignIn>>,
    pub verify_password: VecDeque<Step<AccountInfo>>,
    pub recent_own_messages: VecDeque<Step<Vec<i64>>>,
}

/// Observable side effects of a mock provider, for assertions.
#[derive(Default)]
pub struct ProviderStats {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    /// Connections opened and not yet disconnected.
    pub live: AtomicI64,
    pub logouts: AtomicUsize,
    pub dropped_sessions: std::sync::Mutex<Vec<UserId>>,
    pub sent_messages: std::sync::Mutex<Vec<(String, String)>>,
    pub deleted_messages: std::sync::Mutex<Vec<(String, Vec<i64>)>>,
}

impl ProviderStats {
    pub fn live(&self) -> i64 {
        self.live.load(Ordering::SeqCst)
    }

    pub fn dropped_sessions(&self) -> Vec<UserId> {
        self.dropped_sessions.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent_messages.lock().unwrap().clone()
    }

    pub fn deleted_messages(&self) -> Vec<(String, Vec<i64>)> {
        self.deleted_messages.lock().unwrap().clone()
    }
}

/// The account every mock connection authenticates as.
pub fn mock_account() -> AccountInfo {
    AccountInfo {
        id: 777_000,
        first_name: "Mock".into(),
        username: Some("mock".into()),
    }
}

/// A mock identity provider with scripted outcomes.
pub struct MockProvider {
    script: Arc<Mutex<ProviderScript>>,
    stats: Arc<ProviderStats>,
    token_counter: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(ProviderScript::default())),
            stats: Arc::new(ProviderStats::default()),
            token_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Access the script queues for arranging outcomes.
    pub async fn script(&self) -> tokio::sync::MutexGuard<'_, ProviderScript> {
        self.script.lock().await
    }

    /// Observable call record.
    pub fn stats(&self) -> &ProviderStats {
        &self.stats
    }

    fn next_token(&self) -> String {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("token-{n}")
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn connect(
        &self,
        _user: UserId,
        _credentials: &Credentials,
        _phone: &str,
    ) -> Result<Box<dyn ProviderConnection>, ProviderError> {
        let step = self
            .script
            .lock()
            .await
            .connect
            .pop_front()
            .unwrap_or(Step::Return(()));
        step.resolve().await?;

        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            script: self.script.clone(),
            stats: self.stats.clone(),
            token_counter: self.token_counter.clone(),
            authorized: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }))
    }

    async fn drop_session(&self, user: UserId) -> Result<(), ProviderError> {
        self.stats.dropped_sessions.lock().unwrap().push(user);
        Ok(())
    }
}

/// Connection handle produced by [`MockProvider`].
pub struct MockConnection {
    script: Arc<Mutex<ProviderScript>>,
    stats: Arc<ProviderStats>,
    token_counter: Arc<AtomicUsize>,
    authorized: AtomicBool,
    disconnected: AtomicBool,
}

impl MockConnection {
    fn fresh_code(&self, channel: DeliveryChannel) -> CodeSent {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        CodeSent {
            delivery_token: format!("token-{n}"),
            channel,
        }
    }
}

#[async_trait]
impl ProviderConnection for MockConnection {
    async fn send_code(&mut self, _phone: &str) -> Result<CodeSent, ProviderError> {
        let step = self.script.lock().await.send_code.pop_front();
        match step {
            Some(step) => step.resolve().await,
            None => Ok(self.fresh_code(DeliveryChannel::App)),
        }
    }

    async fn resend_code(
        &mut self,
        _phone: &str,
        _delivery_token: &str,
        prefer: Option<DeliveryChannel>,
    ) -> Result<CodeSent, ProviderError> {
        let step = self.script.lock().await.resend_code.pop_front();
        match step {
            Some(step) => step.resolve().await,
            None => Ok(self.fresh_code(prefer.unwrap_or(DeliveryChannel::Sms))),
        }
    }

    async fn sign_in(
        &mut self,
        _phone: &str,
        _delivery_token: &str,
        _code: &str,
    ) -> Result<SignIn, ProviderError> {
        let step = self.script.lock().await.sign_in.pop_front();
        let result = match step {
            Some(step) => step.resolve().await,
            None => Ok(SignIn::Authorized(mock_account())),
        };
        if let Ok(SignIn::Authorized(_)) = &result {
            self.authorized.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn verify_password(&mut self, _password: &str) -> Result<AccountInfo, ProviderError> {
        let step = self.script.lock().await.verify_password.pop_front();
        let result = match step {
            Some(step) => step.resolve().await,
            None => Ok(mock_account()),
        };
        if result.is_ok() {
            self.authorized.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn account_info(&self) -> Result<AccountInfo, ProviderError> {
        if self.is_authorized() {
            Ok(mock_account())
        } else {
            Err(ProviderError::Other("not authorized".into()))
        }
    }

    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    async fn send_message(&self, chat: &str, text: &str) -> Result<(), ProviderError> {
        self.stats
            .sent_messages
            .lock()
            .unwrap()
            .push((chat.to_string(), text.to_string()));
        Ok(())
    }

    async fn recent_own_messages(
        &self,
        _chat: &str,
        limit: usize,
    ) -> Result<Vec<i64>, ProviderError> {
        let step = self.script.lock().await.recent_own_messages.pop_front();
        let ids = match step {
            Some(step) => step.resolve().await?,
            None => vec![3, 2, 1],
        };
        Ok(ids.into_iter().take(limit).collect())
    }

    async fn delete_messages(&self, chat: &str, ids: &[i64]) -> Result<(), ProviderError> {
        self.stats
            .deleted_messages
            .lock()
            .unwrap()
            .push((chat.to_string(), ids.to_vec()));
        Ok(())
    }

    async fn log_out(&mut self) -> Result<(), ProviderError> {
        self.stats.logouts.fetch_add(1, Ordering::SeqCst);
        self.authorized.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ProviderError> {
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        // Undisconnected drops count as leaks; keep `live` honest anyway.
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_flow_authorizes() {
        let provider = MockProvider::new();
        let creds = Credentials {
            api_id: 1,
            api_hash: "h".into(),
        };
        let mut conn = provider
            .connect(UserId(1), &creds, "+100")
            .await
            .unwrap();
        let sent = conn.send_code("+100").await.unwrap();
        let signed = conn
            .sign_in("+100", &sent.delivery_token, "1234")
            .await
            .unwrap();
        assert!(matches!(signed, SignIn::Authorized(_)));
        assert!(conn.is_authorized());
        conn.disconnect().await.unwrap();
        assert_eq!(provider.stats().live(), 0);
    }

    #[tokio::test]
    async fn scripted_failures_pop_in_order() {
        let provider = MockProvider::new();
        provider
            .script()
            .await
            .sign_in
            .push_back(Step::Fail(ProviderError::InvalidCode));

        let creds = Credentials {
            api_id: 1,
            api_hash: "h".into(),
        };
        let mut conn = provider.connect(UserId(1), &creds, "+100").await.unwrap();
        let err = conn.sign_in("+100", "t", "1234").await.unwrap_err();
        assert_eq!(err, ProviderError::InvalidCode);
        // Queue exhausted: next attempt falls back to success.
        assert!(conn.sign_in("+100", "t", "1234").await.is_ok());
    }
}
