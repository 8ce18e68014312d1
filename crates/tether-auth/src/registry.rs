// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry: at most one live provider connection per user.
//!
//! Entries are keyed by [`UserId`] in a concurrent map; each entry wraps its
//! connection in an async mutex, so access for one user is mutually exclusive
//! while unrelated users proceed in parallel. A process-wide lock is never
//! taken.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use tether_core::{Credentials, IdentityProvider, ProviderConnection, ProviderError, UserId};

/// A registered connection, shared with per-user mutual exclusion.
pub type SharedConnection = Arc<Mutex<Box<dyn ProviderConnection>>>;

/// Bound a provider call by a deadline.
///
/// On expiry the call is dropped and the timeout is reported as a classified
/// provider error, per the timeout-then-cleanup policy.
pub async fn bounded<T, F>(deadline: Duration, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout { duration: deadline }),
    }
}

/// Owns the lifecycle of every live identity-provider connection.
pub struct SessionRegistry {
    provider: Arc<dyn IdentityProvider>,
    entries: DashMap<UserId, SharedConnection>,
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            entries: DashMap::new(),
            connect_timeout,
            call_timeout,
        }
    }

    /// Deadline applied to every non-connect provider call.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// The provider this registry opens connections through.
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Open a fresh connection for `user`, replacing any prior one.
    ///
    /// Tears down the existing handle and deletes the on-disk session
    /// artifact before the new connect call, so a stale session is never
    /// reused. On failure nothing is registered.
    pub async fn open(
        &self,
        user: UserId,
        credentials: &Credentials,
        phone: &str,
    ) -> Result<SharedConnection, ProviderError> {
        self.close(user).await;
        self.provider.drop_session(user).await?;

        let conn = bounded(
            self.connect_timeout,
            self.provider.connect(user, credentials, phone),
        )
        .await?;

        let shared: SharedConnection = Arc::new(Mutex::new(conn));
        self.entries.insert(user, shared.clone());
        debug!(%user, "provider connection registered");
        Ok(shared)
    }

    /// The live connection for `user`, if any.
    pub fn get(&self, user: UserId) -> Option<SharedConnection> {
        self.entries.get(&user).map(|entry| entry.clone())
    }

    /// Whether `user` holds an authenticated connection.
    pub async fn is_authenticated(&self, user: UserId) -> bool {
        match self.get(user) {
            Some(conn) => conn.lock().await.is_authorized(),
            None => false,
        }
    }

    /// Tear down the connection for `user`. Idempotent; safe when absent.
    pub async fn close(&self, user: UserId) {
        if let Some((_, conn)) = self.entries.remove(&user) {
            let mut guard = conn.lock().await;
            if let Err(err) = bounded(self.call_timeout, guard.disconnect()).await {
                warn!(%user, error = %err, "disconnect failed during close");
            }
            debug!(%user, "provider connection closed");
        }
    }

    /// Log the user out of the provider and tear everything down, including
    /// the on-disk session artifact.
    ///
    /// Returns `false` when there was no connection to log out.
    pub async fn logout(&self, user: UserId) -> Result<bool, ProviderError> {
        let Some((_, conn)) = self.entries.remove(&user) else {
            return Ok(false);
        };
        {
            let mut guard = conn.lock().await;
            if let Err(err) = bounded(self.call_timeout, guard.log_out()).await {
                warn!(%user, error = %err, "provider logout failed, closing anyway");
            }
            if let Err(err) = bounded(self.call_timeout, guard.disconnect()).await {
                warn!(%user, error = %err, "disconnect failed during logout");
            }
        }
        self.provider.drop_session(user).await?;
        Ok(true)
    }

    /// Closes every registered connection. Used during shutdown.
    pub async fn close_all(&self) {
        let users: Vec<UserId> = self.entries.iter().map(|entry| *entry.key()).collect();
        for user in users {
            self.close(user).await;
        }
    }

    /// Number of registered connections (across all users).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Connections registered for one user: 0 or 1 by construction.
    pub fn count_for(&self, user: UserId) -> usize {
        usize::from(self.entries.contains_key(&user))
    }
}
