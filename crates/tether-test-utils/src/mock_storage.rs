// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter for tests that do not need SQLite on disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tether_core::{
    AdapterType, Credentials, HealthStatus, PluginAdapter, StorageAdapter, TetherError, UserId,
};

/// A storage adapter backed by in-memory maps.
///
/// `fail_next()` arms a one-shot I/O failure so tests can exercise the
/// storage-error paths of the state machine.
#[derive(Default)]
pub struct MemoryStorage {
    credentials: Mutex<HashMap<UserId, Credentials>>,
    ghost: Mutex<HashMap<UserId, bool>>,
    fail_next: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next storage operation fail with a storage error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), TetherError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(TetherError::Storage {
                source: "injected storage failure".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TetherError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TetherError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn initialize(&self) -> Result<(), TetherError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), TetherError> {
        Ok(())
    }

    async fn credentials(&self, user: UserId) -> Result<Option<Credentials>, TetherError> {
        self.check_failure()?;
        Ok(self.credentials.lock().await.get(&user).cloned())
    }

    async fn put_credentials(
        &self,
        user: UserId,
        credentials: &Credentials,
    ) -> Result<(), TetherError> {
        self.check_failure()?;
        self.credentials
            .lock()
            .await
            .insert(user, credentials.clone());
        Ok(())
    }

    async fn ghost_mode(&self, user: UserId) -> Result<bool, TetherError> {
        self.check_failure()?;
        Ok(*self.ghost.lock().await.get(&user).unwrap_or(&false))
    }

    async fn set_ghost_mode(&self, user: UserId, enabled: bool) -> Result<(), TetherError> {
        self.check_failure()?;
        self.ghost.lock().await.insert(user, enabled);
        Ok(())
    }
}
